use crate::calendar::{
    build_month, build_week, group_by_date, group_for_display, project_with_shade, CalendarDay,
    CalendarItem, DisplayGroup, ItemsByDate,
};
use crate::cli::NotifyAction;
use crate::config::Settings;
use crate::dates::{day_key, parse_deadline, LocalTime};
use crate::metrics::analyze;
use crate::model::expired_ids;
use crate::notify::Notification;
use crate::storage::{
    current_workspace, init_project_workspace, load_notifications, load_snapshot,
    save_notifications, TaskSnapshot, Workspace, WorkspaceScope,
};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use std::env;

struct Session {
    workspace: Workspace,
    snapshot: TaskSnapshot,
    settings: Settings,
    now: LocalTime,
}

impl Session {
    fn open(at: Option<&str>) -> Result<Session> {
        let workspace = current_workspace()?;
        let snapshot = load_snapshot(&workspace)?;
        let settings = Settings::load(&workspace.config_path())?;
        Ok(Session {
            workspace,
            snapshot,
            settings,
            now: resolve_now(at)?,
        })
    }

    fn items_by_date(&self) -> Result<ItemsByDate> {
        let items = project_with_shade(
            &self.snapshot.tasks,
            self.now.offset(),
            self.settings.subtask_shade,
        )
        .context("projecting tasks onto the calendar")?;
        Ok(group_by_date(items))
    }
}

pub fn init(name: Option<String>) -> Result<()> {
    let cwd = env::current_dir()?;
    let workspace = init_project_workspace(&cwd, name)?;
    println!("Initialized workspace at {}", workspace.dir.display());
    Ok(())
}

pub fn month(at: Option<&str>, year: Option<i32>, month: Option<u32>) -> Result<()> {
    let session = Session::open(at)?;
    let year = year.unwrap_or(session.now.year());
    let month0 = match month {
        Some(m) if (1..=12).contains(&m) => m - 1,
        Some(m) => bail!("month must be between 1 and 12: {}", m),
        None => session.now.month0(),
    };
    let grid = build_month(year, month0, &session.items_by_date()?, &session.now)?;
    println!("{}", grid.title()?);
    let headings = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];
    let header: Vec<String> = headings.iter().map(|h| format!("{:^7}", h)).collect();
    println!("{}", header.join(" "));
    for week in &grid.weeks {
        let cells: Vec<String> = week.days.iter().map(month_cell).collect();
        println!("{}", cells.join(" "));
    }
    Ok(())
}

pub fn week(at: Option<&str>, date: Option<String>) -> Result<()> {
    let session = Session::open(at)?;
    let date = parse_date(date.as_deref(), &session.now)?;
    let week = build_week(date, &session.items_by_date()?, &session.now)?;
    for day in &week.days {
        println!("{}{}", day.date.format("%a %Y-%m-%d"), if day.is_today { " (today)" } else { "" });
        if day.items.is_empty() {
            println!("  (nothing due)");
        }
        print_groups(&group_for_display(&day.items));
    }
    Ok(())
}

pub fn day(at: Option<&str>, date: Option<String>) -> Result<()> {
    let session = Session::open(at)?;
    let date = parse_date(date.as_deref(), &session.now)?;
    let items_by_date = session.items_by_date()?;
    let items = items_by_date
        .get(&day_key(date, session.now.offset()))
        .map(Vec::as_slice)
        .unwrap_or_default();
    println!("{}", date.format("%A %Y-%m-%d"));
    if items.is_empty() {
        println!("  No tasks due on this date");
    }
    print_groups(&group_for_display(items));
    Ok(())
}

pub fn stats(at: Option<&str>) -> Result<()> {
    let session = Session::open(at)?;
    let analysis = analyze(
        &session.snapshot.tasks,
        &session.snapshot.completed,
        &session.now,
        &session.settings.streak,
    )
    .context("computing analytics")?;
    let pace = &analysis.subtask_metrics;
    let outcome = &analysis.task_metrics;
    println!("Workspace: {} ({})", session.snapshot.name, scope_label(&session.workspace));
    println!("Open tasks: {} ({} on pace, {} behind)", pace.total, pace.on_pace, pace.behind);
    println!("Streak: {} day(s)", pace.streak);
    println!(
        "Completion: {:.1}% of {} ({} on time, {} overdue)",
        outcome.completion_rate, outcome.total, outcome.on_time, outcome.overdue
    );
    for task in &pace.behind_tasks {
        println!("  behind: {} ({})", task.title, task.id);
    }
    Ok(())
}

pub fn notify(at: Option<&str>, action: Option<NotifyAction>) -> Result<()> {
    let session = Session::open(at)?;
    let mut store = load_notifications(&session.workspace)?;
    match action.unwrap_or(NotifyAction::Check) {
        NotifyAction::Check => {
            let delta = store
                .refresh(&session.snapshot.tasks, &session.now)
                .context("evaluating overdue notifications")?;
            if !delta.is_empty() {
                save_notifications(&session.workspace, &store)?;
            }
            println!(
                "{} new, {} retracted, {} unread",
                delta.added.len(),
                delta.removed.len(),
                store.unread_count()
            );
            for notification in store.notifications().iter().filter(|n| !n.read) {
                print_notification(notification);
            }
        }
        NotifyAction::List => {
            if store.notifications().is_empty() {
                println!("(no notifications)");
            }
            for notification in store.notifications() {
                print_notification(notification);
            }
        }
        NotifyAction::Read { id } => {
            if !store.mark_read(&id) {
                bail!("notification {} not found", id);
            }
            save_notifications(&session.workspace, &store)?;
            println!("Marked {} as read", id);
        }
        NotifyAction::ReadAll => {
            let changed = store.mark_all_read();
            save_notifications(&session.workspace, &store)?;
            println!("Marked {} notification(s) as read", changed);
        }
        NotifyAction::Clear => {
            let removed = store.clear_all();
            save_notifications(&session.workspace, &store)?;
            println!("Removed {} notification(s)", removed);
        }
    }
    Ok(())
}

pub fn expired(at: Option<&str>) -> Result<()> {
    let session = Session::open(at)?;
    let ids = expired_ids(&session.snapshot.completed, session.now.timestamp_millis());
    if ids.is_empty() {
        println!("No expired completed tasks");
    }
    for id in ids {
        println!("  - {}", id);
    }
    Ok(())
}

fn resolve_now(at: Option<&str>) -> Result<LocalTime> {
    let local = Local::now();
    let zone = *local.offset();
    match at {
        Some(raw) => parse_deadline(raw, &zone).with_context(|| format!("parsing --at {}", raw)),
        None => Ok(local.with_timezone(&zone)),
    }
}

fn parse_date(input: Option<&str>, now: &LocalTime) -> Result<NaiveDate> {
    match input.map(str::trim) {
        None | Some("") => Ok(now.date_naive()),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| anyhow!("invalid date format (use YYYY-MM-DD): {}", raw)),
    }
}

fn scope_label(workspace: &Workspace) -> &'static str {
    match workspace.scope {
        WorkspaceScope::Project => "project",
        WorkspaceScope::Global => "global",
    }
}

fn month_cell(day: &CalendarDay) -> String {
    let marker = if day.is_today { '*' } else { ' ' };
    if !day.is_current_month {
        return format!("{:>6}{}", "·", marker);
    }
    let open = day.items.iter().filter(|i| !i.done).count();
    if open > 0 {
        format!("{:>2}({:>2}){}", day.date.day(), open, marker)
    } else {
        format!("{:>2}    {}", day.date.day(), marker)
    }
}

fn print_groups(groups: &[DisplayGroup<'_>]) {
    for group in groups {
        let main = group.main_item();
        match group {
            DisplayGroup::SingleSubtask { .. } => {
                let parent = main.parent_task_title.as_deref().unwrap_or("?");
                println!("  - {} (of {})", item_line(main), parent);
            }
            _ => println!("  - {}", item_line(main)),
        }
        for sub in group.sub_items() {
            println!("      - {}", item_line(sub));
        }
    }
}

fn item_line(item: &CalendarItem) -> String {
    format!(
        "[{}] {} {} {}",
        if item.done { "x" } else { " " },
        item.deadline.format("%H:%M"),
        item.title,
        item.color
    )
}

fn print_notification(notification: &Notification) {
    println!(
        "  {} {}: {}",
        if notification.read { " " } else { "*" },
        notification.id,
        notification.message
    );
}
