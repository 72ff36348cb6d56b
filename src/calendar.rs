use chrono::{Datelike, Duration as ChronoDuration, FixedOffset, NaiveDate};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::color::{color_for_task, lighten, Rgb, SUBTASK_SHADE_PERCENT};
use crate::dates::{
    date_key, day_key, first_of_month, is_today, month_title, start_of_week, LocalTime,
};
use crate::model::{CoreError, Subtask, SubtaskId, Task};

pub const DAYS_PER_WEEK: usize = 7;
pub const WEEKS_PER_MONTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Task,
    Subtask,
}

/// One displayable entry on the calendar: a task, or one of its subtasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarItem {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub deadline: LocalTime,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task_title: Option<String>,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_current_month: bool,
    pub is_today: bool,
    pub items: Vec<CalendarItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarWeek {
    pub days: Vec<CalendarDay>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    /// 0-based, January is 0.
    pub month: u32,
    pub weeks: Vec<CalendarWeek>,
}

/// Items of one day arranged for rendering; a task nests its same-day subtasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DisplayGroup<'a> {
    TaskWithSubtasks {
        #[serde(rename = "mainItem")]
        main_item: &'a CalendarItem,
        #[serde(rename = "subItems")]
        sub_items: Vec<&'a CalendarItem>,
    },
    SingleTask {
        #[serde(rename = "mainItem")]
        main_item: &'a CalendarItem,
    },
    SingleSubtask {
        #[serde(rename = "mainItem")]
        main_item: &'a CalendarItem,
    },
}

pub type ItemsByDate = BTreeMap<String, Vec<CalendarItem>>;

pub fn subtask_item_id(task_id: &str, subtask_id: SubtaskId) -> String {
    format!("{task_id}-{subtask_id}")
}

pub fn project_to_calendar_items(
    tasks: &[Task],
    zone: &FixedOffset,
) -> Result<Vec<CalendarItem>, CoreError> {
    project_with_shade(tasks, zone, SUBTASK_SHADE_PERCENT)
}

/// Flattens tasks into calendar items: each task, then its subtasks, in input order.
pub fn project_with_shade(
    tasks: &[Task],
    zone: &FixedOffset,
    subtask_shade: i32,
) -> Result<Vec<CalendarItem>, CoreError> {
    let mut items = Vec::with_capacity(tasks.iter().map(|t| 1 + t.subtasks.len()).sum());
    for task in tasks {
        let color = color_for_task(&task.id);
        items.push(CalendarItem {
            id: task.id.clone(),
            title: task.title.clone(),
            kind: ItemKind::Task,
            deadline: task.deadline_at(zone)?,
            done: task.done,
            parent_task_id: None,
            parent_task_title: None,
            color,
        });
        let sub_color = lighten(color, subtask_shade);
        for subtask in &task.subtasks {
            items.push(CalendarItem {
                id: subtask_item_id(&task.id, subtask.id),
                title: subtask.title.clone(),
                kind: ItemKind::Subtask,
                deadline: subtask.deadline_at(zone)?,
                done: subtask.done,
                parent_task_id: Some(task.id.clone()),
                parent_task_title: Some(task.title.clone()),
                color: sub_color,
            });
        }
    }
    debug!("projected {} tasks into {} calendar items", tasks.len(), items.len());
    Ok(items)
}

/// Finds the task (and subtask, for subtask items) a calendar item was projected from.
pub fn resolve_item<'a>(
    tasks: &'a [Task],
    item_id: &str,
) -> Option<(&'a Task, Option<&'a Subtask>)> {
    if let Some(task) = tasks.iter().find(|t| t.id == item_id) {
        return Some((task, None));
    }
    tasks.iter().find_map(|task| {
        let suffix = item_id.strip_prefix(task.id.as_str())?.strip_prefix('-')?;
        let subtask_id: SubtaskId = suffix.parse().ok()?;
        task.subtask(subtask_id).map(|s| (task, Some(s)))
    })
}

/// Buckets items by UTC day key. Tasks come before subtasks, then earliest deadline first.
pub fn group_by_date(items: Vec<CalendarItem>) -> ItemsByDate {
    let mut buckets = ItemsByDate::new();
    for item in items {
        buckets.entry(date_key(&item.deadline)).or_default().push(item);
    }
    for bucket in buckets.values_mut() {
        bucket.sort_by(|a, b| a.kind.cmp(&b.kind).then(a.deadline.cmp(&b.deadline)));
    }
    buckets
}

fn calendar_day(
    date: NaiveDate,
    is_current_month: bool,
    items_by_date: &ItemsByDate,
    now: &LocalTime,
) -> CalendarDay {
    let items = items_by_date
        .get(&day_key(date, now.offset()))
        .cloned()
        .unwrap_or_default();
    CalendarDay {
        date,
        is_current_month,
        is_today: is_today(date, now),
        items,
    }
}

fn nth_day(start: NaiveDate, offset: usize) -> Result<NaiveDate, CoreError> {
    start
        .checked_add_signed(ChronoDuration::days(offset as i64))
        .ok_or_else(|| CoreError::DateOutOfRange(start.to_string()))
}

/// Six Monday-first weeks starting on the Monday on or before the 1st of the month.
pub fn build_month(
    year: i32,
    month0: u32,
    items_by_date: &ItemsByDate,
    now: &LocalTime,
) -> Result<CalendarMonth, CoreError> {
    let grid_start = start_of_week(first_of_month(year, month0)?);
    let mut weeks = Vec::with_capacity(WEEKS_PER_MONTH);
    for week in 0..WEEKS_PER_MONTH {
        let mut days = Vec::with_capacity(DAYS_PER_WEEK);
        for weekday in 0..DAYS_PER_WEEK {
            let date = nth_day(grid_start, week * DAYS_PER_WEEK + weekday)?;
            days.push(calendar_day(
                date,
                date.month0() == month0,
                items_by_date,
                now,
            ));
        }
        weeks.push(CalendarWeek { days });
    }
    debug!("built month grid {year}-{:02} from {grid_start}", month0 + 1);
    Ok(CalendarMonth {
        year,
        month: month0,
        weeks,
    })
}

pub fn build_week(
    date: NaiveDate,
    items_by_date: &ItemsByDate,
    now: &LocalTime,
) -> Result<CalendarWeek, CoreError> {
    let start = start_of_week(date);
    let days = (0..DAYS_PER_WEEK)
        .map(|offset| {
            nth_day(start, offset).map(|date| calendar_day(date, true, items_by_date, now))
        })
        .collect::<Result<Vec<_>, CoreError>>()?;
    Ok(CalendarWeek { days })
}

impl CalendarMonth {
    pub fn title(&self) -> Result<String, CoreError> {
        month_title(self.year, self.month)
    }

    pub fn days(&self) -> impl Iterator<Item = &CalendarDay> {
        self.weeks.iter().flat_map(|w| w.days.iter())
    }
}

/// Nests each task with the same-day subtasks that belong to it.
pub fn group_for_display(day_items: &[CalendarItem]) -> Vec<DisplayGroup<'_>> {
    let mut processed = vec![false; day_items.len()];
    let mut groups = Vec::new();
    for (idx, item) in day_items.iter().enumerate() {
        if processed[idx] {
            continue;
        }
        processed[idx] = true;
        match item.kind {
            ItemKind::Task => {
                let mut sub_items = Vec::new();
                for (sub_idx, candidate) in day_items.iter().enumerate() {
                    if processed[sub_idx]
                        || candidate.kind != ItemKind::Subtask
                        || candidate.parent_task_id.as_deref() != Some(item.id.as_str())
                    {
                        continue;
                    }
                    processed[sub_idx] = true;
                    sub_items.push(candidate);
                }
                if sub_items.is_empty() {
                    groups.push(DisplayGroup::SingleTask { main_item: item });
                } else {
                    groups.push(DisplayGroup::TaskWithSubtasks {
                        main_item: item,
                        sub_items,
                    });
                }
            }
            ItemKind::Subtask => groups.push(DisplayGroup::SingleSubtask { main_item: item }),
        }
    }
    groups
}

impl<'a> DisplayGroup<'a> {
    pub fn main_item(&self) -> &'a CalendarItem {
        match self {
            DisplayGroup::TaskWithSubtasks { main_item, .. }
            | DisplayGroup::SingleTask { main_item }
            | DisplayGroup::SingleSubtask { main_item } => *main_item,
        }
    }

    pub fn sub_items(&self) -> &[&'a CalendarItem] {
        match self {
            DisplayGroup::TaskWithSubtasks { sub_items, .. } => sub_items,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_deadline;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn now() -> LocalTime {
        parse_deadline("2026-10-19T12:00:00Z", &utc()).unwrap()
    }

    fn sample_tasks() -> Vec<Task> {
        let mut report = Task::new("report", "Quarterly report", "2026-10-21T17:00:00Z");
        report.add_subtask("collect numbers", "2026-10-21T09:00:00Z");
        report.add_subtask("draft", "2026-10-20T15:00:00Z");
        let mut launch = Task::new("launch", "Launch", "2026-10-21T08:00:00Z");
        launch.add_subtask("press kit", "2026-10-21T10:00:00Z");
        vec![report, launch]
    }

    #[test]
    fn projection_emits_task_then_subtasks() {
        let tasks = sample_tasks();
        let items = project_to_calendar_items(&tasks, &utc()).unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["report", "report-1", "report-2", "launch", "launch-1"]);
        assert_eq!(items[1].parent_task_id.as_deref(), Some("report"));
        assert_eq!(items[1].parent_task_title.as_deref(), Some("Quarterly report"));
        assert_eq!(items[1].color, lighten(items[0].color, 30));
        assert_eq!(items[0].color, color_for_task("report"));
    }

    #[test]
    fn projection_fails_on_bad_deadline() {
        let mut tasks = sample_tasks();
        tasks[1].subtasks[0].deadline = "soon".into();
        let err = project_to_calendar_items(&tasks, &utc()).unwrap_err();
        assert_eq!(err, CoreError::InvalidDeadline { value: "soon".into() });
    }

    #[test]
    fn resolve_item_finds_sources() {
        let tasks = sample_tasks();
        let (task, sub) = resolve_item(&tasks, "report-2").unwrap();
        assert_eq!(task.id, "report");
        assert_eq!(sub.map(|s| s.title.as_str()), Some("draft"));
        let (task, sub) = resolve_item(&tasks, "launch").unwrap();
        assert_eq!(task.id, "launch");
        assert!(sub.is_none());
        assert!(resolve_item(&tasks, "launch-9").is_none());
        assert!(resolve_item(&tasks, "ghost").is_none());
    }

    #[test]
    fn group_by_date_orders_tasks_before_subtasks() {
        let items = project_to_calendar_items(&sample_tasks(), &utc()).unwrap();
        let grouped = group_by_date(items);
        let day: Vec<_> = grouped["2026-10-21"].iter().map(|i| i.id.as_str()).collect();
        assert_eq!(day, vec!["launch", "report", "report-1", "launch-1"]);
        let prev: Vec<_> = grouped["2026-10-20"].iter().map(|i| i.id.as_str()).collect();
        assert_eq!(prev, vec!["report-2"]);
    }

    #[test]
    fn group_by_date_keeps_emission_order_on_ties() {
        let mut a = Task::new("a", "A", "2026-10-22T09:00:00Z");
        a.add_subtask("first", "2026-10-22T10:00:00Z");
        a.add_subtask("second", "2026-10-22T10:00:00Z");
        let b = Task::new("b", "B", "2026-10-22T09:00:00Z");
        let grouped = group_by_date(project_to_calendar_items(&[a, b], &utc()).unwrap());
        let day: Vec<_> = grouped["2026-10-22"].iter().map(|i| i.id.as_str()).collect();
        assert_eq!(day, vec!["a", "b", "a-1", "a-2"]);
    }

    #[test]
    fn month_grid_is_six_monday_weeks() {
        let grouped = group_by_date(project_to_calendar_items(&sample_tasks(), &utc()).unwrap());
        let month = build_month(2026, 9, &grouped, &now()).unwrap();
        assert_eq!(month.weeks.len(), WEEKS_PER_MONTH);
        assert!(month.weeks.iter().all(|w| w.days.len() == DAYS_PER_WEEK));
        let first = &month.weeks[0].days[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2026, 9, 28).unwrap());
        assert!(!first.is_current_month);
        let today: Vec<_> = month.days().filter(|d| d.is_today).collect();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].date, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        let busy = month
            .days()
            .find(|d| d.date == NaiveDate::from_ymd_opt(2026, 10, 21).unwrap())
            .unwrap();
        assert_eq!(busy.items.len(), 4);
        assert_eq!(month.title().unwrap(), "October 2026");
    }

    #[test]
    fn month_rejects_bad_month() {
        let err = build_month(2026, 12, &ItemsByDate::new(), &now()).unwrap_err();
        assert_eq!(err, CoreError::InvalidMonth(12));
    }

    #[test]
    fn week_is_all_current_month() {
        let sunday = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        let week = build_week(sunday, &ItemsByDate::new(), &now()).unwrap();
        assert_eq!(week.days.len(), 7);
        assert_eq!(week.days[0].date, NaiveDate::from_ymd_opt(2026, 10, 26).unwrap());
        assert!(week.days.iter().all(|d| d.is_current_month && d.items.is_empty()));
    }

    #[test]
    fn display_groups_nest_same_day_subtasks() {
        let grouped = group_by_date(project_to_calendar_items(&sample_tasks(), &utc()).unwrap());
        let groups = group_for_display(&grouped["2026-10-21"]);
        assert_eq!(groups.len(), 2);
        match &groups[0] {
            DisplayGroup::TaskWithSubtasks { main_item, sub_items } => {
                assert_eq!(main_item.id, "launch");
                assert_eq!(sub_items.len(), 1);
                assert_eq!(sub_items[0].id, "launch-1");
            }
            other => panic!("unexpected group {other:?}"),
        }
        assert_eq!(groups[1].main_item().id, "report");
        assert_eq!(groups[1].sub_items().len(), 1);

        let lone = group_for_display(&grouped["2026-10-20"]);
        assert!(matches!(lone[0], DisplayGroup::SingleSubtask { .. }));
    }

    #[test]
    fn display_group_serializes_with_kebab_tag() {
        let tasks = vec![Task::new("solo", "Solo", "2026-10-21T08:00:00Z")];
        let items = project_to_calendar_items(&tasks, &utc()).unwrap();
        let groups = group_for_display(&items);
        let yaml = serde_yaml::to_string(&groups).unwrap();
        assert!(yaml.contains("type: single-task"));
        assert!(yaml.contains("mainItem:"));
    }
}
