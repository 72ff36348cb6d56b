use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::dates::{parse_deadline, LocalTime};
use crate::model::{CoreError, Subtask, SubtaskId, Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskOverdue,
    SubtaskOverdue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub task_id: TaskId,
    pub task_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtask_id: Option<SubtaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtask_name: Option<String>,
    pub message: String,
    pub created_at: i64,
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NotificationKey<'a> {
    kind: NotificationKind,
    task_id: &'a str,
    subtask_id: Option<SubtaskId>,
}

/// Notifications to add and ids to remove, computed from one task snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationDelta {
    pub added: Vec<Notification>,
    pub removed: Vec<String>,
}

/// The caller-owned notification collection. Newest notifications come first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStore {
    #[serde(default)]
    notifications: Vec<Notification>,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotificationKind::TaskOverdue => "task_overdue",
            NotificationKind::SubtaskOverdue => "subtask_overdue",
        })
    }
}

impl Notification {
    fn key(&self) -> NotificationKey<'_> {
        NotificationKey {
            kind: self.kind,
            task_id: &self.task_id,
            subtask_id: self.subtask_id,
        }
    }

    fn task_overdue(task: &Task, now: &LocalTime) -> Self {
        let created_at = now.timestamp_millis();
        Notification {
            id: format!("{}-{}-{}", NotificationKind::TaskOverdue, task.id, created_at),
            kind: NotificationKind::TaskOverdue,
            task_id: task.id.clone(),
            task_name: task.title.clone(),
            subtask_id: None,
            subtask_name: None,
            message: format!("Task \"{}\" is overdue", task.title),
            created_at,
            read: false,
        }
    }

    fn subtask_overdue(task: &Task, subtask: &Subtask, now: &LocalTime) -> Self {
        let created_at = now.timestamp_millis();
        Notification {
            id: format!(
                "{}-{}-{}-{}",
                NotificationKind::SubtaskOverdue,
                task.id,
                subtask.id,
                created_at
            ),
            kind: NotificationKind::SubtaskOverdue,
            task_id: task.id.clone(),
            task_name: task.title.clone(),
            subtask_id: Some(subtask.id),
            subtask_name: Some(subtask.title.clone()),
            message: format!(
                "Subtask \"{}\" of task \"{}\" is overdue",
                subtask.title, task.title
            ),
            created_at,
            read: false,
        }
    }
}

fn is_overdue(deadline: &str, now: &LocalTime) -> Result<bool, CoreError> {
    Ok(parse_deadline(deadline, now.offset())? < *now)
}

/// New overdue notifications for `tasks` that `existing` does not already cover.
pub fn scan(
    tasks: &[Task],
    existing: &[Notification],
    now: &LocalTime,
) -> Result<Vec<Notification>, CoreError> {
    let mut seen: HashSet<NotificationKey<'_>> = existing.iter().map(Notification::key).collect();
    let mut added = Vec::new();
    for task in tasks.iter().filter(|t| !t.done) {
        if is_overdue(&task.deadline, now)? {
            let key = NotificationKey {
                kind: NotificationKind::TaskOverdue,
                task_id: &task.id,
                subtask_id: None,
            };
            if seen.insert(key) {
                added.push(Notification::task_overdue(task, now));
            }
        }
        for subtask in task.subtasks.iter().filter(|s| !s.done) {
            if !is_overdue(&subtask.deadline, now)? {
                continue;
            }
            let key = NotificationKey {
                kind: NotificationKind::SubtaskOverdue,
                task_id: &task.id,
                subtask_id: Some(subtask.id),
            };
            if seen.insert(key) {
                added.push(Notification::subtask_overdue(task, subtask, now));
            }
        }
    }
    Ok(added)
}

/// Ids of notifications in `existing` that no longer describe an overdue item.
pub fn cleanup(
    tasks: &[Task],
    existing: &[Notification],
    now: &LocalTime,
) -> Result<Vec<String>, CoreError> {
    let mut removed = Vec::new();
    for notification in existing {
        if is_stale(notification, tasks, now)? {
            removed.push(notification.id.clone());
        }
    }
    Ok(removed)
}

fn is_stale(notification: &Notification, tasks: &[Task], now: &LocalTime) -> Result<bool, CoreError> {
    let Some(task) = tasks.iter().find(|t| t.id == notification.task_id) else {
        return Ok(true);
    };
    if task.done {
        return Ok(true);
    }
    match notification.kind {
        NotificationKind::TaskOverdue => Ok(!is_overdue(&task.deadline, now)?),
        NotificationKind::SubtaskOverdue => {
            let subtask = notification.subtask_id.and_then(|id| task.subtask(id));
            match subtask {
                Some(subtask) if !subtask.done => Ok(!is_overdue(&subtask.deadline, now)?),
                _ => Ok(true),
            }
        }
    }
}

/// Runs [`scan`] and [`cleanup`] against the same snapshot.
pub fn evaluate(
    tasks: &[Task],
    existing: &[Notification],
    now: &LocalTime,
) -> Result<NotificationDelta, CoreError> {
    let removed = cleanup(tasks, existing, now)?;
    let added = scan(tasks, existing, now)?;
    Ok(NotificationDelta { added, removed })
}

impl NotificationDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl NotificationStore {
    pub fn new(notifications: Vec<Notification>) -> Self {
        NotificationStore { notifications }
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    /// Computes the delta for `tasks` and applies it.
    pub fn refresh(&mut self, tasks: &[Task], now: &LocalTime) -> Result<NotificationDelta, CoreError> {
        let delta = evaluate(tasks, &self.notifications, now)?;
        self.apply(&delta);
        Ok(delta)
    }

    pub fn apply(&mut self, delta: &NotificationDelta) {
        if delta.is_empty() {
            return;
        }
        let removed: HashSet<&str> = delta.removed.iter().map(String::as_str).collect();
        self.notifications.retain(|n| !removed.contains(n.id.as_str()));
        let mut merged = delta.added.clone();
        merged.append(&mut self.notifications);
        self.notifications = merged;
        info!(
            "notifications: {} added, {} removed, {} unread",
            delta.added.len(),
            delta.removed.len(),
            self.unread_count()
        );
    }

    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for notification in self.notifications.iter_mut().filter(|n| !n.read) {
            notification.read = true;
            changed += 1;
        }
        changed
    }

    pub fn remove(&mut self, id: &str) -> Option<Notification> {
        let idx = self.notifications.iter().position(|n| n.id == id)?;
        Some(self.notifications.remove(idx))
    }

    pub fn clear_all(&mut self) -> usize {
        let count = self.notifications.len();
        self.notifications.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_deadline;
    use chrono::FixedOffset;

    fn at(raw: &str) -> LocalTime {
        parse_deadline(raw, &FixedOffset::east_opt(0).unwrap()).unwrap()
    }

    fn now() -> LocalTime {
        at("2026-10-19T12:00:00Z")
    }

    fn overdue_task() -> Task {
        let mut task = Task::new("t1", "Taxes", "2026-10-18T12:00:00Z");
        task.add_subtask("gather receipts", "2026-10-17T12:00:00Z");
        task.add_subtask("file", "2026-10-25T12:00:00Z");
        task
    }

    #[test]
    fn scan_flags_overdue_task_and_subtask() {
        let added = scan(&[overdue_task()], &[], &now()).unwrap();
        assert_eq!(added.len(), 2);
        assert_eq!(added[0].kind, NotificationKind::TaskOverdue);
        assert_eq!(added[0].message, "Task \"Taxes\" is overdue");
        assert_eq!(added[1].kind, NotificationKind::SubtaskOverdue);
        assert_eq!(added[1].subtask_id, Some(1));
        assert_eq!(added[1].subtask_name.as_deref(), Some("gather receipts"));
        assert!(added.iter().all(|n| !n.read));
        assert_ne!(added[0].id, added[1].id);
    }

    #[test]
    fn scan_skips_done_tasks_and_subtasks() {
        let mut done = overdue_task();
        done.done = true;
        let mut partial = overdue_task();
        partial.id = "t2".into();
        partial.subtasks[0].done = true;
        let added = scan(&[done, partial], &[], &now()).unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].task_id, "t2");
        assert_eq!(added[0].kind, NotificationKind::TaskOverdue);
    }

    #[test]
    fn scan_dedups_by_key_not_id() {
        let tasks = vec![overdue_task()];
        let mut store = NotificationStore::default();
        store.refresh(&tasks, &now()).unwrap();
        assert_eq!(store.notifications().len(), 2);
        let later = at("2026-10-19T13:00:00Z");
        assert!(scan(&tasks, store.notifications(), &later).unwrap().is_empty());
    }

    #[test]
    fn cleanup_retracts_done_subtask_only() {
        let mut tasks = vec![overdue_task()];
        let mut store = NotificationStore::default();
        store.refresh(&tasks, &now()).unwrap();
        tasks[0].set_subtask_done(1, true).unwrap();
        let removed = cleanup(&tasks, store.notifications(), &now()).unwrap();
        assert_eq!(removed.len(), 1);
        let gone = store.get(&removed[0]).unwrap();
        assert_eq!(gone.kind, NotificationKind::SubtaskOverdue);
        store.refresh(&tasks, &now()).unwrap();
        assert_eq!(store.notifications().len(), 1);
        assert_eq!(store.notifications()[0].kind, NotificationKind::TaskOverdue);
    }

    #[test]
    fn cleanup_handles_vanished_and_rescheduled_items() {
        let mut tasks = vec![overdue_task()];
        let mut store = NotificationStore::default();
        store.refresh(&tasks, &now()).unwrap();

        tasks[0].deadline = "2026-10-30T00:00:00Z".into();
        tasks[0].remove_subtask(1).unwrap();
        let removed = cleanup(&tasks, store.notifications(), &now()).unwrap();
        assert_eq!(removed.len(), 2);

        let removed = cleanup(&[], store.notifications(), &now()).unwrap();
        assert_eq!(removed.len(), 2);
    }

    #[test]
    fn store_flags_and_removal() {
        let mut store = NotificationStore::default();
        store.refresh(&[overdue_task()], &now()).unwrap();
        assert_eq!(store.unread_count(), 2);
        let first = store.notifications()[0].id.clone();
        assert!(store.mark_read(&first));
        assert!(!store.mark_read("nope"));
        assert_eq!(store.unread_count(), 1);
        assert_eq!(store.mark_all_read(), 1);
        assert_eq!(store.notifications().len(), 2);
        assert!(store.remove(&first).is_some());
        assert!(store.get(&first).is_none());
        assert_eq!(store.clear_all(), 1);
        assert!(store.notifications().is_empty());
    }

    #[test]
    fn newest_notifications_come_first() {
        let mut tasks = vec![overdue_task()];
        let mut store = NotificationStore::default();
        store.refresh(&tasks, &now()).unwrap();
        tasks.push(Task::new("t2", "Rent", "2026-10-19T13:00:00Z"));
        store.refresh(&tasks, &at("2026-10-19T14:00:00Z")).unwrap();
        assert_eq!(store.notifications()[0].task_id, "t2");
        assert_eq!(store.notifications().len(), 3);
    }
}
