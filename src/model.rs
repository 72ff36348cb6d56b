use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::dates::parse_deadline;

pub type TaskId = String;
pub type SubtaskId = u32;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Subtask {
    pub id: SubtaskId,
    pub title: String,
    pub deadline: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub deadline: String,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// A task that has left the active list. `expires_at` marks when it may be purged.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTask {
    #[serde(flatten)]
    pub task: Task,
    pub completed_at: i64,
    pub expires_at: i64,
}

/// Failures raised while turning raw task data into calendar or metric values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid deadline: {value:?}")]
    InvalidDeadline { value: String },
    #[error("month out of range (expected 0-11): {0}")]
    InvalidMonth(u32),
    #[error("date out of range: {0}")]
    DateOutOfRange(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("subtask {subtask_id} not found in task {task_id}")]
    SubtaskNotFound {
        task_id: TaskId,
        subtask_id: SubtaskId,
    },
}

impl Subtask {
    pub fn deadline_at(&self, zone: &FixedOffset) -> Result<DateTime<FixedOffset>, CoreError> {
        parse_deadline(&self.deadline, zone)
    }
}

impl Task {
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>, deadline: impl Into<String>) -> Self {
        Task {
            id: id.into(),
            title: title.into(),
            deadline: deadline.into(),
            subtasks: Vec::new(),
            done: false,
            created_at: None,
        }
    }

    pub fn deadline_at(&self, zone: &FixedOffset) -> Result<DateTime<FixedOffset>, CoreError> {
        parse_deadline(&self.deadline, zone)
    }

    pub fn subtask(&self, subtask_id: SubtaskId) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == subtask_id)
    }

    /// Appends a subtask and returns its id (highest existing id + 1).
    pub fn add_subtask(&mut self, title: impl Into<String>, deadline: impl Into<String>) -> SubtaskId {
        let id = self
            .subtasks
            .iter()
            .map(|s| s.id)
            .max()
            .map_or(1, |max| max + 1);
        self.subtasks.push(Subtask {
            id,
            title: title.into(),
            deadline: deadline.into(),
            done: false,
        });
        id
    }

    pub fn remove_subtask(&mut self, subtask_id: SubtaskId) -> Result<Subtask, TaskError> {
        let idx = self
            .subtasks
            .iter()
            .position(|s| s.id == subtask_id)
            .ok_or_else(|| self.missing(subtask_id))?;
        Ok(self.subtasks.remove(idx))
    }

    pub fn set_subtask_done(&mut self, subtask_id: SubtaskId, done: bool) -> Result<(), TaskError> {
        let idx = self
            .subtasks
            .iter()
            .position(|s| s.id == subtask_id)
            .ok_or_else(|| self.missing(subtask_id))?;
        self.subtasks[idx].done = done;
        Ok(())
    }

    /// Moves the task into the completed collection, retained for `retention_days`.
    pub fn complete(mut self, now_ms: i64, retention_days: i64) -> CompletedTask {
        self.done = true;
        CompletedTask {
            task: self,
            completed_at: now_ms,
            expires_at: now_ms + retention_days * MS_PER_DAY,
        }
    }

    fn missing(&self, subtask_id: SubtaskId) -> TaskError {
        TaskError::SubtaskNotFound {
            task_id: self.id.clone(),
            subtask_id,
        }
    }
}

impl CompletedTask {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }
}

pub fn expired_ids(completed: &[CompletedTask], now_ms: i64) -> Vec<TaskId> {
    completed
        .iter()
        .filter(|c| c.is_expired(now_ms))
        .map(|c| c.task.id.clone())
        .collect()
}

/// Default list order: newest `createdAt` first, undated tasks last in their given order.
pub fn sort_by_created(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| std::cmp::Reverse(t.created_at.unwrap_or(i64::MIN)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_subtask_assigns_next_id() {
        let mut task = Task::new("t1", "Write report", "2026-10-20T12:00:00Z");
        assert_eq!(task.add_subtask("outline", "2026-10-19T12:00:00Z"), 1);
        assert_eq!(task.add_subtask("draft", "2026-10-19T18:00:00Z"), 2);
        task.remove_subtask(1).unwrap();
        assert_eq!(task.add_subtask("review", "2026-10-20T09:00:00Z"), 3);
        let titles: Vec<_> = task.subtasks.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["draft", "review"]);
    }

    #[test]
    fn missing_subtask_is_reported() {
        let mut task = Task::new("t1", "Write report", "2026-10-20T12:00:00Z");
        let err = task.set_subtask_done(7, true).unwrap_err();
        assert_eq!(
            err,
            TaskError::SubtaskNotFound {
                task_id: "t1".into(),
                subtask_id: 7
            }
        );
        assert!(task.remove_subtask(7).is_err());
        let id = task.add_subtask("Draft", "2026-10-19T12:00:00Z");
        task.set_subtask_done(id, true).unwrap();
        assert!(task.subtask(id).unwrap().done);
        task.set_subtask_done(id, false).unwrap();
        assert!(!task.subtask(id).unwrap().done);
    }

    #[test]
    fn complete_sets_expiry() {
        let task = Task::new("t1", "Ship", "2026-10-20T12:00:00Z");
        let completed = task.complete(1_000, 2);
        assert!(completed.task.done);
        assert_eq!(completed.expires_at, 1_000 + 2 * MS_PER_DAY);
        assert!(!completed.is_expired(1_000));
        assert!(completed.is_expired(completed.expires_at));
        assert_eq!(expired_ids(&[completed.clone()], completed.expires_at), vec!["t1"]);
    }

    #[test]
    fn sort_by_created_puts_newest_first() {
        let mut a = Task::new("a", "A", "2026-10-20");
        a.created_at = Some(10);
        let b = Task::new("b", "B", "2026-10-20");
        let mut c = Task::new("c", "C", "2026-10-20");
        c.created_at = Some(30);
        let mut tasks = vec![a, b, c];
        sort_by_created(&mut tasks);
        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn completed_task_uses_flat_camel_case_fields() {
        let yaml = "id: t9\ntitle: Done thing\ndeadline: 2026-10-01T10:00:00Z\ncompletedAt: 5\nexpiresAt: 9\n";
        let completed: CompletedTask = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(completed.task.id, "t9");
        assert!(completed.task.subtasks.is_empty());
        assert_eq!(completed.completed_at, 5);
        assert_eq!(completed.expires_at, 9);
    }
}
