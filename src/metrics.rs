use chrono::Duration as ChronoDuration;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::dates::LocalTime;
use crate::model::{CompletedTask, CoreError, Task};

/// How the completion streak is approximated from recent subtask deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakPolicy {
    /// Most recently due completed subtasks considered.
    pub window: usize,
    pub horizon_days: i64,
    pub cap: u32,
}

impl Default for StreakPolicy {
    fn default() -> Self {
        StreakPolicy {
            window: 10,
            horizon_days: 7,
            cap: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskMetrics {
    pub on_pace: usize,
    pub behind: usize,
    pub total: usize,
    pub streak: u32,
    pub on_pace_tasks: Vec<Task>,
    pub behind_tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetrics {
    pub completion_rate: f64,
    pub on_time: usize,
    pub overdue: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisData {
    pub subtask_metrics: SubtaskMetrics,
    pub task_metrics: TaskMetrics,
}

/// True when any unfinished subtask's deadline is strictly before `now`.
pub fn is_behind(task: &Task, now: &LocalTime) -> Result<bool, CoreError> {
    for subtask in task.subtasks.iter().filter(|s| !s.done) {
        if subtask.deadline_at(now.offset())? < *now {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Splits unfinished tasks into on-pace and behind, and derives the streak.
pub fn compute_subtask_metrics(
    tasks: &[Task],
    now: &LocalTime,
    policy: &StreakPolicy,
) -> Result<SubtaskMetrics, CoreError> {
    let mut on_pace_tasks = Vec::new();
    let mut behind_tasks = Vec::new();
    for task in tasks.iter().filter(|t| !t.done) {
        if is_behind(task, now)? {
            behind_tasks.push(task.clone());
        } else {
            on_pace_tasks.push(task.clone());
        }
    }
    let streak = compute_streak(tasks, now, policy)?;
    Ok(SubtaskMetrics {
        on_pace: on_pace_tasks.len(),
        behind: behind_tasks.len(),
        total: on_pace_tasks.len() + behind_tasks.len(),
        streak,
        on_pace_tasks,
        behind_tasks,
    })
}

/// Counts the leading run of recently due completed subtasks.
///
/// This is not a per-day history: it looks at the `window` latest-due completed subtasks
/// and counts them until one falls outside the horizon.
pub fn compute_streak(
    tasks: &[Task],
    now: &LocalTime,
    policy: &StreakPolicy,
) -> Result<u32, CoreError> {
    let mut completed = Vec::new();
    for subtask in tasks.iter().flat_map(|t| t.subtasks.iter()).filter(|s| s.done) {
        completed.push(subtask.deadline_at(now.offset())?);
    }
    completed.sort_by(|a, b| b.cmp(a));
    let horizon = ChronoDuration::try_days(policy.horizon_days)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| {
            CoreError::DateOutOfRange(format!("{} days before {}", policy.horizon_days, now))
        })?;
    let run = completed
        .iter()
        .take(policy.window)
        .take_while(|deadline| **deadline >= horizon)
        .count();
    Ok(u32::try_from(run).unwrap_or(u32::MAX).min(policy.cap))
}

pub fn compute_task_metrics(
    active: &[Task],
    completed: &[CompletedTask],
    now: &LocalTime,
) -> Result<TaskMetrics, CoreError> {
    let total = active.len() + completed.len();
    let completion_rate = if total == 0 {
        0.0
    } else {
        100.0 * completed.len() as f64 / total as f64
    };
    let mut on_time = 0;
    let mut overdue = 0;
    for done in completed {
        let deadline = done.task.deadline_at(now.offset())?;
        if done.completed_at <= deadline.timestamp_millis() {
            on_time += 1;
        } else {
            overdue += 1;
        }
    }
    for task in active.iter().filter(|t| !t.done) {
        if task.deadline_at(now.offset())? < *now {
            overdue += 1;
        }
    }
    Ok(TaskMetrics {
        completion_rate,
        on_time,
        overdue,
        total,
    })
}

pub fn analyze(
    active: &[Task],
    completed: &[CompletedTask],
    now: &LocalTime,
    policy: &StreakPolicy,
) -> Result<AnalysisData, CoreError> {
    let subtask_metrics = compute_subtask_metrics(active, now, policy)?;
    let task_metrics = compute_task_metrics(active, completed, now)?;
    debug!(
        "analysis: {} behind of {}, streak {}, {} overdue",
        subtask_metrics.behind, subtask_metrics.total, subtask_metrics.streak, task_metrics.overdue
    );
    Ok(AnalysisData {
        subtask_metrics,
        task_metrics,
    })
}
