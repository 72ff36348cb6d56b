pub mod calendar;
pub mod cli;
pub mod color;
pub mod commands;
pub mod config;
pub mod dates;
pub mod metrics;
pub mod model;
pub mod notify;
pub mod storage;

pub use calendar::{
    build_month, build_week, group_by_date, group_for_display, project_to_calendar_items,
    CalendarDay, CalendarItem, CalendarMonth, CalendarWeek, DisplayGroup, ItemKind, ItemsByDate,
};
pub use color::{color_for_task, lighten, Rgb};
pub use dates::{date_key, start_of_week, LocalTime};
pub use metrics::{
    analyze, compute_subtask_metrics, compute_task_metrics, AnalysisData, StreakPolicy,
    SubtaskMetrics, TaskMetrics,
};
pub use model::{CompletedTask, CoreError, Subtask, Task, TaskError};
pub use notify::{
    cleanup, evaluate, scan, Notification, NotificationDelta, NotificationKind, NotificationStore,
};
