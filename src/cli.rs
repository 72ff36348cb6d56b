use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "taskgrid", version, about = "Deadline calendar and progress analytics for tasks")]
pub struct Cli {
    /// Evaluate as if it were this instant (RFC 3339), instead of now
    #[arg(long, global = true)]
    pub at: Option<String>,
    /// Increase log output (repeatable)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a task workspace in the current directory
    Init {
        /// Optional workspace name
        #[arg(long)]
        name: Option<String>,
    },
    /// Show a month grid with the number of items due per day
    Month {
        /// Year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
        /// Month, 1-12 (defaults to the current month)
        #[arg(long)]
        month: Option<u32>,
    },
    /// Show the week containing a date, with its items
    Week {
        /// Any date in the week, YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
    },
    /// Show the items due on one day, subtasks nested under their task
    Day {
        /// Date, YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
    },
    /// Show pace, streak and completion metrics
    Stats,
    /// Check for overdue items and manage notifications
    Notify {
        #[command(subcommand)]
        action: Option<NotifyAction>,
    },
    /// List completed tasks whose retention has expired
    Expired,
}

#[derive(Subcommand, Debug)]
pub enum NotifyAction {
    /// Refresh overdue notifications and show unread ones (default)
    Check,
    /// List all stored notifications
    List,
    /// Mark one notification as read
    Read {
        /// Notification id
        id: String,
    },
    /// Mark every notification as read
    ReadAll,
    /// Delete every notification
    Clear,
}
