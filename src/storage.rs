use crate::model::{sort_by_created, CompletedTask, Task};
use crate::notify::NotificationStore;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::debug;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const WORKSPACE_DIR: &str = ".taskgrid";
const TASKS_FILE: &str = "tasks.yml";
const NOTIFICATIONS_FILE: &str = "notifications.yml";
const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceScope {
    Project,
    Global,
}

#[derive(Debug, Clone)]
pub struct Workspace {
    pub dir: PathBuf,
    pub scope: WorkspaceScope,
}

/// Read-only snapshot of the task lists handed to the calendar and metrics code.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct TaskSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub completed: Vec<CompletedTask>,
}

impl Workspace {
    pub fn tasks_path(&self) -> PathBuf {
        self.dir.join(TASKS_FILE)
    }

    pub fn notifications_path(&self) -> PathBuf {
        self.dir.join(NOTIFICATIONS_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    fn fallback_name(&self) -> String {
        match self.scope {
            WorkspaceScope::Project => self
                .dir
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .unwrap_or("project")
                .to_string(),
            WorkspaceScope::Global => "default".to_string(),
        }
    }
}

pub fn init_project_workspace(start: &Path, name: Option<String>) -> Result<Workspace> {
    let dir = start.join(WORKSPACE_DIR);
    fs::create_dir_all(&dir).context("failed to create .taskgrid directory")?;
    let workspace = Workspace {
        dir,
        scope: WorkspaceScope::Project,
    };
    if !workspace.tasks_path().exists() {
        let snapshot = TaskSnapshot {
            name: name.unwrap_or_else(|| workspace.fallback_name()),
            ..TaskSnapshot::default()
        };
        write_yaml(&workspace.tasks_path(), &snapshot)?;
    }
    Ok(workspace)
}

pub fn locate_workspace(start: &Path) -> Result<Workspace> {
    if let Some(dir) = find_project_workspace(start) {
        return Ok(Workspace {
            dir,
            scope: WorkspaceScope::Project,
        });
    }
    Ok(Workspace {
        dir: global_workspace_dir()?,
        scope: WorkspaceScope::Global,
    })
}

pub fn current_workspace() -> Result<Workspace> {
    let cwd = env::current_dir()?;
    locate_workspace(&cwd)
}

/// Loads the task snapshot. A missing file reads as an empty snapshot; tasks are never
/// written back from here.
/// Active tasks come back in the default order, newest `createdAt` first.
pub fn load_snapshot(workspace: &Workspace) -> Result<TaskSnapshot> {
    let path = workspace.tasks_path();
    if !path.exists() {
        debug!("no task snapshot at {:?}", path);
        return Ok(TaskSnapshot {
            name: workspace.fallback_name(),
            ..TaskSnapshot::default()
        });
    }
    let data = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
    let mut snapshot: TaskSnapshot = serde_yaml::from_str(&data).context("parsing task snapshot")?;
    sort_by_created(&mut snapshot.tasks);
    debug!(
        "loaded {} active and {} completed tasks from {:?}",
        snapshot.tasks.len(),
        snapshot.completed.len(),
        path
    );
    Ok(snapshot)
}

pub fn load_notifications(workspace: &Workspace) -> Result<NotificationStore> {
    let path = workspace.notifications_path();
    if !path.exists() {
        return Ok(NotificationStore::default());
    }
    let data = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
    if data.trim().is_empty() {
        return Ok(NotificationStore::default());
    }
    serde_yaml::from_str(&data).context("parsing notification store")
}

pub fn save_notifications(workspace: &Workspace, store: &NotificationStore) -> Result<()> {
    write_yaml(&workspace.notifications_path(), store)
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(value).context("serializing yaml")?;
    fs::write(path, serialized).with_context(|| format!("writing {:?}", path))?;
    debug!("wrote {:?}", path);
    Ok(())
}

fn find_project_workspace(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(WORKSPACE_DIR);
        if candidate.join(TASKS_FILE).exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_workspace_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "taskgrid").context("locating data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
