use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::color::SUBTASK_SHADE_PERCENT;
use crate::metrics::StreakPolicy;

/// Optional `config.yml` next to the task snapshot. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub subtask_shade: i32,
    pub streak: StreakPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            subtask_shade: SUBTASK_SHADE_PERCENT,
            streak: StreakPolicy::default(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Settings> {
        if !path.exists() {
            debug!("no settings at {:?}, using defaults", path);
            return Ok(Settings::default());
        }
        let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        if data.trim().is_empty() {
            return Ok(Settings::default());
        }
        serde_yaml::from_str(&data).with_context(|| format!("parsing settings {:?}", path))
    }
}
