//! Run configuration and the watch-list file.
//!
//! Durations are written as (fractional) seconds: `"repo_timeout": 0.2`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::display::OrderPolicy;
use crate::domain::{ConfigError, RepoTask, RunError, TaskMode};

/// Knobs for one `Scheduler::run`. Passed explicitly, never global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub max_workers: usize,

    /// Deadline for the collaborator phase of one task.
    #[serde(with = "secs")]
    pub repo_timeout: Duration,

    /// Stop dispatching new tasks after this long.
    #[serde(with = "secs")]
    pub global_timeout: Duration,

    /// Upper bound for the display to drain at the end of a run.
    #[serde(with = "secs")]
    pub display_drain_timeout: Duration,

    pub save_state: bool,
    pub show_costs: bool,
    pub show_unchanged: bool,
    pub order_policy: OrderPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            repo_timeout: Duration::from_secs(60),
            global_timeout: Duration::from_secs(180),
            display_drain_timeout: Duration::from_secs(10),
            save_state: true,
            show_costs: false,
            show_unchanged: false,
            order_policy: OrderPolicy::Fifo,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), RunError> {
        if self.max_workers == 0 {
            return Err(RunError::InvalidWorkerCount(self.max_workers));
        }
        if self.repo_timeout.is_zero() {
            return Err(RunError::InvalidTimeout("repo_timeout"));
        }
        if self.global_timeout.is_zero() {
            return Err(RunError::InvalidTimeout("global_timeout"));
        }
        if self.display_drain_timeout.is_zero() {
            return Err(RunError::InvalidTimeout("display_drain_timeout"));
        }
        Ok(())
    }

    /// min(max_workers, task_count)
    pub fn effective_workers(&self, task_count: usize) -> usize {
        self.max_workers.min(task_count)
    }
}

/// One entry of the watch list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub name: String,
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<TaskMode>,
}

/// The watch-list file: repositories plus run settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub repositories: Vec<RepositoryEntry>,
    pub settings: RunConfig,
}

impl WatchConfig {
    /// Load from a JSON file. A missing file is an empty configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found; using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };
        serde_json::from_str(&raw).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Ordered task list. Entries without a mode get `default_mode`.
    pub fn tasks(&self, default_mode: TaskMode) -> Vec<RepoTask> {
        self.repositories
            .iter()
            .enumerate()
            .map(|(order, entry)| {
                RepoTask::new(
                    order,
                    entry.name.clone(),
                    entry.url.clone(),
                    entry.mode.unwrap_or(default_mode),
                )
            })
            .collect()
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
