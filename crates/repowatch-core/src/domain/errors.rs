//! Errors - エラー型と分類
//!
//! - `TaskError`: 1 タスクの失敗。必ずそのタスクの `TaskOutcome` に閉じ込める
//! - `RunError`: `Scheduler::run` の呼び出し元に返す数少ない条件
//! - `PersistError` / `ConfigError`: 状態ドキュメントと設定ファイルのアダプタ

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::outcome::RunReport;
use super::task::{RepoKey, TaskMode};

/// Operational classification of a task error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// May succeed on a later attempt (network hiccup, timeout).
    Transient,
    /// Retrying the same input will fail the same way.
    Permanent,
    /// A locking/ownership invariant was violated. A bug, not a condition.
    Invariant,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    #[error("task timed out after {0:?}")]
    Timeout(Duration),

    #[error("summarization failed: {0}")]
    Summarization(String),

    #[error("state conflict for {key}: {detail}")]
    StateConflict { key: RepoKey, detail: String },

    #[error("delta retrieval failed: {0}")]
    Delta(String),

    #[error("no collaborators registered for mode={0}")]
    ModeNotRegistered(TaskMode),

    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaskError::TransientNetwork(_) | TaskError::Timeout(_) => ErrorKind::Transient,
            TaskError::StateConflict { .. } => ErrorKind::Invariant,
            TaskError::Summarization(_)
            | TaskError::Delta(_)
            | TaskError::ModeNotRegistered(_)
            | TaskError::Panicked(_) => ErrorKind::Permanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("state document {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode state document: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("state write was interrupted: {0}")]
    Interrupted(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Hard failures of a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("max_workers must be at least 1 (got {0})")]
    InvalidWorkerCount(usize),

    #[error("{0} must be greater than zero")]
    InvalidTimeout(&'static str),

    #[error("task key {0} appears more than once in the run")]
    DuplicateTaskKey(RepoKey),

    #[error("failed to load state: {0}")]
    StateLoad(#[source] PersistError),

    #[error("global timeout of {timeout:?} expired; {} task(s) never started", .report.pending.len())]
    GlobalTimeout {
        timeout: Duration,
        report: Box<RunReport>,
    },
}

impl RunError {
    /// The partial report, when the run got far enough to produce one.
    pub fn partial_report(&self) -> Option<&RunReport> {
        match self {
            RunError::GlobalTimeout { report, .. } => Some(report),
            _ => None,
        }
    }
}
