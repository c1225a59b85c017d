//! Task state machine.

use serde::{Deserialize, Serialize};

use crate::domain::TaskStatus;

/// Task state.
///
/// State transitions:
/// - Pending -> Running -> Succeeded
/// - Pending -> Running -> Skipped
/// - Pending -> Running -> Failed
///
/// Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting in the dispatch queue.
    Pending,

    /// Leased by a worker.
    Running,

    Succeeded,

    /// Nothing new; markers merged, no summary.
    Skipped,

    Failed,
}

impl TaskState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Skipped | TaskState::Failed
        )
    }

    pub fn can_transition_to(self, next: TaskState) -> bool {
        match self {
            TaskState::Pending => next == TaskState::Running,
            TaskState::Running => next.is_terminal(),
            _ => false,
        }
    }
}

impl From<TaskStatus> for TaskState {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Succeeded => TaskState::Succeeded,
            TaskStatus::Skipped => TaskState::Skipped,
            TaskStatus::Failed => TaskState::Failed,
        }
    }
}
