//! Task record: one task's progress through the state machine.

use std::time::Instant;

use super::TaskState;
use crate::domain::{CostInfo, RepoTask, TaskError, TaskOutcome, TaskStatus};

/// Tracks a leased task until it reaches a terminal state.
///
/// All state transitions happen here. Finishing consumes the record, so a
/// task can only report one outcome.
#[derive(Debug)]
pub struct TaskRecord {
    task: RepoTask,
    state: TaskState,
    started_at: Instant,
}

impl TaskRecord {
    /// A task waiting in the dispatch queue.
    pub fn new(task: RepoTask) -> Self {
        Self {
            task,
            state: TaskState::Pending,
            started_at: Instant::now(),
        }
    }

    /// Lease: Pending -> Running. The elapsed clock starts here.
    pub fn start(mut self) -> Self {
        debug_assert!(self.state.can_transition_to(TaskState::Running));
        self.state = TaskState::Running;
        self.started_at = Instant::now();
        self
    }

    pub fn task(&self) -> &RepoTask {
        &self.task
    }

    /// Back to the plain task (a record that was never leased).
    pub fn into_task(self) -> RepoTask {
        self.task
    }

    pub fn succeed(self, cost: Option<CostInfo>) -> TaskOutcome {
        self.finish(TaskStatus::Succeeded, None, cost)
    }

    pub fn skip(self) -> TaskOutcome {
        self.finish(TaskStatus::Skipped, None, None)
    }

    pub fn fail(self, error: TaskError) -> TaskOutcome {
        self.finish(TaskStatus::Failed, Some(error), None)
    }

    fn finish(self, status: TaskStatus, error: Option<TaskError>, cost: Option<CostInfo>) -> TaskOutcome {
        debug_assert!(self.state.can_transition_to(status.into()));
        TaskOutcome {
            key: self.task.key().clone(),
            order: self.task.order(),
            mode: self.task.mode(),
            status,
            error,
            cost,
            elapsed: self.started_at.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskMode;

    #[test]
    fn fail_carries_error_and_identity() {
        let task = RepoTask::new(7, "demo", "https://github.com/a/b", TaskMode::Forks);
        let record = TaskRecord::new(task);
        assert_eq!(record.state, TaskState::Pending);
        let record = record.start();
        assert_eq!(record.state, TaskState::Running);

        let outcome = record.fail(TaskError::Delta("404".into()));
        assert_eq!(outcome.order, 7);
        assert_eq!(outcome.key.as_str(), "a/b");
        assert_eq!(outcome.mode, TaskMode::Forks);
        assert_eq!(outcome.status, TaskStatus::Failed);
        assert_eq!(outcome.error, Some(TaskError::Delta("404".into())));
        assert!(outcome.cost.is_none());
    }
}
