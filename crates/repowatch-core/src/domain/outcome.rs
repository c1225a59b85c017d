//! Outcome model: per-task results and the aggregate run report.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::cost::CostInfo;
use super::errors::TaskError;
use super::ids::RunId;
use super::task::{RepoKey, TaskMode};
use crate::observability::RunCounts;

/// Terminal status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Changes were summarized and cursors advanced.
    Succeeded,
    /// Nothing new since the last recorded cursors.
    Skipped,
    /// Timeout, collaborator error, or panic. Cursors untouched.
    Failed,
}

/// What happened to one task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub key: RepoKey,
    pub order: usize,
    pub mode: TaskMode,
    pub status: TaskStatus,
    pub error: Option<TaskError>,
    pub cost: Option<CostInfo>,
    pub elapsed: Duration,
}

impl TaskOutcome {
    pub fn is_succeeded(&self) -> bool {
        self.status == TaskStatus::Succeeded
    }

    pub fn is_skipped(&self) -> bool {
        self.status == TaskStatus::Skipped
    }

    pub fn is_failed(&self) -> bool {
        self.status == TaskStatus::Failed
    }
}

/// Counters reported by the display serializer when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStats {
    pub rendered: usize,
    pub failed: usize,
}

/// Aggregate result of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    /// Terminal outcomes, sorted by task order.
    pub outcomes: Vec<TaskOutcome>,
    /// Tasks never dispatched because the global deadline expired.
    pub pending: Vec<RepoKey>,
    pub elapsed: Duration,
    pub deadline_expired: bool,
    pub render: RenderStats,
}

impl RunReport {
    pub fn empty(run_id: RunId) -> Self {
        Self {
            run_id,
            outcomes: Vec::new(),
            pending: Vec::new(),
            elapsed: Duration::ZERO,
            deadline_expired: false,
            render: RenderStats::default(),
        }
    }

    pub fn outcome(&self, key: &RepoKey) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|o| &o.key == key)
    }

    pub fn failed(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| o.is_succeeded())
    }

    pub fn counts(&self) -> RunCounts {
        let mut counts = RunCounts {
            pending: self.pending.len(),
            ..RunCounts::default()
        };
        for outcome in &self.outcomes {
            match outcome.status {
                TaskStatus::Succeeded => counts.succeeded += 1,
                TaskStatus::Skipped => counts.skipped += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn total_cost(&self) -> CostInfo {
        let mut total = CostInfo::default();
        for cost in self.outcomes.iter().filter_map(|o| o.cost.as_ref()) {
            total.absorb(cost);
        }
        total
    }

    /// Every task reached a terminal state and none failed.
    pub fn is_clean(&self) -> bool {
        !self.deadline_expired && self.pending.is_empty() && self.failed().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn outcome(key: &str, order: usize, status: TaskStatus, cost: Option<CostInfo>) -> TaskOutcome {
        TaskOutcome {
            key: RepoKey::new(key),
            order,
            mode: TaskMode::News,
            status,
            error: None,
            cost,
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn counts_and_cost_aggregate_outcomes() {
        let mut report = RunReport::empty(RunId::from_ulid(Ulid::new()));
        report.outcomes = vec![
            outcome("a/a", 0, TaskStatus::Succeeded, Some(CostInfo::estimated("p", 400, 40))),
            outcome("b/b", 1, TaskStatus::Skipped, None),
            outcome("c/c", 2, TaskStatus::Failed, None),
            outcome("d/d", 3, TaskStatus::Succeeded, Some(CostInfo::estimated("p", 400, 40))),
        ];
        report.pending = vec![RepoKey::new("e/e")];

        let counts = report.counts();
        assert_eq!(counts.succeeded, 2);
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.pending, 1);
        assert_eq!(report.total_cost().total_tokens, 220);
        assert!(!report.is_clean());
        assert_eq!(report.failed().count(), 1);
        assert!(report.outcome(&RepoKey::new("b/b")).unwrap().is_skipped());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&TaskStatus::Skipped).unwrap(), "\"skipped\"");
    }
}
