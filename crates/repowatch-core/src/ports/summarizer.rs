//! Summarizer port - AI 要約呼び出しの抽象化

use async_trait::async_trait;

use crate::domain::{CostInfo, Delta, RepoTask, TaskError};

/// Summary text plus what it cost to produce.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub text: String,
    pub cost: Option<CostInfo>,
}

impl Summary {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cost: None,
        }
    }

    pub fn with_cost(mut self, cost: CostInfo) -> Self {
        self.cost = Some(cost);
        self
    }
}

/// Turns a non-empty delta into human-readable text.
///
/// Only called when `delta.has_changes()` is true.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, task: &RepoTask, delta: &Delta) -> Result<Summary, TaskError>;
}
