//! Renderer port - 表示フォーマットの抽象化
//!
//! 呼び出し元は表示 consumer（単一スレッド）だけなので、
//! 実装側は端末への書き込みに追加のロックを要らない。

use std::io;

use crate::domain::{CostInfo, TaskMode};

/// What a worker wants shown for its task.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayPayload {
    Summary {
        repo_name: String,
        repo_url: String,
        mode: TaskMode,
        text: String,
        cost: Option<CostInfo>,
        show_costs: bool,
        change_count: usize,
    },
    NoUpdates {
        repo_name: String,
    },
}

impl DisplayPayload {
    pub fn repo_name(&self) -> &str {
        match self {
            DisplayPayload::Summary { repo_name, .. } | DisplayPayload::NoUpdates { repo_name } => {
                repo_name
            }
        }
    }
}

/// A queued unit of output. `order` is the producing task's input position.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayEvent {
    pub order: usize,
    pub payload: DisplayPayload,
}

impl DisplayEvent {
    pub fn new(order: usize, payload: DisplayPayload) -> Self {
        Self { order, payload }
    }
}

pub trait Renderer: Send + Sync {
    /// Render one event to completion.
    fn render(&self, payload: &DisplayPayload) -> io::Result<()>;
}
