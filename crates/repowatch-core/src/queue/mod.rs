//! Dispatch queue: the shared list of tasks workers lease from.

mod record;
mod retry;
mod state;

pub use record::TaskRecord;
pub use retry::RetryPolicy;
pub use state::TaskState;

use std::collections::VecDeque;

use tokio::sync::Mutex;

use crate::domain::RepoTask;

/// FIFO of tasks not yet started.
///
/// Everything is enqueued before the workers start, so `lease` never waits:
/// `None` means the queue is empty or closed and the worker should exit.
/// The internal lock is never held across an await.
pub struct DispatchQueue {
    inner: Mutex<Inner>,
}

struct Inner {
    ready: VecDeque<TaskRecord>,
    closed: bool,
}

impl DispatchQueue {
    pub fn new(tasks: impl IntoIterator<Item = RepoTask>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                ready: tasks.into_iter().map(TaskRecord::new).collect(),
                closed: false,
            }),
        }
    }

    /// Take the next task and move it to Running.
    pub async fn lease(&self) -> Option<TaskRecord> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return None;
        }
        inner.ready.pop_front().map(TaskRecord::start)
    }

    /// Stop handing out tasks. Returns the tasks that were never leased.
    pub async fn close(&self) -> Vec<RepoTask> {
        let mut inner = self.inner.lock().await;
        inner.closed = true;
        inner.ready.drain(..).map(TaskRecord::into_task).collect()
    }

    pub async fn remaining(&self) -> usize {
        self.inner.lock().await.ready.len()
    }
}
