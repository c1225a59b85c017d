use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;

use crate::app::executor::TaskExecutor;
use crate::domain::TaskOutcome;
use crate::queue::DispatchQueue;

/// Worker group handle.
///
/// `request_shutdown()` stops new leases; in-flight tasks keep running.
/// `join_next()` waits for one worker at a time, for use inside `select!`.
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: JoinSet<()>,
}

impl WorkerGroup {
    /// Spawn `n` workers. Each outcome is sent on `outcomes` as soon as it is
    /// terminal.
    pub fn spawn(
        n: usize,
        queue: Arc<DispatchQueue>,
        executor: Arc<TaskExecutor>,
        outcomes: mpsc::UnboundedSender<TaskOutcome>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = JoinSet::new();
        for worker_id in 0..n {
            let q = Arc::clone(&queue);
            let ex = Arc::clone(&executor);
            let tx = outcomes.clone();
            let rx = shutdown_rx.clone();

            joins.spawn(
                async move {
                    worker_loop(worker_id, q, ex, tx, rx).await;
                }
                .in_current_span(),
            );
        }
        tracing::debug!(workers = n, "worker group started");

        Self { shutdown_tx, joins }
    }

    /// Stop taking new leases. Does not cancel in-flight tasks.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for the next worker to exit. `None` once all have exited.
    pub async fn join_next(&mut self) -> Option<Result<(), JoinError>> {
        self.joins.join_next().await
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<DispatchQueue>,
    executor: Arc<TaskExecutor>,
    outcomes: mpsc::UnboundedSender<TaskOutcome>,
    shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        // shutdown が来ていたら抜ける
        if *shutdown_rx.borrow() {
            break;
        }

        // 全タスクは起動前に enqueue 済みなので None は「もう無い」
        let Some(record) = queue.lease().await else {
            break;
        };

        // execute 自体の panic（commit 中など）もそのタスクの outcome にする
        let task = record.task().clone();
        let ex = Arc::clone(&executor);
        let joined = tokio::spawn(async move { ex.execute(record).await }.in_current_span()).await;
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(worker_id, key = %task.key(), error = %e, "task execution died");
                executor.abandon(task, e)
            }
        };
        if outcomes.send(outcome).is_err() {
            tracing::warn!(worker_id, "outcome receiver dropped");
            break;
        }
    }
    tracing::trace!(worker_id, "worker exited");
}
