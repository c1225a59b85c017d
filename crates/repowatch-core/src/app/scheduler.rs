//! Scheduler - run 全体の制御
//!
//! 1. 設定検証・重複キー拒否・状態ロード
//! 2. 表示 consumer とワーカーを起動
//! 3. 全ワーカー終了 or global deadline を待つ（deadline で実行中の prepare は中断）
//! 4. 最終 flush → 表示 drain → RunReport

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tracing::Instrument;

use super::config::RunConfig;
use super::display::DisplaySerializer;
use super::executor::{ExecSettings, TaskExecutor};
use super::registry::CollaboratorRegistry;
use super::state_store::StateStore;
use crate::domain::{RepoTask, RunError, RunId, RunReport};
use crate::ports::{Clock, IdGenerator, Renderer, StatePersistence};
use crate::queue::DispatchQueue;
use crate::worker::WorkerGroup;

/// Runs batches of repository tasks. Built with
/// [`SchedulerBuilder`](super::builder::SchedulerBuilder).
pub struct Scheduler {
    pub(crate) registry: Arc<CollaboratorRegistry>,
    pub(crate) renderer: Arc<dyn Renderer>,
    pub(crate) persistence: Arc<dyn StatePersistence>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) ids: Box<dyn IdGenerator>,
}

impl Scheduler {
    pub fn registry(&self) -> &CollaboratorRegistry {
        &self.registry
    }

    /// Process `tasks` with at most `config.max_workers` concurrent workers.
    ///
    /// Task failures are reported in the outcomes, not as errors. The global
    /// deadline yields `RunError::GlobalTimeout` carrying the partial report.
    pub async fn run(&self, tasks: Vec<RepoTask>, config: &RunConfig) -> Result<RunReport, RunError> {
        config.validate()?;
        reject_duplicate_keys(&tasks)?;

        let run_id = self.ids.generate_run_id();
        let span = tracing::info_span!("run", run_id = %run_id);
        self.run_inner(run_id, tasks, config).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: RunId,
        tasks: Vec<RepoTask>,
        config: &RunConfig,
    ) -> Result<RunReport, RunError> {
        let started = Instant::now();
        let store = Arc::new(
            StateStore::load(Arc::clone(&self.persistence), config.save_state)
                .await
                .map_err(RunError::StateLoad)?,
        );

        let mut report = RunReport::empty(run_id);
        if tasks.is_empty() {
            tracing::info!("nothing to do");
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        let task_count = tasks.len();
        let workers = config.effective_workers(task_count);
        tracing::info!(tasks = task_count, workers, "run started");

        let display = DisplaySerializer::start(
            Arc::clone(&self.renderer),
            config.order_policy,
            tasks.iter().map(RepoTask::order),
        );
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let executor = Arc::new(TaskExecutor::new(
            Arc::clone(&self.registry),
            Arc::clone(&store),
            display.handle(),
            Arc::clone(&self.clock),
            ExecSettings::from(config),
            cancel_rx,
        ));
        let queue = Arc::new(DispatchQueue::new(tasks));
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();

        let mut group = WorkerGroup::spawn(workers, Arc::clone(&queue), executor, outcome_tx);

        let deadline = tokio::time::sleep(config.global_timeout);
        tokio::pin!(deadline);
        let mut pending = Vec::new();
        let mut deadline_expired = false;

        loop {
            tokio::select! {
                joined = group.join_next() => match joined {
                    Some(Ok(())) => {}
                    Some(Err(e)) => tracing::warn!(error = %e, "worker exited abnormally"),
                    None => break,
                },
                _ = &mut deadline, if !deadline_expired => {
                    deadline_expired = true;
                    pending = queue.close().await;
                    group.request_shutdown();
                    // 実行中の prepare を打ち切る。commit は最後まで走る
                    let _ = cancel_tx.send(true);
                    tracing::warn!(
                        timeout = ?config.global_timeout,
                        never_started = pending.len(),
                        "global deadline expired; aborting in-flight collaborator calls"
                    );
                }
            }
        }

        // 未着手のタスクも settle しておかないと input_order の表示が詰まる
        let handle = display.handle();
        for task in &pending {
            handle.settle(task.order());
        }
        drop(handle);

        if let Err(e) = store.flush().await {
            tracing::warn!(error = %e, "final state flush failed");
        }
        report.render = display.drain_and_stop(config.display_drain_timeout).await;

        while let Ok(outcome) = outcome_rx.try_recv() {
            report.outcomes.push(outcome);
        }
        report.outcomes.sort_by_key(|o| o.order);
        report.pending = pending.iter().map(|t| t.key().clone()).collect();
        report.deadline_expired = deadline_expired;
        report.elapsed = started.elapsed();

        let counts = report.counts();
        tracing::info!(
            succeeded = counts.succeeded,
            skipped = counts.skipped,
            failed = counts.failed,
            pending = counts.pending,
            elapsed = ?report.elapsed,
            "run finished"
        );

        if deadline_expired {
            return Err(RunError::GlobalTimeout {
                timeout: config.global_timeout,
                report: Box::new(report),
            });
        }
        Ok(report)
    }
}

fn reject_duplicate_keys(tasks: &[RepoTask]) -> Result<(), RunError> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(task.key()) {
            return Err(RunError::DuplicateTaskKey(task.key().clone()));
        }
    }
    Ok(())
}
