//! Task execution - 1 タスクの実行（prepare → commit）
//!
//! - prepare: delta 取得と要約。per-task timeout と global deadline の対象。
//!   別 task で実行するので panic も timeout もその task だけで完結する
//! - commit: 表示 enqueue・状態マージ・flush。timeout の外で実行するので
//!   コミット済みの書き込みがキャンセルされることはない

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::Instrument;

use super::config::RunConfig;
use super::display::DisplayHandle;
use super::registry::{CollaboratorRegistry, ModeCollaborators};
use super::state_store::StateStore;
use crate::domain::{Cursors, Delta, RepoTask, TaskError, TaskOutcome};
use crate::ports::{Clock, DisplayEvent, DisplayPayload, Summary};
use crate::queue::TaskRecord;

/// The subset of `RunConfig` a task needs.
#[derive(Debug, Clone, Copy)]
pub struct ExecSettings {
    pub repo_timeout: Duration,
    pub global_timeout: Duration,
    pub show_costs: bool,
    pub show_unchanged: bool,
}

impl From<&RunConfig> for ExecSettings {
    fn from(config: &RunConfig) -> Self {
        Self {
            repo_timeout: config.repo_timeout,
            global_timeout: config.global_timeout,
            show_costs: config.show_costs,
            show_unchanged: config.show_unchanged,
        }
    }
}

enum Prepared {
    Unchanged(Delta),
    Summarized { delta: Delta, summary: Summary },
}

pub struct TaskExecutor {
    registry: Arc<CollaboratorRegistry>,
    store: Arc<StateStore>,
    display: DisplayHandle,
    clock: Arc<dyn Clock>,
    settings: ExecSettings,
    /// true once the run's global deadline has expired
    cancel: watch::Receiver<bool>,
}

impl TaskExecutor {
    pub fn new(
        registry: Arc<CollaboratorRegistry>,
        store: Arc<StateStore>,
        display: DisplayHandle,
        clock: Arc<dyn Clock>,
        settings: ExecSettings,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            registry,
            store,
            display,
            clock,
            settings,
            cancel,
        }
    }

    /// Run one leased task to a terminal outcome. Never fails: every error
    /// ends up in the returned outcome.
    pub async fn execute(&self, record: TaskRecord) -> TaskOutcome {
        let task = record.task().clone();
        let span = tracing::info_span!(
            "task",
            key = %task.key(),
            mode = %task.mode(),
            order = task.order(),
        );

        async {
            let outcome = match self.store.claim(task.key()) {
                Err(e) => record.fail(e),
                Ok(_claim) => match self.prepare(&task).await {
                    Ok(prepared) => self.commit(record, &task, prepared).await,
                    Err(e) => {
                        tracing::warn!(error = %e, kind = ?e.kind(), "task failed");
                        record.fail(e)
                    }
                },
            };
            self.display.settle(task.order());
            tracing::debug!(status = ?outcome.status, elapsed = ?outcome.elapsed, "task finished");
            outcome
        }
        .instrument(span)
        .await
    }

    async fn prepare(&self, task: &RepoTask) -> Result<Prepared, TaskError> {
        let collaborators = self.registry.get(task.mode())?.clone();
        let cursors = self.store.cursors(task.key()).await;
        let timeout = self.settings.repo_timeout;

        let owned = task.clone();
        let mut handle = tokio::spawn(
            async move { fetch_and_summarize(collaborators, owned, cursors).await }
                .in_current_span(),
        );

        let mut cancel = self.cancel.clone();
        tokio::select! {
            joined = tokio::time::timeout(timeout, &mut handle) => match joined {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => Err(join_failure(e)),
                Err(_) => {
                    handle.abort();
                    Err(TaskError::Timeout(timeout))
                }
            },
            // sender が先に落ちても打ち切らない（Err はパターン不一致で無効化）
            Ok(_) = cancel.wait_for(|expired| *expired) => {
                handle.abort();
                tracing::warn!("aborted by the global deadline");
                Err(TaskError::Timeout(self.settings.global_timeout))
            }
        }
    }

    /// Outcome for a task whose `execute` future itself died (a panic in
    /// the commit phase). Settles its display order like `execute` would.
    pub fn abandon(&self, task: RepoTask, error: JoinError) -> TaskOutcome {
        self.display.settle(task.order());
        TaskRecord::new(task).start().fail(join_failure(error))
    }

    async fn commit(&self, record: TaskRecord, task: &RepoTask, prepared: Prepared) -> TaskOutcome {
        match prepared {
            Prepared::Unchanged(delta) => {
                self.advance(task, delta.markers()).await;
                if self.settings.show_unchanged {
                    self.display.enqueue(DisplayEvent::new(
                        task.order(),
                        DisplayPayload::NoUpdates {
                            repo_name: task.name().to_string(),
                        },
                    ));
                }
                tracing::info!("no new changes");
                record.skip()
            }
            Prepared::Summarized { delta, summary } => {
                let change_count = delta.changes().len();
                self.display.enqueue(DisplayEvent::new(
                    task.order(),
                    DisplayPayload::Summary {
                        repo_name: task.name().to_string(),
                        repo_url: task.endpoint().url().to_string(),
                        mode: task.mode(),
                        text: summary.text,
                        cost: summary.cost.clone(),
                        show_costs: self.settings.show_costs,
                        change_count,
                    },
                ));
                self.advance(task, delta.markers()).await;
                tracing::info!(changes = change_count, "summarized");
                record.succeed(summary.cost)
            }
        }
    }

    /// Merge markers under the key's lock, then flush.
    async fn advance(&self, task: &RepoTask, markers: &Cursors) {
        let now = self.clock.now();
        self.store
            .with_lock(task.key(), |state| state.advance(markers, now))
            .await;
        if let Err(e) = self.store.flush().await {
            tracing::warn!(error = %e, "state flush failed");
        }
    }
}

async fn fetch_and_summarize(
    collaborators: ModeCollaborators,
    task: RepoTask,
    cursors: Cursors,
) -> Result<Prepared, TaskError> {
    let delta = collaborators.delta.fetch_delta(&task, &cursors).await?;
    if !delta.has_changes() {
        return Ok(Prepared::Unchanged(delta));
    }
    let summary = collaborators.summarizer.summarize(&task, &delta).await?;
    Ok(Prepared::Summarized { delta, summary })
}

fn join_failure(error: JoinError) -> TaskError {
    if error.is_panic() {
        TaskError::Panicked(panic_message(error.into_panic()))
    } else {
        TaskError::Panicked(error.to_string())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
