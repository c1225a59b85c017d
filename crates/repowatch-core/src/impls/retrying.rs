//! RetryingDeltaSource - 一時的なネットワークエラーの再試行

use async_trait::async_trait;

use crate::domain::{Cursors, Delta, RepoTask, TaskError};
use crate::ports::DeltaSource;
use crate::queue::RetryPolicy;

/// Wraps a delta source and retries `TransientNetwork` failures.
///
/// Every other error, and the last transient one, is returned unchanged.
/// Backoff sleeps run inside the task's deadline, so a per-task timeout
/// still cuts a long retry sequence short.
pub struct RetryingDeltaSource<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: DeltaSource> RetryingDeltaSource<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<S: DeltaSource> DeltaSource for RetryingDeltaSource<S> {
    async fn fetch_delta(&self, task: &RepoTask, cursors: &Cursors) -> Result<Delta, TaskError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.inner.fetch_delta(task, cursors).await {
                Err(e) if e.is_transient() && self.policy.should_retry(attempts) => {
                    let delay = self.policy.next_delay(attempts);
                    tracing::warn!(attempts, ?delay, error = %e, "transient delta failure; retrying");
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RepoKey, TaskMode};
    use crate::testing::{Behavior, ScriptedSource};
    use std::time::Duration;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            multiplier: 1.0,
            jitter: false,
        }
    }

    fn task() -> RepoTask {
        RepoTask::new(0, "r", "https://github.com/o/r", TaskMode::News)
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let source = ScriptedSource::new()
            .with_behavior(RepoKey::new("o/r"), Behavior::FlakyThenFresh(2));
        let retrying = RetryingDeltaSource::new(source, policy(3));

        let delta = retrying.fetch_delta(&task(), &Cursors::new()).await.unwrap();
        assert!(delta.has_changes());
        assert_eq!(retrying.inner.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let source = ScriptedSource::new()
            .with_behavior(RepoKey::new("o/r"), Behavior::FlakyThenFresh(5));
        let retrying = RetryingDeltaSource::new(source, policy(2));

        let err = retrying.fetch_delta(&task(), &Cursors::new()).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(retrying.inner.calls(), 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let source = ScriptedSource::new().with_behavior(
            RepoKey::new("o/r"),
            Behavior::Fail(TaskError::Delta("not found".into())),
        );
        let retrying = RetryingDeltaSource::new(source, policy(5));

        let err = retrying.fetch_delta(&task(), &Cursors::new()).await.unwrap_err();
        assert_eq!(err, TaskError::Delta("not found".into()));
        assert_eq!(retrying.inner.calls(), 1);
    }
}
