//! DeltaSource port - リモートの変更取得の抽象化

use async_trait::async_trait;

use crate::domain::{Cursors, Delta, RepoTask, TaskError};

/// Computes what changed in a repository since `cursors`.
///
/// Implementations talk to the remote host. Retryable network failures are
/// reported as [`TaskError::TransientNetwork`]; see
/// [`RetryingDeltaSource`](crate::impls::RetryingDeltaSource) for a wrapper
/// that retries them.
#[async_trait]
pub trait DeltaSource: Send + Sync {
    async fn fetch_delta(&self, task: &RepoTask, cursors: &Cursors) -> Result<Delta, TaskError>;
}
