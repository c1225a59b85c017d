//! repowatch-core
//!
//! リポジトリ処理の並行エンジン。ワーカープールがリポジトリごとに 1 タスクを実行し、
//! 表示は単一 consumer で直列化、状態はキーごとのロックで守る。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（task, delta, repo_state, outcome, cost, errors, ids）
//! - **ports**: 抽象化レイヤー（DeltaSource, Summarizer, Renderer, StatePersistence, Clock）
//! - **app**: アプリケーションロジック（builder, scheduler, executor, display, state_store）
//! - **queue**: dispatch queue とタスクの状態機械
//! - **worker**: ワーカーグループ
//! - **impls**: ports の実装（JsonStateFile, TerminalRenderer など）
//! - **observability**: tracing の初期化と集計

pub mod app;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{BuildError, OrderPolicy, RunConfig, Scheduler, SchedulerBuilder, WatchConfig};
pub use domain::{RepoKey, RepoTask, RunError, RunReport, TaskError, TaskMode, TaskOutcome, TaskStatus};
