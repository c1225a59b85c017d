//! App - アプリケーション層
//!
//! ports を組み合わせて並行処理エンジンを実装します。
//!
//! # 主要コンポーネント
//! - **SchedulerBuilder / Scheduler**: 構築と run 全体の制御
//! - **CollaboratorRegistry**: モード → 協調者
//! - **TaskExecutor**: 1 タスクの prepare / commit
//! - **DisplaySerializer**: 単一 consumer の表示キュー
//! - **StateStore**: キーごとのロックで守られた増分状態

pub mod builder;
pub mod config;
pub mod display;
pub mod executor;
pub mod registry;
pub mod scheduler;
pub mod state_store;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, SchedulerBuilder};
pub use self::config::{RepositoryEntry, RunConfig, WatchConfig};
pub use self::display::{DisplayHandle, DisplaySerializer, OrderPolicy};
pub use self::executor::{ExecSettings, TaskExecutor};
pub use self::registry::{CollaboratorRegistry, ModeCollaborators, RegistryError};
pub use self::scheduler::Scheduler;
pub use self::state_store::{KeyClaim, StateStore};
