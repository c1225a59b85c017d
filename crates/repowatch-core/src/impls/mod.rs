//! Impls - ports の実装
//!
//! - **JsonStateFile**: 状態ドキュメントの JSON ファイル保存
//! - **InMemoryState**: テスト・組み込み用
//! - **TerminalRenderer**: 端末表示
//! - **RetryingDeltaSource**: 一時的エラーの再試行ラッパー

pub mod json_state;
pub mod memory_state;
pub mod retrying;
pub mod terminal;

pub use self::json_state::JsonStateFile;
pub use self::memory_state::InMemoryState;
pub use self::retrying::RetryingDeltaSource;
pub use self::terminal::TerminalRenderer;
