//! Ports - 抽象化レイヤー
//!
//! エンジンが外部とやり取りする境界をここで定義します。
//! - DeltaSource: リモートホストからの変更取得
//! - Summarizer: AI 要約
//! - Renderer: 表示
//! - StatePersistence: 状態ドキュメントの保存先

pub mod clock;
pub mod delta_source;
pub mod id_generator;
pub mod persistence;
pub mod renderer;
pub mod summarizer;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::delta_source::DeltaSource;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::persistence::StatePersistence;
pub use self::renderer::{DisplayEvent, DisplayPayload, Renderer};
pub use self::summarizer::{Summarizer, Summary};
