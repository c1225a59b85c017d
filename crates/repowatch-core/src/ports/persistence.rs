//! StatePersistence port - 状態ドキュメントの永続化
//!
//! 同期 API。state store が blocking pool から呼ぶ。

use crate::domain::{PersistError, StateDocument};

/// Durable home of the state document.
///
/// Last writer wins. `persist` always receives the whole document.
pub trait StatePersistence: Send + Sync {
    /// Load the document. A missing document is an empty one, not an error.
    fn load(&self) -> Result<StateDocument, PersistError>;

    fn persist(&self, document: &StateDocument) -> Result<(), PersistError>;
}
