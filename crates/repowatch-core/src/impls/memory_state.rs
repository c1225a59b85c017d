//! InMemoryState - テスト・組み込み用の状態保存先

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::domain::{PersistError, StateDocument};
use crate::ports::StatePersistence;

/// Keeps the last persisted document in memory and counts writes.
#[derive(Debug, Default)]
pub struct InMemoryState {
    document: Mutex<StateDocument>,
    writes: AtomicUsize,
}

impl InMemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document (as if loaded from disk).
    pub fn with_document(document: StateDocument) -> Self {
        Self {
            document: Mutex::new(document),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn document(&self) -> StateDocument {
        self.document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful `persist` calls.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl StatePersistence for InMemoryState {
    fn load(&self) -> Result<StateDocument, PersistError> {
        Ok(self.document())
    }

    fn persist(&self, document: &StateDocument) -> Result<(), PersistError> {
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = document.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
