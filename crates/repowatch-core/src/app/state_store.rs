//! State store - キーごとのロックで守られた増分状態
//!
//! - slot はキーごとに一度だけ作られ、run の間は削除されない
//! - 無関係なキー同士は互いをブロックしない
//! - 変更は read-modify-write (`with_lock`) のみ

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::Mutex;

use crate::domain::{Cursors, PersistError, RepoKey, RepoState, StateDocument, TaskError};
use crate::ports::StatePersistence;

type Slot = Arc<Mutex<RepoState>>;

pub struct StateStore {
    slots: StdMutex<HashMap<RepoKey, Slot>>,
    claims: Arc<StdMutex<HashSet<RepoKey>>>,
    /// Serializes document writes; snapshots are taken while holding it.
    flush_lock: Mutex<()>,
    persistence: Arc<dyn StatePersistence>,
    save_state: bool,
}

impl StateStore {
    /// Empty store.
    pub fn new(persistence: Arc<dyn StatePersistence>, save_state: bool) -> Self {
        Self::from_document(StateDocument::new(), persistence, save_state)
    }

    /// Load the persisted document and seed one slot per key.
    pub async fn load(
        persistence: Arc<dyn StatePersistence>,
        save_state: bool,
    ) -> Result<Self, PersistError> {
        let source = Arc::clone(&persistence);
        let document = tokio::task::spawn_blocking(move || source.load())
            .await
            .map_err(|e| PersistError::Interrupted(e.to_string()))??;
        tracing::debug!(keys = document.len(), "state loaded");
        Ok(Self::from_document(document, persistence, save_state))
    }

    fn from_document(
        document: StateDocument,
        persistence: Arc<dyn StatePersistence>,
        save_state: bool,
    ) -> Self {
        let slots = document
            .into_iter()
            .map(|(key, state)| (key, Arc::new(Mutex::new(state))))
            .collect();
        Self {
            slots: StdMutex::new(slots),
            claims: Arc::new(StdMutex::new(HashSet::new())),
            flush_lock: Mutex::new(()),
            persistence,
            save_state,
        }
    }

    /// Get or create the slot for `key`. The map lock is held only for the lookup.
    fn slot(&self, key: &RepoKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// Replace the key's state with `f(current)` while holding the key's lock.
    ///
    /// `f` runs synchronously, so the guard is released on every path,
    /// including when the calling future is dropped while waiting.
    pub async fn with_lock<F>(&self, key: &RepoKey, f: F) -> RepoState
    where
        F: FnOnce(RepoState) -> RepoState,
    {
        let slot = self.slot(key);
        let mut guard = slot.lock().await;
        let next = f(guard.clone());
        *guard = next.clone();
        next
    }

    pub async fn get(&self, key: &RepoKey) -> RepoState {
        self.slot(key).lock().await.clone()
    }

    /// Snapshot of the key's cursors.
    pub async fn cursors(&self, key: &RepoKey) -> Cursors {
        self.slot(key).lock().await.cursors.clone()
    }

    /// Copy of every non-empty slot.
    pub async fn snapshot(&self) -> StateDocument {
        let slots: Vec<(RepoKey, Slot)> = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.iter().map(|(k, s)| (k.clone(), Arc::clone(s))).collect()
        };

        let mut document = StateDocument::new();
        for (key, slot) in slots {
            let state = slot.lock().await.clone();
            if state != RepoState::default() {
                document.insert(key, state);
            }
        }
        document
    }

    /// Write the whole document. No-op when saving is disabled.
    pub async fn flush(&self) -> Result<(), PersistError> {
        if !self.save_state {
            return Ok(());
        }

        let _guard = self.flush_lock.lock().await;
        let document = self.snapshot().await;
        let sink = Arc::clone(&self.persistence);
        tokio::task::spawn_blocking(move || sink.persist(&document))
            .await
            .map_err(|e| PersistError::Interrupted(e.to_string()))??;
        tracing::trace!("state flushed");
        Ok(())
    }

    /// Mark `key` as in flight. Fails if another task already holds it.
    pub fn claim(&self, key: &RepoKey) -> Result<KeyClaim, TaskError> {
        let mut claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        if !claims.insert(key.clone()) {
            return Err(TaskError::StateConflict {
                key: key.clone(),
                detail: "another task is already processing this key".to_string(),
            });
        }
        Ok(KeyClaim {
            key: key.clone(),
            claims: Arc::clone(&self.claims),
        })
    }
}

/// Released on drop.
#[derive(Debug)]
pub struct KeyClaim {
    key: RepoKey,
    claims: Arc<StdMutex<HashSet<RepoKey>>>,
}

impl KeyClaim {
    pub fn key(&self) -> &RepoKey {
        &self.key
    }
}

impl Drop for KeyClaim {
    fn drop(&mut self) {
        let mut claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        claims.remove(&self.key);
    }
}
