//! CollaboratorRegistry - モードごとの協調者の登録と管理
//!
//! - 初期化時に構築（mutable）
//! - 実行時は不変で共有（Arc）なのでロック不要

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{TaskError, TaskMode};
use crate::ports::{DeltaSource, Summarizer};

/// The pair of collaborators a task of one mode talks to.
#[derive(Clone)]
pub struct ModeCollaborators {
    pub delta: Arc<dyn DeltaSource>,
    pub summarizer: Arc<dyn Summarizer>,
}

impl ModeCollaborators {
    pub fn new(delta: Arc<dyn DeltaSource>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self { delta, summarizer }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("collaborators for mode '{0}' are already registered")]
    DuplicateMode(TaskMode),
}

/// TaskMode -> collaborators.
#[derive(Default, Clone)]
pub struct CollaboratorRegistry {
    modes: HashMap<TaskMode, ModeCollaborators>,
}

impl CollaboratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register collaborators for a mode. Registering a mode twice is an error.
    pub fn register(
        &mut self,
        mode: TaskMode,
        collaborators: ModeCollaborators,
    ) -> Result<(), RegistryError> {
        if self.modes.contains_key(&mode) {
            return Err(RegistryError::DuplicateMode(mode));
        }
        self.modes.insert(mode, collaborators);
        Ok(())
    }

    pub fn get(&self, mode: TaskMode) -> Result<&ModeCollaborators, TaskError> {
        self.modes.get(&mode).ok_or(TaskError::ModeNotRegistered(mode))
    }

    pub fn registered_modes(&self) -> Vec<TaskMode> {
        let mut modes: Vec<TaskMode> = self.modes.keys().copied().collect();
        modes.sort();
        modes
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedSource, StaticSummarizer};

    fn collaborators() -> ModeCollaborators {
        ModeCollaborators::new(
            Arc::new(ScriptedSource::new()),
            Arc::new(StaticSummarizer::new("ok")),
        )
    }

    #[test]
    fn register_and_get() {
        let mut registry = CollaboratorRegistry::new();
        registry.register(TaskMode::News, collaborators()).unwrap();

        assert!(registry.get(TaskMode::News).is_ok());
        assert_eq!(registry.registered_modes(), vec![TaskMode::News]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_mode_is_rejected() {
        let mut registry = CollaboratorRegistry::new();
        registry.register(TaskMode::Forks, collaborators()).unwrap();
        let err = registry.register(TaskMode::Forks, collaborators()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateMode(TaskMode::Forks)));
    }

    #[test]
    fn missing_mode_is_a_task_error() {
        let registry = CollaboratorRegistry::new();
        assert_eq!(
            registry.get(TaskMode::Forks).err(),
            Some(TaskError::ModeNotRegistered(TaskMode::Forks))
        );
    }
}
