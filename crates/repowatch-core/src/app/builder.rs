//! SchedulerBuilder - スケジューラの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - expect_modes() で必要なモードを宣言
//! - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
//! - 不足があれば BuildError を返す（run の途中で ModeNotRegistered にならない）

use std::sync::Arc;

use super::registry::{CollaboratorRegistry, ModeCollaborators, RegistryError};
use super::scheduler::Scheduler;
use crate::domain::TaskMode;
use crate::impls::{InMemoryState, TerminalRenderer};
use crate::ports::{
    Clock, DeltaSource, IdGenerator, Renderer, StatePersistence, Summarizer, SystemClock,
    UlidGenerator,
};

/// # 使用例
/// ```ignore
/// let scheduler = SchedulerBuilder::new()
///     .register(TaskMode::News, source, summarizer)?
///     .expect_modes(&[TaskMode::News])
///     .persistence(Arc::new(JsonStateFile::new("state.json")))
///     .build()?;
/// let report = scheduler.run(tasks, &config).await?;
/// ```
pub struct SchedulerBuilder {
    registry: CollaboratorRegistry,
    expected_modes: Option<Vec<TaskMode>>,
    renderer: Option<Arc<dyn Renderer>>,
    persistence: Option<Arc<dyn StatePersistence>>,
    clock: Arc<dyn Clock>,
    ids: Option<Box<dyn IdGenerator>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no collaborators registered for any mode")]
    NoModesRegistered,

    #[error("missing collaborators for modes: {0:?}")]
    MissingModes(Vec<TaskMode>),
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self {
            registry: CollaboratorRegistry::new(),
            expected_modes: None,
            renderer: None,
            persistence: None,
            clock: Arc::new(SystemClock),
            ids: None,
        }
    }

    /// Register the collaborators for one mode.
    pub fn register(
        mut self,
        mode: TaskMode,
        delta: Arc<dyn DeltaSource>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Self, RegistryError> {
        self.registry
            .register(mode, ModeCollaborators::new(delta, summarizer))?;
        Ok(self)
    }

    /// Use a prebuilt registry, replacing anything registered so far.
    pub fn with_registry(mut self, registry: CollaboratorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Modes that must have collaborators for `build()` to succeed.
    pub fn expect_modes(mut self, modes: &[TaskMode]) -> Self {
        self.expected_modes = Some(modes.to_vec());
        self
    }

    /// Defaults to a [`TerminalRenderer`] on stdout.
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Defaults to [`InMemoryState`].
    pub fn persistence(mut self, persistence: Arc<dyn StatePersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn id_generator(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn build(self) -> Result<Scheduler, BuildError> {
        if self.registry.is_empty() {
            return Err(BuildError::NoModesRegistered);
        }
        if let Some(expected) = &self.expected_modes {
            let registered = self.registry.registered_modes();
            let missing: Vec<TaskMode> = expected
                .iter()
                .filter(|m| !registered.contains(m))
                .copied()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingModes(missing));
            }
        }

        let clock = self.clock;
        let ids = self
            .ids
            .unwrap_or_else(|| Box::new(UlidGenerator::new(Arc::clone(&clock))));
        Ok(Scheduler {
            registry: Arc::new(self.registry),
            renderer: self
                .renderer
                .unwrap_or_else(|| Arc::new(TerminalRenderer::stdout())),
            persistence: self
                .persistence
                .unwrap_or_else(|| Arc::new(InMemoryState::new())),
            clock,
            ids,
        })
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedSource, StaticSummarizer};

    fn news() -> SchedulerBuilder {
        SchedulerBuilder::new()
            .register(
                TaskMode::News,
                Arc::new(ScriptedSource::new()),
                Arc::new(StaticSummarizer::new("ok")),
            )
            .unwrap()
    }

    #[test]
    fn test_build_success() {
        let scheduler = news().expect_modes(&[TaskMode::News]).build();
        assert!(scheduler.is_ok());
    }

    #[test]
    fn test_build_missing_modes() {
        let scheduler = news().expect_modes(&[TaskMode::News, TaskMode::Forks]).build();
        assert!(matches!(
            scheduler,
            Err(BuildError::MissingModes(missing)) if missing == vec![TaskMode::Forks]
        ));
    }

    #[test]
    fn test_build_without_any_mode() {
        assert!(matches!(
            SchedulerBuilder::new().build(),
            Err(BuildError::NoModesRegistered)
        ));
    }

    #[test]
    fn test_register_same_mode_twice() {
        let result = news().register(
            TaskMode::News,
            Arc::new(ScriptedSource::new()),
            Arc::new(StaticSummarizer::new("again")),
        );
        assert!(matches!(result, Err(RegistryError::DuplicateMode(TaskMode::News))));
    }
}
