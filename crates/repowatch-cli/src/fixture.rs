//! Offline collaborators for the demo binary.
//!
//! The fixture file stands in for the remote host:
//!
//! ```json
//! {
//!   "news": {
//!     "tokio-rs/tokio": {
//!       "delay_ms": 120,
//!       "changes": { "main": [ { "id": "a1b2", "kind": "commit", "sub_entity": "main", "title": "..." } ] }
//!     }
//!   },
//!   "forks": { ... }
//! }
//! ```
//!
//! Changes are listed oldest first per sub-entity.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use repowatch_core::domain::{
    ChangeKind, ChangeRecord, CostInfo, Cursors, Delta, RepoKey, RepoTask, TaskError, TaskMode,
    filter_since,
};
use repowatch_core::ports::{DeltaSource, Summarizer, Summary};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepoFixture {
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default)]
    pub changes: BTreeMap<String, Vec<ChangeRecord>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureFile {
    #[serde(default)]
    pub news: BTreeMap<RepoKey, RepoFixture>,
    #[serde(default)]
    pub forks: BTreeMap<RepoKey, RepoFixture>,
}

impl FixtureFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("invalid fixture {}", path.display()))
    }

    pub fn source(&self, mode: TaskMode) -> FixtureDeltaSource {
        let repos = match mode {
            TaskMode::News => self.news.clone(),
            TaskMode::Forks => self.forks.clone(),
        };
        FixtureDeltaSource { repos }
    }
}

/// Serves deltas from the fixture, resuming from the stored cursors.
pub struct FixtureDeltaSource {
    repos: BTreeMap<RepoKey, RepoFixture>,
}

#[async_trait]
impl DeltaSource for FixtureDeltaSource {
    async fn fetch_delta(&self, task: &RepoTask, cursors: &Cursors) -> Result<Delta, TaskError> {
        let fixture = self
            .repos
            .get(task.key())
            .ok_or_else(|| TaskError::Delta(format!("repository {} not found", task.key())))?;

        if fixture.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(fixture.delay_ms)).await;
        }

        let mut changes = Vec::new();
        let mut markers = Cursors::new();
        for (sub_entity, records) in &fixture.changes {
            if let Some(newest) = records.last() {
                markers.insert(sub_entity.clone(), newest.id.clone());
            }
            let last_seen = cursors.get(sub_entity).map(String::as_str);
            changes.extend(filter_since(records.clone(), last_seen));
        }
        Ok(Delta::new(changes, markers))
    }
}

/// Offline stand-in for the AI summarizer: a plain digest of the change titles.
pub struct DigestSummarizer {
    max_items: usize,
}

impl DigestSummarizer {
    pub fn new(max_items: usize) -> Self {
        Self { max_items }
    }
}

#[async_trait]
impl Summarizer for DigestSummarizer {
    async fn summarize(&self, task: &RepoTask, delta: &Delta) -> Result<Summary, TaskError> {
        let changes = delta.changes();
        let count = |kind: ChangeKind| changes.iter().filter(|c| c.kind == kind).count();

        let mut text = match task.mode() {
            TaskMode::News => format!(
                "{} new commit(s), {} release(s)\n",
                count(ChangeKind::Commit),
                count(ChangeKind::Release)
            ),
            TaskMode::Forks => format!(
                "{} fork commit(s) ahead of upstream\n",
                count(ChangeKind::ForkCommit)
            ),
        };
        for change in changes.iter().rev().take(self.max_items) {
            let short_id: String = change.id.chars().take(7).collect();
            match &change.author {
                Some(author) => text.push_str(&format!("- {} {} ({author})\n", short_id, change.title)),
                None => text.push_str(&format!("- {} {}\n", short_id, change.title)),
            }
        }
        if changes.len() > self.max_items {
            text.push_str(&format!("... and {} more\n", changes.len() - self.max_items));
        }

        let prompt_chars: usize = changes.iter().map(|c| c.title.len() + c.id.len()).sum();
        let cost = CostInfo::estimated("digest", prompt_chars, text.len());
        Ok(Summary::new(text).with_cost(cost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FIXTURE: &str = r#"{
        "news": {
            "o/r": {
                "changes": {
                    "main": [
                        {"id": "aaa1111", "kind": "commit", "sub_entity": "main", "title": "first"},
                        {"id": "bbb2222", "kind": "commit", "sub_entity": "main", "title": "second", "author": "kim"}
                    ],
                    "releases": [
                        {"id": "v1.0.0", "kind": "release", "sub_entity": "releases", "title": "v1.0.0"}
                    ]
                }
            }
        }
    }"#;

    fn fixture() -> FixtureFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();
        FixtureFile::load(file.path()).unwrap()
    }

    fn task() -> RepoTask {
        RepoTask::new(0, "R", "https://github.com/o/r", TaskMode::News)
    }

    #[tokio::test]
    async fn first_fetch_returns_everything_with_newest_markers() {
        let source = fixture().source(TaskMode::News);
        let delta = source.fetch_delta(&task(), &Cursors::new()).await.unwrap();

        assert_eq!(delta.changes().len(), 3);
        assert_eq!(delta.markers().get("main").map(String::as_str), Some("bbb2222"));
        assert_eq!(delta.markers().get("releases").map(String::as_str), Some("v1.0.0"));
    }

    #[tokio::test]
    async fn fetch_resumes_after_cursors() {
        let source = fixture().source(TaskMode::News);
        let mut cursors = Cursors::new();
        cursors.insert("main".into(), "aaa1111".into());
        cursors.insert("releases".into(), "v1.0.0".into());

        let delta = source.fetch_delta(&task(), &cursors).await.unwrap();
        let ids: Vec<&str> = delta.changes().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["bbb2222"]);
    }

    #[tokio::test]
    async fn unknown_repository_is_a_delta_error() {
        let source = fixture().source(TaskMode::Forks);
        let err = source.fetch_delta(&task(), &Cursors::new()).await.unwrap_err();
        assert!(matches!(err, TaskError::Delta(_)));
    }

    #[tokio::test]
    async fn digest_lists_newest_first_and_truncates() {
        let source = fixture().source(TaskMode::News);
        let delta = source.fetch_delta(&task(), &Cursors::new()).await.unwrap();

        let summary = DigestSummarizer::new(2).summarize(&task(), &delta).await.unwrap();
        assert!(summary.text.starts_with("2 new commit(s), 1 release(s)"));
        assert!(summary.text.contains("- bbb2222 second (kim)"));
        assert!(summary.text.contains("... and 1 more"));
        assert!(summary.cost.is_some_and(|c| c.total_tokens > 0));
    }
}
