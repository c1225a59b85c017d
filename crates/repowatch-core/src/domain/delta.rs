//! Delta model: what changed in a repository since its last recorded cursors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sub-entity name (`"main"`, a branch, a fork) -> last-seen marker.
pub type Cursors = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Commit,
    Release,
    ForkCommit,
}

/// A single change record (commit, release, fork commit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Commit SHA or release id.
    pub id: String,
    pub kind: ChangeKind,
    /// The sub-entity this change belongs to, e.g. `"main"` or `"fork-owner/repo:branch"`.
    pub sub_entity: String,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChangeRecord {
    pub fn new(
        id: impl Into<String>,
        kind: ChangeKind,
        sub_entity: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            sub_entity: sub_entity.into(),
            title: title.into(),
            author: None,
            timestamp: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Changes detected for one task invocation, plus the markers to persist once
/// those changes have been summarized.
///
/// Produced fresh per invocation; never shared between tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    changes: Vec<ChangeRecord>,
    markers: Cursors,
}

impl Delta {
    pub fn new(changes: Vec<ChangeRecord>, markers: Cursors) -> Self {
        Self { changes, markers }
    }

    /// No changes and nothing to advance.
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn with_marker(mut self, sub_entity: impl Into<String>, marker: impl Into<String>) -> Self {
        self.markers.insert(sub_entity.into(), marker.into());
        self
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn changes(&self) -> &[ChangeRecord] {
        &self.changes
    }

    pub fn markers(&self) -> &Cursors {
        &self.markers
    }

    pub fn into_markers(self) -> Cursors {
        self.markers
    }
}

/// Keep only the records that come after the last processed marker.
///
/// `changes` is ordered oldest first. The marker may be an abbreviated id, so
/// a prefix match is enough. An unknown marker means everything is new.
pub fn filter_since(changes: Vec<ChangeRecord>, last_marker: Option<&str>) -> Vec<ChangeRecord> {
    let Some(marker) = last_marker.filter(|m| !m.is_empty()) else {
        return changes;
    };

    match changes.iter().position(|c| c.id.starts_with(marker)) {
        Some(index) => changes.into_iter().skip(index + 1).collect(),
        None => changes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commits(ids: &[&str]) -> Vec<ChangeRecord> {
        ids.iter()
            .map(|id| ChangeRecord::new(*id, ChangeKind::Commit, "main", format!("commit {id}")))
            .collect()
    }

    fn ids(changes: &[ChangeRecord]) -> Vec<&str> {
        changes.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn filter_keeps_records_after_marker() {
        let filtered = filter_since(commits(&["aaa111", "bbb222", "ccc333"]), Some("bbb222"));
        assert_eq!(ids(&filtered), vec!["ccc333"]);
    }

    #[test]
    fn filter_matches_abbreviated_marker() {
        let filtered = filter_since(commits(&["aaa111", "bbb222", "ccc333"]), Some("aaa"));
        assert_eq!(ids(&filtered), vec!["bbb222", "ccc333"]);
    }

    #[test]
    fn filter_without_marker_or_unknown_marker_keeps_everything() {
        assert_eq!(filter_since(commits(&["a", "b"]), None).len(), 2);
        assert_eq!(filter_since(commits(&["a", "b"]), Some("")).len(), 2);
        assert_eq!(filter_since(commits(&["a", "b"]), Some("zzz")).len(), 2);
    }

    #[test]
    fn filter_at_newest_marker_is_empty() {
        assert!(filter_since(commits(&["a", "b"]), Some("b")).is_empty());
    }

    #[test]
    fn delta_has_changes_only_with_records() {
        let delta = Delta::unchanged().with_marker("main", "abc");
        assert!(!delta.has_changes());
        assert_eq!(delta.markers().get("main").map(String::as_str), Some("abc"));

        let delta = Delta::new(commits(&["x"]), Cursors::new());
        assert!(delta.has_changes());
    }
}
