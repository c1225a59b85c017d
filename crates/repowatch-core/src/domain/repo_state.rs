//! Per-repository incremental-processing state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::delta::Cursors;
use super::task::RepoKey;

/// Persisted state for one repository key.
///
/// The key itself is the map key of [`StateDocument`]; this value only holds
/// what changes between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoState {
    #[serde(default)]
    pub cursors: Cursors,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check: Option<DateTime<Utc>>,
}

impl RepoState {
    pub fn cursor(&self, sub_entity: &str) -> Option<&str> {
        self.cursors.get(sub_entity).map(String::as_str)
    }

    /// Merge new markers over the existing cursors and stamp the check time.
    ///
    /// Sub-entities missing from `markers` keep their previous cursor.
    pub fn advance(mut self, markers: &Cursors, now: DateTime<Utc>) -> Self {
        for (sub_entity, marker) in markers {
            self.cursors.insert(sub_entity.clone(), marker.clone());
        }
        self.last_check = Some(now);
        self
    }
}

/// The whole durable document: `{ "<key>": { "cursors": {...}, "last_check": ... } }`.
pub type StateDocument = BTreeMap<RepoKey, RepoState>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn advance_merges_cursors() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let mut state = RepoState::default();
        state.cursors.insert("main".into(), "old".into());
        state.cursors.insert("dev".into(), "keep".into());

        let mut markers = Cursors::new();
        markers.insert("main".into(), "new".into());
        markers.insert("feature".into(), "f1".into());

        let next = state.advance(&markers, now);
        assert_eq!(next.cursor("main"), Some("new"));
        assert_eq!(next.cursor("dev"), Some("keep"));
        assert_eq!(next.cursor("feature"), Some("f1"));
        assert_eq!(next.last_check, Some(now));
    }

    #[test]
    fn document_uses_repo_key_as_object_key() {
        let mut doc = StateDocument::new();
        let mut state = RepoState::default();
        state.cursors.insert("main".into(), "abc".into());
        doc.insert(RepoKey::new("Owner/Repo"), state);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["owner/repo"]["cursors"]["main"], "abc");
        assert!(json["owner/repo"].get("last_check").is_none());
    }

    #[test]
    fn document_tolerates_missing_fields() {
        let doc: StateDocument = serde_json::from_str(r#"{"a/b": {}}"#).unwrap();
        assert_eq!(doc[&RepoKey::new("a/b")], RepoState::default());
    }
}
