use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable repository identity (lowercase `owner/repo`).
///
/// This is the key of the persisted state document and of the striped locks
/// in the state store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoKey(String);

impl RepoKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_lowercase())
    }

    /// Derive the key from a repository URL.
    ///
    /// Accepts `https://host/owner/repo(.git)`, `git@host:owner/repo` and a
    /// bare `owner/repo`. Anything else falls back to its last path segment.
    pub fn from_url(url: &str) -> Self {
        match parse_owner_repo(url) {
            Some((owner, repo)) => Self::new(format!("{owner}/{repo}")),
            None => {
                let trimmed = url.trim().trim_end_matches('/');
                let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
                Self::new(last.trim_end_matches(".git"))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Split a repository URL into `(owner, repo)`.
pub fn parse_owner_repo(url: &str) -> Option<(String, String)> {
    let url = url.trim().trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url);

    let path = if let Some((_, rest)) = url.split_once("://") {
        // drop the host
        rest.split_once('/').map(|(_, p)| p)?
    } else if let Some((_, rest)) = url.split_once(':') {
        // scp-like: git@github.com:owner/repo
        rest
    } else {
        url
    };

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    Some((owner.to_string(), repo.to_string()))
}

/// Opaque handle to the remote repository, handed to the delta collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }

    pub fn owner_repo(&self) -> Option<(String, String)> {
        parse_owner_repo(&self.0)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What a task does with its repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskMode {
    /// Commits and releases on the repository itself.
    News,
    /// Forks that are ahead of the parent.
    Forks,
}

impl TaskMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskMode::News => "news",
            TaskMode::Forks => "forks",
        }
    }
}

impl fmt::Display for TaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One schedulable unit of work, bound to a single repository.
///
/// Immutable once created; `order` is the position in the caller's input list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTask {
    key: RepoKey,
    name: String,
    endpoint: Endpoint,
    mode: TaskMode,
    order: usize,
}

impl RepoTask {
    /// Build a task whose key is derived from `url`.
    pub fn new(order: usize, name: impl Into<String>, url: impl Into<String>, mode: TaskMode) -> Self {
        let url = url.into();
        Self {
            key: RepoKey::from_url(&url),
            name: name.into(),
            endpoint: Endpoint::new(url),
            mode,
            order,
        }
    }

    /// Override the derived key.
    pub fn with_key(mut self, key: RepoKey) -> Self {
        self.key = key;
        self
    }

    pub fn key(&self) -> &RepoKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn mode(&self) -> TaskMode {
        self.mode
    }

    pub fn order(&self) -> usize {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::https("https://github.com/Owner/Repo", "owner/repo")]
    #[case::https_git_suffix("https://github.com/owner/repo.git", "owner/repo")]
    #[case::trailing_slash("https://github.com/owner/repo/", "owner/repo")]
    #[case::deep_path("https://github.com/owner/repo/tree/main", "owner/repo")]
    #[case::scp("git@github.com:owner/repo.git", "owner/repo")]
    #[case::bare("owner/repo", "owner/repo")]
    fn key_from_url(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(RepoKey::from_url(url).as_str(), expected);
    }

    #[test]
    fn key_falls_back_to_last_segment() {
        assert_eq!(RepoKey::from_url("https://example.com/").as_str(), "example.com");
        assert_eq!(RepoKey::from_url("Standalone").as_str(), "standalone");
    }

    #[test]
    fn task_derives_key_from_url() {
        let task = RepoTask::new(3, "Tokio", "https://github.com/tokio-rs/tokio", TaskMode::News);
        assert_eq!(task.key().as_str(), "tokio-rs/tokio");
        assert_eq!(task.order(), 3);
        assert_eq!(task.mode(), TaskMode::News);
        assert_eq!(
            task.endpoint().owner_repo(),
            Some(("tokio-rs".to_string(), "tokio".to_string()))
        );
    }

    #[test]
    fn mode_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&TaskMode::Forks).unwrap(), "\"forks\"");
        let mode: TaskMode = serde_json::from_str("\"news\"").unwrap();
        assert_eq!(mode, TaskMode::News);
    }
}
