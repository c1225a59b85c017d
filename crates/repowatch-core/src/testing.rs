//! Test doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{
    ChangeKind, ChangeRecord, CostInfo, Cursors, Delta, RepoKey, RepoTask, TaskError,
};
use crate::ports::{DeltaSource, DisplayPayload, Renderer, Summarizer, Summary};

/// What the scripted source does for a key.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// One new commit `<key>-head`, unless the `main` cursor already points at it.
    Fresh,
    /// Nothing new, but a marker to merge.
    Unchanged,
    Fail(TaskError),
    Panic,
    /// Never completes.
    Hang,
    /// `n` transient failures, then `Fresh`.
    FlakyThenFresh(usize),
}

pub struct ScriptedSource {
    behaviors: HashMap<RepoKey, Behavior>,
    delays: HashMap<RepoKey, Duration>,
    calls: AtomicUsize,
    calls_by_key: Mutex<HashMap<RepoKey, usize>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            delays: HashMap::new(),
            calls: AtomicUsize::new(0),
            calls_by_key: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_behavior(mut self, key: RepoKey, behavior: Behavior) -> Self {
        self.behaviors.insert(key, behavior);
        self
    }

    pub fn with_delay(mut self, key: RepoKey, delay: Duration) -> Self {
        self.delays.insert(key, delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fresh(task: &RepoTask, cursors: &Cursors) -> Delta {
        let head = format!("{}-head", task.key());
        if cursors.get("main") == Some(&head) {
            return Delta::unchanged().with_marker("main", head);
        }
        let change = ChangeRecord::new(head.clone(), ChangeKind::Commit, "main", "update");
        Delta::new(vec![change], Cursors::new()).with_marker("main", head)
    }
}

#[async_trait]
impl DeltaSource for ScriptedSource {
    async fn fetch_delta(&self, task: &RepoTask, cursors: &Cursors) -> Result<Delta, TaskError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let call = {
            let mut by_key = self.calls_by_key.lock().unwrap_or_else(PoisonError::into_inner);
            let count = by_key.entry(task.key().clone()).or_insert(0);
            *count += 1;
            *count
        };

        if let Some(delay) = self.delays.get(task.key()) {
            tokio::time::sleep(*delay).await;
        }

        match self.behaviors.get(task.key()).cloned().unwrap_or(Behavior::Fresh) {
            Behavior::Fresh => Ok(Self::fresh(task, cursors)),
            Behavior::Unchanged => Ok(Delta::unchanged().with_marker("main", "seen")),
            Behavior::Fail(e) => Err(e),
            Behavior::Panic => panic!("scripted panic for {}", task.key()),
            Behavior::Hang => std::future::pending().await,
            Behavior::FlakyThenFresh(n) if call <= n => {
                Err(TaskError::TransientNetwork(format!("reset #{call}")))
            }
            Behavior::FlakyThenFresh(_) => Ok(Self::fresh(task, cursors)),
        }
    }
}

/// Returns `"<text> for <key>"` with an estimated cost.
pub struct StaticSummarizer {
    text: String,
    failing: HashSet<RepoKey>,
    calls: AtomicUsize,
}

impl StaticSummarizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_for(mut self, key: RepoKey) -> Self {
        self.failing.insert(key);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for StaticSummarizer {
    async fn summarize(&self, task: &RepoTask, delta: &Delta) -> Result<Summary, TaskError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(task.key()) {
            return Err(TaskError::Summarization("provider returned 500".into()));
        }
        let text = format!("{} for {}", self.text, task.key());
        let cost = CostInfo::estimated("static", delta.changes().len() * 400, text.len());
        Ok(Summary::new(text).with_cost(cost))
    }
}

/// Records what was rendered and notices overlapping `render` calls.
pub struct RecordingRenderer {
    rendered: Mutex<Vec<String>>,
    in_render: AtomicBool,
    overlaps: AtomicUsize,
    delay: Duration,
    failing: HashSet<String>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self {
            rendered: Mutex::new(Vec::new()),
            in_render: AtomicBool::new(false),
            overlaps: AtomicUsize::new(0),
            delay: Duration::ZERO,
            failing: HashSet::new(),
        }
    }

    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_for(mut self, repo_name: &str) -> Self {
        self.failing.insert(repo_name.to_string());
        self
    }

    /// Summary payloads as the repo name, no-update payloads as `"no updates: <name>"`.
    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, payload: &DisplayPayload) -> io::Result<()> {
        if self.in_render.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let result = if self.failing.contains(payload.repo_name()) {
            Err(io::Error::other("broken pipe"))
        } else {
            let line = match payload {
                DisplayPayload::Summary { repo_name, .. } => repo_name.clone(),
                DisplayPayload::NoUpdates { repo_name } => format!("no updates: {repo_name}"),
            };
            self.rendered
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(line);
            Ok(())
        };

        self.in_render.store(false, Ordering::SeqCst);
        result
    }
}
