//! Display serializer - 出力の直列化
//!
//! - renderer を持つのは blocking pool 上の consumer 1 つだけ
//! - ワーカーはメッセージを送るだけなので、要約同士が端末上で混ざることはない

use std::collections::{BTreeMap, BTreeSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::RenderStats;
use crate::ports::{DisplayEvent, DisplayPayload, Renderer};

/// How queued events are ordered on output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPolicy {
    /// Render in enqueue order.
    #[default]
    Fifo,
    /// Render in task input order, holding events behind unsettled earlier tasks.
    InputOrder,
}

enum Message {
    Event(DisplayEvent),
    /// The task with this order is terminal and will emit nothing more.
    Settled(usize),
    Stop,
}

/// Producer side, cloned into every worker.
#[derive(Clone)]
pub struct DisplayHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl DisplayHandle {
    /// Queue an event. Returns false when the serializer has already stopped.
    pub fn enqueue(&self, event: DisplayEvent) -> bool {
        self.tx.send(Message::Event(event)).is_ok()
    }

    pub fn settle(&self, order: usize) {
        // ignore send error: the consumer may already be gone
        let _ = self.tx.send(Message::Settled(order));
    }
}

#[derive(Default)]
struct Counters {
    rendered: AtomicUsize,
    failed: AtomicUsize,
}

impl Counters {
    fn stats(&self) -> RenderStats {
        RenderStats {
            rendered: self.rendered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

pub struct DisplaySerializer {
    handle: DisplayHandle,
    consumer: JoinHandle<()>,
    counters: Arc<Counters>,
}

impl DisplaySerializer {
    /// Start the consumer. `expected_orders` are the orders of every task in
    /// the run; only `InputOrder` uses them.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        renderer: Arc<dyn Renderer>,
        policy: OrderPolicy,
        expected_orders: impl IntoIterator<Item = usize>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let consumer = Consumer {
            renderer,
            policy,
            unsettled: expected_orders.into_iter().collect(),
            held: BTreeMap::new(),
            counters: Arc::clone(&counters),
        };
        let consumer = tokio::task::spawn_blocking(move || consumer.run(rx));

        Self {
            handle: DisplayHandle { tx },
            consumer,
            counters,
        }
    }

    pub fn handle(&self) -> DisplayHandle {
        self.handle.clone()
    }

    /// Render everything already queued, then stop the consumer.
    ///
    /// Consumes the serializer, so it can only happen once. If the consumer
    /// does not finish within `timeout` the counts so far are returned and
    /// the remaining output is abandoned.
    pub async fn drain_and_stop(self, timeout: Duration) -> RenderStats {
        let _ = self.handle.tx.send(Message::Stop);
        match tokio::time::timeout(timeout, self.consumer).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "display consumer exited abnormally"),
            Err(_) => tracing::warn!(?timeout, "display did not drain in time"),
        }
        self.counters.stats()
    }
}

struct Consumer {
    renderer: Arc<dyn Renderer>,
    policy: OrderPolicy,
    unsettled: BTreeSet<usize>,
    held: BTreeMap<usize, Vec<DisplayPayload>>,
    counters: Arc<Counters>,
}

impl Consumer {
    fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        while let Some(message) = rx.blocking_recv() {
            match message {
                Message::Event(event) => self.on_event(event),
                Message::Settled(order) => {
                    self.unsettled.remove(&order);
                    self.release_ready();
                }
                Message::Stop => break,
            }
        }

        // 残りは順番どおりに出す
        for payload in std::mem::take(&mut self.held).into_values().flatten() {
            self.render(&payload);
        }
    }

    fn on_event(&mut self, event: DisplayEvent) {
        match self.policy {
            OrderPolicy::Fifo => self.render(&event.payload),
            OrderPolicy::InputOrder => {
                if self.blocked(event.order) {
                    self.held.entry(event.order).or_default().push(event.payload);
                } else {
                    self.render(&event.payload);
                }
            }
        }
    }

    /// Some earlier task has not settled yet.
    fn blocked(&self, order: usize) -> bool {
        self.unsettled.range(..order).next().is_some()
    }

    fn release_ready(&mut self) {
        while let Some(&order) = self.held.keys().next() {
            if self.blocked(order) {
                break;
            }
            for payload in self.held.remove(&order).unwrap_or_default() {
                self.render(&payload);
            }
        }
    }

    fn render(&self, payload: &DisplayPayload) {
        let result = catch_unwind(AssertUnwindSafe(|| self.renderer.render(payload)));
        match result {
            Ok(Ok(())) => {
                self.counters.rendered.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(repo = payload.repo_name(), error = %e, "render failed");
            }
            Err(_) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(repo = payload.repo_name(), "renderer panicked");
            }
        }
    }
}
