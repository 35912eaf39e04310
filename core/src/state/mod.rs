use crate::router::LinkEvents;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use tokio::sync::RwLock;
use tracing::debug;

const DEFAULT_EVENT_BUFFER: usize = 64;

/// Rolling snapshot of the live game world, fed by the link's receive
/// loop and read by tools. Keeps the latest state payload and a bounded
/// buffer of recent events; anything older is gone.
pub struct GameState {
    inner: RwLock<Inner>,
    event_buffer: usize,
}

#[derive(Default)]
struct Inner {
    last_state: Option<Value>,
    events: VecDeque<Value>,
}

impl GameState {
    pub fn new() -> Self {
        Self::with_event_buffer(DEFAULT_EVENT_BUFFER)
    }

    pub fn with_event_buffer(event_buffer: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            event_buffer: event_buffer.max(1),
        }
    }

    /// JSON view of the world: latest state payload plus up to
    /// `event_limit` of the most recent events, oldest first.
    pub async fn snapshot(&self, event_limit: usize) -> Value {
        let inner = self.inner.read().await;
        let skip = inner.events.len().saturating_sub(event_limit);
        let events: Vec<Value> = inner.events.iter().skip(skip).cloned().collect();
        json!({
            "state": inner.last_state.clone().unwrap_or(Value::Null),
            "recent_events": events,
        })
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkEvents for GameState {
    async fn on_state(&self, payload: Value) {
        self.inner.write().await.last_state = Some(payload);
    }

    async fn on_event(&self, payload: Value) {
        debug!(%payload, "game event");
        let mut inner = self.inner.write().await;
        while inner.events.len() >= self.event_buffer {
            inner.events.pop_front();
        }
        inner.events.push_back(payload);
    }
}
