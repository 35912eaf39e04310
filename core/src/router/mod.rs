use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Inbound frames classified by their `type` field. A frame that matches
/// none of these shapes is dropped at the router and never propagated.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    State(Value),
    Event(Value),
    CommandResult {
        success: bool,
        #[serde(default)]
        message: String,
    },
}

/// Handlers the owning application supplies for recognized frames.
/// Dispatch is sequential within the receive loop, so a slow handler
/// delays the next inbound message.
#[async_trait]
pub trait LinkEvents: Send + Sync {
    async fn on_state(&self, payload: Value);
    async fn on_event(&self, payload: Value);
}

#[derive(Clone)]
pub struct MessageRouter {
    handler: Arc<dyn LinkEvents>,
}

impl MessageRouter {
    pub fn new(handler: Arc<dyn LinkEvents>) -> Self {
        Self { handler }
    }

    /// Classify one decoded frame and invoke the matching handler.
    /// Command results are only logged; the wire format carries nothing
    /// to correlate them with the command that caused them.
    pub async fn dispatch(&self, frame: Value) {
        let kind = frame
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        match serde_json::from_value::<Inbound>(frame) {
            Ok(Inbound::State(payload)) => self.handler.on_state(payload).await,
            Ok(Inbound::Event(payload)) => self.handler.on_event(payload).await,
            Ok(Inbound::CommandResult { success, message }) => {
                if success {
                    info!(%message, "command acknowledged");
                } else {
                    warn!(%message, "command rejected");
                }
            }
            Err(_) => warn!(kind = %kind, "dropping unrecognized frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEvents {
        states: AtomicUsize,
        events: AtomicUsize,
    }

    impl CountingEvents {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                states: AtomicUsize::new(0),
                events: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LinkEvents for CountingEvents {
        async fn on_state(&self, _payload: Value) {
            self.states.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_event(&self, _payload: Value) {
            self.events.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn classifies_known_frames() {
        let state = serde_json::from_value::<Inbound>(json!({"type": "state", "hp": 20})).unwrap();
        match state {
            Inbound::State(payload) => assert_eq!(payload["hp"], 20),
            other => panic!("expected state, got {:?}", other),
        }

        let result = serde_json::from_value::<Inbound>(
            json!({"type": "command_result", "success": false, "message": "no such player"}),
        )
        .unwrap();
        assert_eq!(
            result,
            Inbound::CommandResult {
                success: false,
                message: "no such player".to_string()
            }
        );
    }

    #[test]
    fn rejects_unknown_and_missing_type() {
        assert!(serde_json::from_value::<Inbound>(json!({"type": "chat", "text": "hi"})).is_err());
        assert!(serde_json::from_value::<Inbound>(json!({"text": "hi"})).is_err());
        assert!(serde_json::from_value::<Inbound>(json!({"type": 7})).is_err());
    }

    #[tokio::test]
    async fn only_recognized_frames_reach_handlers() {
        let handler = CountingEvents::new();
        let router = MessageRouter::new(handler.clone());

        router.dispatch(json!({"type": "state", "hp": 20})).await;
        router.dispatch(json!({"type": "event", "kind": "death"})).await;
        router
            .dispatch(json!({"type": "command_result", "success": true, "message": "ok"}))
            .await;
        router.dispatch(json!({"type": "leaderboard"})).await;
        router.dispatch(json!({"hp": 20})).await;
        router.dispatch(json!({"type": "state", "hp": 19})).await;

        assert_eq!(handler.states.load(Ordering::SeqCst), 2);
        assert_eq!(handler.events.load(Ordering::SeqCst), 1);
    }
}
