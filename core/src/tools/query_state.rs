use crate::state::GameState;
use crate::tools::extract_usize_arg_opt;
use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

const DEFAULT_EVENT_LIMIT: usize = 16;

pub struct QueryStateTool {
    state: Arc<GameState>,
}

impl QueryStateTool {
    pub fn new(state: Arc<GameState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for QueryStateTool {
    fn name(&self) -> &str {
        "query_state"
    }

    fn description(&self) -> &str {
        "Read the latest game state snapshot and recent events"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "events": {
                    "type": "integer",
                    "description": "Maximum number of recent events to include"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let event_limit = extract_usize_arg_opt(&args, "events", DEFAULT_EVENT_LIMIT);
        let snapshot = self.state.snapshot(event_limit).await;
        Ok(ToolResult::success(snapshot.to_string()))
    }
}
