use crate::agent::{Conversation, ToolRegistry};
use crate::traits::{ChatRequest, Provider, ToolResult, Turn};
use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_MAX_ROUNDS: usize = 20;

/// Failures surfaced to the caller of [`AgentLoop::run`]. Link transport
/// and parse failures never appear here; they only affect link
/// availability.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("unknown tool requested: {0}")]
    UnknownTool(String),
    #[error("no final response after {0} rounds")]
    RoundLimit(usize),
}

/// Drives one goal at a time to completion: ask the decision-maker, run
/// any requested tools in the order listed, feed the results back, and
/// repeat until a tool-call-free response arrives or the round cap trips.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    conversation: Conversation,
    max_rounds: usize,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<ToolRegistry>,
        system_directive: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            registry,
            conversation: Conversation::new(system_directive),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub async fn run(&mut self, goal: &str) -> Result<String> {
        self.conversation.push(Turn::user(goal));

        for round in 0..self.max_rounds {
            let tools = self.registry.specs();
            let request = ChatRequest {
                turns: self.conversation.turns(),
                tools: if tools.is_empty() { None } else { Some(&tools) },
            };
            let response = self.provider.chat(request).await?;

            let text = response.text.clone().unwrap_or_default();
            if !response.has_tool_calls() {
                self.conversation.push(Turn::assistant(text.clone()));
                return Ok(text);
            }

            debug!(round, calls = response.tool_calls.len(), "processing tool calls");
            self.conversation
                .push(Turn::assistant_with_tool_calls(text, response.tool_calls.clone()));

            // Fail closed before running anything: an unregistered name
            // aborts the whole run with no further turns appended.
            let mut resolved = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                let tool = self
                    .registry
                    .lookup(&call.name)
                    .ok_or_else(|| AgentError::UnknownTool(call.name.clone()))?;
                resolved.push((tool, call));
            }

            for (tool, call) in resolved {
                let result = match tool.execute(call.arguments.clone()).await {
                    Ok(result) => result,
                    Err(err) => {
                        warn!(tool = %call.name, %err, "tool invocation failed");
                        ToolResult::error(format!("{} failed: {}", call.name, err))
                    }
                };
                let content = serde_json::to_string(&result).unwrap_or_default();
                self.conversation
                    .push(Turn::tool_result(call.name.clone(), content));
            }
        }

        Err(AgentError::RoundLimit(self.max_rounds).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ChatResponse, Tool, ToolCallRequest};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedProvider {
        responses: Mutex<VecDeque<ChatResponse>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<ChatResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        async fn chat(&self, _request: ChatRequest<'_>) -> Result<ChatResponse> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }
    }

    struct NamedTool(&'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "Echo the tool name"
        }

        fn parameters(&self) -> serde_json::Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _args: serde_json::Value) -> Result<ToolResult> {
            Ok(ToolResult::success(self.0))
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters(&self) -> serde_json::Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _args: serde_json::Value) -> Result<ToolResult> {
            Err(anyhow::anyhow!("boom"))
        }
    }

    fn call(name: &str) -> ToolCallRequest {
        ToolCallRequest {
            name: name.to_string(),
            arguments: json!({}),
        }
    }

    fn tool_round(calls: Vec<ToolCallRequest>) -> ChatResponse {
        ChatResponse {
            text: None,
            tool_calls: calls,
        }
    }

    fn final_text(text: &str) -> ChatResponse {
        ChatResponse {
            text: Some(text.to_string()),
            tool_calls: vec![],
        }
    }

    fn roles(agent: &AgentLoop) -> Vec<String> {
        agent
            .conversation()
            .turns()
            .iter()
            .map(|t| t.role.clone())
            .collect()
    }

    #[tokio::test]
    async fn one_tool_round_trip_is_five_turns() {
        let provider = ScriptedProvider::new(vec![
            tool_round(vec![call("probe")]),
            final_text("all clear"),
        ]);
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(NamedTool("probe")));

        let mut agent = AgentLoop::new(provider, registry, "directive");
        let answer = agent.run("scout the area").await.unwrap();

        assert_eq!(answer, "all clear");
        assert_eq!(roles(&agent), ["system", "user", "assistant", "tool", "assistant"]);
        assert!(agent.conversation().turns()[2].has_tool_calls());
        assert_eq!(agent.conversation().turns()[3].tool.as_deref(), Some("probe"));
    }

    #[tokio::test]
    async fn unknown_tool_fails_the_whole_run() {
        let provider = ScriptedProvider::new(vec![tool_round(vec![call("missing")])]);
        let registry = Arc::new(ToolRegistry::new());

        let mut agent = AgentLoop::new(provider, registry, "directive");
        let err = agent.run("goal").await.unwrap_err();

        match err.downcast_ref::<AgentError>() {
            Some(AgentError::UnknownTool(name)) => assert_eq!(name, "missing"),
            other => panic!("expected UnknownTool, got {:?}", other),
        }
        // Nothing is appended after the offending assistant turn.
        assert_eq!(roles(&agent), ["system", "user", "assistant"]);
    }

    #[tokio::test]
    async fn failing_tool_becomes_an_error_result_turn() {
        let provider = ScriptedProvider::new(vec![
            tool_round(vec![call("broken")]),
            final_text("recovered"),
        ]);
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(BrokenTool));

        let mut agent = AgentLoop::new(provider, registry, "directive");
        let answer = agent.run("goal").await.unwrap();

        assert_eq!(answer, "recovered");
        let result_turn = &agent.conversation().turns()[3];
        assert_eq!(result_turn.tool.as_deref(), Some("broken"));
        let result: ToolResult = serde_json::from_str(&result_turn.content).unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn results_follow_the_requested_order() {
        let provider = ScriptedProvider::new(vec![
            tool_round(vec![call("first"), call("second")]),
            final_text("done"),
        ]);
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(NamedTool("second")));
        registry.register(Arc::new(NamedTool("first")));

        let mut agent = AgentLoop::new(provider, registry, "directive");
        agent.run("goal").await.unwrap();

        let turns = agent.conversation().turns();
        assert_eq!(turns[3].tool.as_deref(), Some("first"));
        assert_eq!(turns[4].tool.as_deref(), Some("second"));
        assert_eq!(turns[5].role, "assistant");
    }

    #[tokio::test]
    async fn round_cap_bounds_the_loop() {
        let provider = ScriptedProvider::new(vec![
            tool_round(vec![call("probe")]),
            tool_round(vec![call("probe")]),
            tool_round(vec![call("probe")]),
        ]);
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(NamedTool("probe")));

        let mut agent = AgentLoop::new(provider, registry, "directive").with_max_rounds(2);
        let err = agent.run("goal").await.unwrap_err();

        match err.downcast_ref::<AgentError>() {
            Some(AgentError::RoundLimit(rounds)) => assert_eq!(*rounds, 2),
            other => panic!("expected RoundLimit, got {:?}", other),
        }
    }
}
