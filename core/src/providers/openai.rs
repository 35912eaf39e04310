use crate::ChatRequest;
use crate::traits::{ChatResponse, Provider, ToolCallRequest, ToolSpec, Turn};
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCallRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAIToolCallRequest {
    id: String,
    r#type: &'static str,
    function: OpenAIFunctionRequest,
}

#[derive(Debug, Serialize)]
struct OpenAIFunctionRequest {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    r#type: &'static str,
    function: OpenAIToolFunction,
}

#[derive(Debug, Serialize)]
struct OpenAIToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCall {
    function: OpenAIFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunction {
    name: String,
    arguments: String,
}

/// Chat-completions client for any OpenAI-compatible backend. The core
/// conversation tags tool results by name and position only, so call ids
/// are synthesized here and never leave this adapter.
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn convert_turns(&self, turns: &[Turn]) -> Vec<OpenAIMessage> {
        let mut messages = Vec::with_capacity(turns.len());
        // Ids are synthesized per assistant turn; result turns pair back
        // by tool name in listed order, so a queue of (name, id) bridges
        // the two shapes.
        let mut pending: VecDeque<(String, String)> = VecDeque::new();

        for (idx, turn) in turns.iter().enumerate() {
            match (turn.role.as_str(), &turn.tool_calls) {
                ("assistant", Some(calls)) if !calls.is_empty() => {
                    pending.clear();
                    let tool_calls = calls
                        .iter()
                        .enumerate()
                        .map(|(i, call)| {
                            let id = format!("call_{}_{}", idx, i);
                            pending.push_back((call.name.clone(), id.clone()));
                            OpenAIToolCallRequest {
                                id,
                                r#type: "function",
                                function: OpenAIFunctionRequest {
                                    name: call.name.clone(),
                                    arguments: call.arguments.to_string(),
                                },
                            }
                        })
                        .collect();
                    messages.push(OpenAIMessage {
                        role: "assistant".to_string(),
                        content: Some(turn.content.clone()),
                        tool_calls: Some(tool_calls),
                        tool_call_id: None,
                    });
                }
                ("tool", _) => {
                    let name = turn.tool.clone().unwrap_or_default();
                    let id = pending
                        .iter()
                        .position(|(n, _)| *n == name)
                        .and_then(|i| pending.remove(i))
                        .map(|(_, id)| id)
                        .unwrap_or_else(|| format!("call_{}_orphan", idx));
                    messages.push(OpenAIMessage {
                        role: "tool".to_string(),
                        content: Some(turn.content.clone()),
                        tool_calls: None,
                        tool_call_id: Some(id),
                    });
                }
                _ => messages.push(OpenAIMessage {
                    role: turn.role.clone(),
                    content: Some(turn.content.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                }),
            }
        }

        messages
    }

    fn convert_tools(&self, tools: &[ToolSpec]) -> Vec<OpenAITool> {
        tools
            .iter()
            .map(|t| OpenAITool {
                r#type: "function",
                function: OpenAIToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        let openai_request = OpenAIRequest {
            model: self.model.clone(),
            messages: self.convert_turns(request.turns),
            tools: request.tools.map(|t| self.convert_tools(t)),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&openai_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("API error {}: {}", status, error_text));
        }

        let openai_response: OpenAIResponse = response.json().await?;

        let choice = openai_response
            .choices
            .first()
            .ok_or_else(|| anyhow::anyhow!("No choices in response"))?;

        let tool_calls = match &choice.message.tool_calls {
            Some(calls) => calls
                .iter()
                .map(|c| {
                    let arguments = serde_json::from_str(&c.function.arguments)
                        .with_context(|| {
                            format!("bad arguments for tool {}", c.function.name)
                        })?;
                    Ok(ToolCallRequest {
                        name: c.function.name.clone(),
                        arguments,
                    })
                })
                .collect::<anyhow::Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(ChatResponse {
            text: choice.message.content.clone(),
            tool_calls,
        })
    }
}
