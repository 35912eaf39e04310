use crate::link::MessageLink;
use crate::tools::{extract_string_arg, extract_string_arg_opt};
use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct SendCommandTool {
    link: Arc<MessageLink>,
}

impl SendCommandTool {
    pub fn new(link: Arc<MessageLink>) -> Self {
        Self { link }
    }
}

#[async_trait]
impl Tool for SendCommandTool {
    fn name(&self) -> &str {
        "send_command"
    }

    fn description(&self) -> &str {
        "Send a command to the game process over the control link"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Command name, e.g. teleport"
                },
                "parameters": {
                    "type": "object",
                    "description": "Command parameters"
                },
                "reason": {
                    "type": "string",
                    "description": "Why the command is being issued"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let command = extract_string_arg(&args, "command")?;
        let parameters = args.get("parameters").cloned().unwrap_or_else(|| json!({}));
        let reason = extract_string_arg_opt(&args, "reason", "");

        if self.link.send(&command, parameters, &reason).await {
            Ok(ToolResult::success(format!("{} sent", command)))
        } else {
            Ok(ToolResult::error(format!(
                "{} dropped: link not connected or write failed",
                command
            )))
        }
    }
}
