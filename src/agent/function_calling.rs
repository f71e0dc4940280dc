use std::sync::Arc;

use serde_json::Value;

use super::tools::Tool;
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, LlmService, ToolCall, ToolDefinition};

/// Answers one question by letting the model call tools until it replies
/// in plain text.
pub struct FunctionCallingAgent {
    llm: LlmService,
    tools: Vec<Arc<dyn Tool>>,
    max_tool_calls: usize,
}

impl FunctionCallingAgent {
    pub fn new(llm: LlmService, tools: Vec<Arc<dyn Tool>>, max_tool_calls: usize) -> Self {
        Self {
            llm,
            tools,
            max_tool_calls: max_tool_calls.max(1),
        }
    }

    pub async fn query(&self, question: &str) -> Result<String, ApiError> {
        let definitions: Vec<ToolDefinition> = self.tools.iter().map(|t| t.definition()).collect();
        let mut messages = vec![ChatMessage::user(question)];

        for round in 0..self.max_tool_calls {
            let response = self.llm.chat(messages.clone(), definitions.clone()).await?;
            if response.tool_calls.is_empty() {
                return Ok(response.content);
            }

            tracing::debug!(
                "Round {}: model requested {} tool call(s)",
                round + 1,
                response.tool_calls.len()
            );
            let calls = response.tool_calls.clone();
            messages.push(ChatMessage::assistant_tool_calls(
                response.content,
                response.tool_calls,
            ));
            for call in &calls {
                let output = self.dispatch(call).await;
                messages.push(ChatMessage::tool_result(call.id.clone(), output));
            }
        }

        tracing::warn!(
            "Tool call limit ({}) reached, asking for a final answer",
            self.max_tool_calls
        );
        let response = self.llm.chat(messages, Vec::new()).await?;
        Ok(response.content)
    }

    /// Run one tool call. Failures are reported back to the model as text.
    async fn dispatch(&self, call: &ToolCall) -> String {
        let Some(tool) = self
            .tools
            .iter()
            .find(|tool| tool.definition().name == call.name)
        else {
            return format!("Error: unknown tool '{}'", call.name);
        };

        let arguments: Value = match serde_json::from_str(&call.arguments) {
            Ok(value) => value,
            Err(err) => return format!("Error: invalid arguments for '{}': {}", call.name, err),
        };

        match tool.call(arguments).await {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!("Tool {} failed: {}", call.name, err);
                format!("Error: {}", err)
            }
        }
    }
}
