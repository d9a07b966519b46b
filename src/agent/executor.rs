//! Tool-call dispatch
//!
//! Executes the tool calls requested by the completion service against the
//! owning provider sessions and converts each result into a tool message.

use std::sync::Arc;

use rmcp::model::RawContent;
use serde_json::{Map, Value};

use crate::core::{OrchestratorError, Result};
use crate::llm::{ChatMessage, ToolCall};
use crate::mcp::McpServerManager;

/// Executes tool-call requests against the connected providers
pub struct ToolDispatcher {
    manager: Arc<McpServerManager>,
}

impl ToolDispatcher {
    /// Create a dispatcher over a connection manager
    pub fn new(manager: Arc<McpServerManager>) -> Self {
        Self { manager }
    }

    /// Execute one tool call and build its tool message
    ///
    /// The message content is the original argument object merged with the
    /// tool name mapped to the collected text parts, so the model sees the
    /// result next to the arguments that produced it.
    pub async fn execute_call(&self, call: &ToolCall) -> Result<ChatMessage> {
        let tool_name = &call.function.name;

        let provider = self
            .manager
            .router()
            .resolve(tool_name)
            .await
            .ok_or_else(|| OrchestratorError::UnroutableTool(tool_name.clone()))?;

        let session = self
            .manager
            .session(&provider)
            .await
            .ok_or_else(|| OrchestratorError::NotConnected(provider.clone()))?;

        let arguments: Map<String, Value> = serde_json::from_str(&call.function.arguments)?;

        tracing::info!(
            "[ToolDispatcher] Executing '{}' on provider '{}'",
            tool_name,
            provider
        );

        let result = session.call_tool(tool_name, Some(arguments.clone())).await?;

        if result.is_error.unwrap_or(false) {
            return Err(OrchestratorError::ToolExecution {
                name: tool_name.clone(),
                detail: error_detail(&result),
            });
        }

        let texts = collect_text_parts(tool_name, &result)?;

        let mut content = arguments;
        content.insert(tool_name.clone(), serde_json::to_value(&texts)?);

        Ok(ChatMessage::tool(
            call.id.clone(),
            serde_json::to_string(&Value::Object(content))?,
        ))
    }

    /// Execute many tool calls concurrently
    ///
    /// Results come back in submission order regardless of completion order.
    /// All-or-nothing: every call runs to completion, then the first failure
    /// (in submission order) fails the whole batch and no partial result
    /// messages are returned.
    pub async fn execute_many(&self, calls: &[ToolCall]) -> Result<Vec<ChatMessage>> {
        let outcomes =
            futures::future::join_all(calls.iter().map(|call| self.execute_call(call))).await;

        let mut messages = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            messages.push(outcome?);
        }
        Ok(messages)
    }
}

/// Pull whatever textual detail an error result carries
fn error_detail(result: &rmcp::model::CallToolResult) -> String {
    let detail: Vec<&str> = result
        .content
        .iter()
        .filter_map(|part| match &part.raw {
            RawContent::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect();

    if detail.is_empty() {
        "provider reported an error".to_string()
    } else {
        detail.join("\n")
    }
}

/// Extract the textual parts of a tool result
///
/// Only text content is supported: image and embedded-resource parts fail
/// with `UnsupportedContentKind`, anything unrecognized with
/// `MalformedToolResult`.
fn collect_text_parts(
    tool_name: &str,
    result: &rmcp::model::CallToolResult,
) -> Result<Vec<String>> {
    let mut texts = Vec::new();

    for part in &result.content {
        match &part.raw {
            RawContent::Text(text) => texts.push(text.text.clone()),
            RawContent::Image(_) => {
                return Err(OrchestratorError::UnsupportedContentKind("image".into()));
            }
            RawContent::Resource(_) => {
                return Err(OrchestratorError::UnsupportedContentKind("resource".into()));
            }
            _ => {
                return Err(OrchestratorError::MalformedToolResult(format!(
                    "unrecognized content kind in result for tool '{tool_name}'"
                )));
            }
        }
    }

    Ok(texts)
}
