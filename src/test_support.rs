//! Shared test doubles
//!
//! Scripted provider sessions and a scripted completion client, plus
//! constructors for protocol-shaped tool descriptors and results.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Tool};
use serde_json::{json, Map, Value};

use crate::core::{OrchestratorError, Result};
use crate::llm::{ChatMessage, CompletionClient, CompletionOutcome, RequestConfig, ToolSchema};
use crate::mcp::ProviderSession;

/// Build a tool descriptor with an empty object input schema
pub(crate) fn tool(name: &str, description: &str) -> Tool {
    serde_json::from_value(json!({
        "name": name,
        "description": description,
        "inputSchema": {"type": "object"}
    }))
    .expect("valid tool descriptor")
}

/// A successful tool result with one text part
pub(crate) fn text_result(text: &str) -> CallToolResult {
    serde_json::from_value(json!({
        "content": [{"type": "text", "text": text}],
        "isError": false
    }))
    .expect("valid tool result")
}

/// A provider-reported error result with one text part
pub(crate) fn error_result(text: &str) -> CallToolResult {
    serde_json::from_value(json!({
        "content": [{"type": "text", "text": text}],
        "isError": true
    }))
    .expect("valid tool result")
}

/// A successful result carrying an image part
pub(crate) fn image_result() -> CallToolResult {
    serde_json::from_value(json!({
        "content": [{"type": "image", "data": "aGk=", "mimeType": "image/png"}],
        "isError": false
    }))
    .expect("valid tool result")
}

/// A successful result carrying an audio part (unrecognized by the client)
pub(crate) fn audio_result() -> CallToolResult {
    serde_json::from_value(json!({
        "content": [{"type": "audio", "data": "aGk=", "mimeType": "audio/wav"}],
        "isError": false
    }))
    .expect("valid tool result")
}

/// A provider session that serves scripted tools and results
pub(crate) struct ScriptedSession {
    name: String,
    tools: Vec<Tool>,
    outcomes: HashMap<String, CallToolResult>,
    delays_ms: HashMap<String, u64>,
    close_log: Option<Arc<Mutex<Vec<String>>>>,
    fail_close: bool,
}

impl ScriptedSession {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tools: Vec::new(),
            outcomes: HashMap::new(),
            delays_ms: HashMap::new(),
            close_log: None,
            fail_close: false,
        }
    }

    pub(crate) fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    pub(crate) fn with_outcome(mut self, tool_name: &str, outcome: CallToolResult) -> Self {
        self.outcomes.insert(tool_name.to_string(), outcome);
        self
    }

    /// Delay a tool's result to simulate out-of-order completion
    pub(crate) fn with_delay(mut self, tool_name: &str, delay_ms: u64) -> Self {
        self.delays_ms.insert(tool_name.to_string(), delay_ms);
        self
    }

    /// Record this session's name into a shared log when closed
    pub(crate) fn with_close_log(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.close_log = Some(log);
        self
    }

    /// Make `close` fail after recording itself
    pub(crate) fn with_failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

#[async_trait]
impl ProviderSession for ScriptedSession {
    async fn list_tools(&self) -> Result<Vec<Tool>> {
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        _arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult> {
        if let Some(delay_ms) = self.delays_ms.get(name) {
            tokio::time::sleep(std::time::Duration::from_millis(*delay_ms)).await;
        }
        self.outcomes.get(name).cloned().ok_or_else(|| {
            OrchestratorError::Connection(format!(
                "no scripted outcome for tool '{name}' on '{}'",
                self.name
            ))
        })
    }

    async fn close(&self) -> Result<()> {
        if let Some(log) = &self.close_log {
            log.lock().unwrap().push(self.name.clone());
        }
        if self.fail_close {
            return Err(OrchestratorError::Connection(format!(
                "scripted close failure on '{}'",
                self.name
            )));
        }
        Ok(())
    }
}

/// A completion client that replays scripted outcomes in order
pub(crate) struct MockCompletionClient {
    replies: Mutex<VecDeque<CompletionOutcome>>,
}

impl MockCompletionClient {
    pub(crate) fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn with_reply(self, outcome: CompletionOutcome) -> Self {
        self.replies.lock().unwrap().push_back(outcome);
        self
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolSchema],
        _config: &RequestConfig,
    ) -> Result<CompletionOutcome> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| OrchestratorError::CompletionService("no scripted reply".into()))
    }
}
