//! Chat-completion wire types
//!
//! These follow the OpenAI chat-completions message format, which is the
//! shape the completion service consumes and produces.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One turn in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,

    /// Textual content; assistant messages carrying only tool calls have none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Tool-call requests (assistant messages only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Correlation id of the call this message answers (tool messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a plain assistant message
    ///
    /// `content` may be `None` in the service's reply shape.
    pub fn assistant(content: Option<String>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create an assistant message carrying tool-call requests
    pub fn assistant_with_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Create a tool-result message answering one tool call
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Get text content if present
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref()
    }
}

/// One tool invocation requested by the completion service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id; echoed back on the matching tool message
    pub id: String,

    /// Call type; the service currently emits "function"
    #[serde(rename = "type")]
    pub call_type: String,

    pub function: FunctionCall,
}

impl ToolCall {
    /// Create a function-type tool call
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// The function half of a tool call: name plus JSON-encoded arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,

    /// Argument payload as a JSON object, still in string form
    pub arguments: String,
}

/// A tool advertised to the completion service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    schema_type: String,
    function: FunctionSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionSchema {
    name: String,
    description: String,
    parameters: Value,
}

impl ToolSchema {
    /// Create a function-type tool schema
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            schema_type: "function".to_string(),
            function: FunctionSchema {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// The advertised tool name
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// The advertised description
    pub fn description(&self) -> &str {
        &self.function.description
    }
}

/// Why the completion service stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
    FunctionCall,
    /// Anything this client does not know about, raw signal preserved
    Other(String),
}

impl FinishReason {
    /// Parse the wire finish signal
    pub fn parse(signal: &str) -> Self {
        match signal {
            "stop" => FinishReason::Stop,
            "tool_calls" => FinishReason::ToolCalls,
            "length" => FinishReason::Length,
            "content_filter" => FinishReason::ContentFilter,
            "function_call" => FinishReason::FunctionCall,
            other => FinishReason::Other(other.to_string()),
        }
    }

    /// The wire form of this signal
    pub fn as_str(&self) -> &str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::FunctionCall => "function_call",
            FinishReason::Other(signal) => signal,
        }
    }
}

/// One completion-service response, reduced to what the loop consumes
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub finish: FinishReason,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}
