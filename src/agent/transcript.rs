//! Helpers for callers consuming a finished turn

use crate::llm::{ChatMessage, Role};

/// Text of the most recent assistant message, if any
pub fn latest_assistant_text(messages: &[ChatMessage]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .and_then(|m| m.text())
}

/// Names of every tool invoked across the sequence, in request order
pub fn invoked_tool_names(messages: &[ChatMessage]) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .flat_map(|m| m.tool_calls.iter())
        .map(|call| call.function.name.clone())
        .collect()
}
