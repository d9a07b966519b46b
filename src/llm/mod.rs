//! Chat-completion service support
//!
//! Wire types for an OpenAI-compatible `/chat/completions` endpoint, the
//! per-request configuration (with unset / cleared / value knobs), and the
//! `CompletionClient` seam the conversation loop talks through.

mod client;
mod request;
pub mod types;

pub use client::{CompletionClient, OpenAiClient};
pub use request::{RequestConfig, Setting};
pub use types::{
    ChatMessage, CompletionOutcome, FinishReason, FunctionCall, Role, ToolCall, ToolSchema,
};
