//! Provider session contract
//!
//! Abstraction over a live connection to one tool provider. The production
//! implementation is [`crate::mcp::McpServer`] (an MCP session over a child
//! process); tests substitute scripted sessions.

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Tool};
use serde_json::{Map, Value};

use crate::core::Result;

/// A live, initialized session with one tool provider
#[async_trait]
pub trait ProviderSession: Send + Sync {
    /// Fetch the provider's current tool list
    ///
    /// Called at connect time and again on every conversation turn, so that
    /// providers may add or remove tools between turns.
    async fn list_tools(&self) -> Result<Vec<Tool>>;

    /// Invoke a tool on this provider
    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult>;

    /// Release the session and its underlying transport
    async fn close(&self) -> Result<()>;
}
