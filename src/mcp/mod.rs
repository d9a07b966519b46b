//! MCP (Model Context Protocol) tool-provider support
//!
//! This module owns everything between the client and the external
//! tool-provider processes:
//!
//! - `McpServerConfig` / `McpClientConfig`: launch descriptors for each provider
//! - `ProviderSession`: the session contract a connected provider satisfies
//! - `McpServer`: a session over a child process speaking MCP on stdio
//! - `ToolRouter`: the tool name → provider name routing table
//! - `McpServerManager`: connection lifecycle and the flattened tool schemas
//!
//! # Tool routing
//!
//! Tools are registered under their advertised names. If two providers
//! advertise the same tool name, the provider connected last wins the route;
//! the collision is logged as a warning.

mod config;
mod manager;
mod router;
mod server;
mod session;

// Public exports
pub use config::{McpClientConfig, McpServerConfig};
pub use manager::McpServerManager;
pub use router::ToolRouter;
pub use server::McpServer;
pub use session::ProviderSession;
