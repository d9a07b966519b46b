//! MCP session over a child process
//!
//! Spawns the provider's configured command, wires its stdio into the rmcp
//! client, and performs the MCP initialize handshake.

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, CallToolResult, ListToolsResult, Tool};
use rmcp::service::RunningService;
use rmcp::transport::TokioChildProcess;
use rmcp::{RoleClient, ServiceExt};
use serde_json::{Map, Value};
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::core::{OrchestratorError, Result};

use super::config::McpServerConfig;
use super::session::ProviderSession;

/// A connected MCP server reached over a spawned subprocess
pub struct McpServer {
    /// Provider name, used for logging
    name: String,

    /// The underlying rmcp service (None once closed)
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer").field("name", &self.name).finish()
    }
}

impl McpServer {
    /// Spawn the provider process and complete the session handshake
    pub async fn connect(name: impl Into<String>, config: &McpServerConfig) -> Result<Self> {
        let name = name.into();

        tracing::info!(
            "[McpServer] Launching '{}': {} {:?}",
            name,
            config.command,
            config.args
        );

        let mut command = Command::new(&config.command);
        command.args(&config.args);
        if let Some(env) = &config.env {
            command.envs(env);
        }

        let transport = TokioChildProcess::new(command)?;

        // serve() drives the MCP initialize handshake before returning
        let service = ()
            .serve(transport)
            .await
            .map_err(OrchestratorError::connection)?;

        tracing::info!("[McpServer] Connected and initialized '{}'", name);

        Ok(Self {
            name,
            service: Mutex::new(Some(service)),
        })
    }

    /// Get the provider name
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl ProviderSession for McpServer {
    async fn list_tools(&self) -> Result<Vec<Tool>> {
        let guard = self.service.lock().await;
        let service = guard
            .as_ref()
            .ok_or_else(|| OrchestratorError::NotConnected(self.name.clone()))?;

        let result: ListToolsResult = service
            .list_tools(Default::default())
            .await
            .map_err(OrchestratorError::connection)?;

        tracing::debug!(
            "[McpServer] Got {} tools from '{}'",
            result.tools.len(),
            self.name
        );

        Ok(result.tools)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult> {
        let guard = self.service.lock().await;
        let service = guard
            .as_ref()
            .ok_or_else(|| OrchestratorError::NotConnected(self.name.clone()))?;

        tracing::info!("[McpServer] Calling tool '{}' on '{}'", name, self.name);

        let result = service
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_string().into(),
                arguments,
                task: None,
            })
            .await
            .map_err(OrchestratorError::connection)?;

        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        let service = self.service.lock().await.take();
        if let Some(service) = service {
            tracing::info!("[McpServer] Closing connection to '{}'", self.name);
            service.cancel().await.map_err(OrchestratorError::connection)?;
        }
        Ok(())
    }
}
