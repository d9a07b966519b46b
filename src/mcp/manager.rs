//! Tool-provider connection manager
//!
//! Owns the live-session table, the connection order (used for teardown),
//! and the routing table. All session spawning and releasing flows through
//! this type.

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::model::Tool;
use tokio::sync::RwLock;

use crate::core::{OrchestratorError, Result};
use crate::llm::ToolSchema;

use super::config::McpClientConfig;
use super::router::ToolRouter;
use super::server::McpServer;
use super::session::ProviderSession;

/// Manages connections to the configured tool providers
pub struct McpServerManager {
    /// Immutable descriptor store loaded at startup
    descriptors: McpClientConfig,

    /// Live sessions keyed by provider name
    sessions: RwLock<HashMap<String, Arc<dyn ProviderSession>>>,

    /// Provider names in acquisition order; released in reverse on shutdown
    connected: RwLock<Vec<String>>,

    /// Shared tool → provider routing table
    router: ToolRouter,
}

impl McpServerManager {
    /// Create a manager over a descriptor store
    pub fn new(descriptors: McpClientConfig) -> Self {
        Self {
            descriptors,
            sessions: RwLock::new(HashMap::new()),
            connected: RwLock::new(Vec::new()),
            router: ToolRouter::new(),
        }
    }

    /// Connect to a provider by its configured name
    ///
    /// Fails with `UnknownProvider` if the name is not in the descriptor
    /// store and `ProviderDisabled` if its enabled flag is false. Connecting
    /// to an already-connected provider is a no-op.
    pub async fn connect(&self, name: &str) -> Result<()> {
        let descriptor = self
            .descriptors
            .get(name)
            .ok_or_else(|| OrchestratorError::UnknownProvider(name.to_string()))?;

        if !descriptor.enabled {
            return Err(OrchestratorError::ProviderDisabled(name.to_string()));
        }

        if self.sessions.read().await.contains_key(name) {
            tracing::debug!("[McpServerManager] Already connected to '{}'", name);
            return Ok(());
        }

        let session = McpServer::connect(name, descriptor).await?;
        self.install(name, Arc::new(session)).await
    }

    /// Connect to several providers in order
    ///
    /// The first failure aborts the remaining connections and propagates.
    pub async fn connect_many<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        for name in names {
            self.connect(name.as_ref()).await?;
        }
        Ok(())
    }

    /// Register an externally constructed session under a provider name
    ///
    /// Runs the same post-connect bookkeeping as `connect` (tool listing and
    /// route registration). A no-op if the name already has a session.
    pub async fn attach_session(
        &self,
        name: &str,
        session: Arc<dyn ProviderSession>,
    ) -> Result<()> {
        if self.sessions.read().await.contains_key(name) {
            tracing::debug!("[McpServerManager] Session '{}' already attached", name);
            return Ok(());
        }
        self.install(name, session).await
    }

    /// Record a new session and register its advertised tools
    async fn install(&self, name: &str, session: Arc<dyn ProviderSession>) -> Result<()> {
        let tools = session.list_tools().await?;
        let tool_names: Vec<String> = tools.iter().map(|t| t.name.to_string()).collect();

        self.sessions
            .write()
            .await
            .insert(name.to_string(), session);
        self.connected.write().await.push(name.to_string());
        self.router.register(name, tool_names.clone()).await;

        tracing::info!(
            "[McpServerManager] Connected to '{}' with tools {:?}",
            name,
            tool_names
        );

        Ok(())
    }

    /// Disconnect one provider and purge its routes immediately
    pub async fn disconnect(&self, name: &str) -> Result<()> {
        let session = self
            .sessions
            .write()
            .await
            .remove(name)
            .ok_or_else(|| OrchestratorError::NotConnected(name.to_string()))?;

        self.connected.write().await.retain(|n| n != name);
        self.router.remove_provider(name).await;

        session.close().await
    }

    /// Release every session in reverse acquisition order
    ///
    /// Best-effort: every close is attempted even if earlier ones fail; the
    /// first error, if any, is returned after all releases. Safe to call
    /// when nothing is connected.
    pub async fn shutdown(&self) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let mut connected = self.connected.write().await;

        let mut first_error = None;

        for name in connected.iter().rev() {
            if let Some(session) = sessions.get(name) {
                if let Err(e) = session.close().await {
                    tracing::warn!("[McpServerManager] Failed to close '{}': {}", name, e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        sessions.clear();
        connected.clear();
        self.router.clear().await;

        tracing::info!("[McpServerManager] Shutdown complete");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Get the live session for a provider
    pub async fn session(&self, name: &str) -> Option<Arc<dyn ProviderSession>> {
        self.sessions.read().await.get(name).cloned()
    }

    /// The routing table shared with the dispatcher
    pub fn router(&self) -> &ToolRouter {
        &self.router
    }

    /// Provider names in connection order
    pub async fn connected_names(&self) -> Vec<String> {
        self.connected.read().await.clone()
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Check whether any provider is connected
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Re-query every live session and flatten the advertised tools
    ///
    /// Queried fresh on every conversation turn rather than cached, because
    /// providers may add or remove tools between turns. Duplicate names are
    /// deduplicated with the same semantics as the routing table: the
    /// provider connected later wins.
    pub async fn tool_schemas(&self) -> Result<Vec<ToolSchema>> {
        let connected = self.connected.read().await.clone();
        let sessions = self.sessions.read().await.clone();

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut schemas: Vec<ToolSchema> = Vec::new();

        for name in &connected {
            let Some(session) = sessions.get(name) else {
                continue;
            };
            for tool in session.list_tools().await? {
                let tool_name = tool.name.to_string();
                let schema = schema_for(&tool);
                match index.get(&tool_name) {
                    Some(&i) => schemas[i] = schema,
                    None => {
                        index.insert(tool_name, schemas.len());
                        schemas.push(schema);
                    }
                }
            }
        }

        Ok(schemas)
    }
}

/// Convert an advertised MCP tool into a completion-service schema
fn schema_for(tool: &Tool) -> ToolSchema {
    ToolSchema::function(
        tool.name.to_string(),
        tool.description
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default(),
        serde_json::Value::Object(tool.input_schema.as_ref().clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::config::McpServerConfig;
    use crate::test_support::{tool, ScriptedSession};
    use std::sync::Mutex as StdMutex;

    fn store_with(name: &str, enabled: bool) -> McpClientConfig {
        McpClientConfig::new()
            .add_server(name, McpServerConfig::new("true").with_enabled(enabled))
    }

    #[tokio::test]
    async fn test_connect_unknown_provider() {
        let manager = McpServerManager::new(McpClientConfig::new());
        let err = manager.connect("missing").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownProvider(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_connect_disabled_provider() {
        let manager = McpServerManager::new(store_with("sleepy", false));
        let err = manager.connect("sleepy").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::ProviderDisabled(name) if name == "sleepy"));
    }

    #[tokio::test]
    async fn test_connect_many_aborts_on_first_failure() {
        // "calc" is already live, "sleepy" is disabled, "tail" is never reached
        let descriptors = McpClientConfig::new()
            .add_server("calc", McpServerConfig::new("true"))
            .add_server("sleepy", McpServerConfig::new("true").with_enabled(false))
            .add_server("tail", McpServerConfig::new("true"));
        let manager = McpServerManager::new(descriptors);
        let session = Arc::new(ScriptedSession::new("calc").with_tool(tool("add", "")));
        manager.attach_session("calc", session).await.unwrap();

        let err = manager
            .connect_many(&["calc", "sleepy", "tail"])
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::ProviderDisabled(_)));
        assert_eq!(manager.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let manager = McpServerManager::new(store_with("calc", true));
        let session = Arc::new(ScriptedSession::new("calc").with_tool(tool("add", "Add numbers")));
        manager.attach_session("calc", session).await.unwrap();

        // A second connect for a live session must not spawn or re-register
        manager.connect("calc").await.unwrap();

        assert_eq!(manager.session_count().await, 1);
        assert_eq!(manager.router().len().await, 1);
    }

    #[tokio::test]
    async fn test_attach_is_idempotent() {
        let manager = McpServerManager::new(McpClientConfig::new());
        let first = Arc::new(ScriptedSession::new("calc").with_tool(tool("add", "")));
        let second = Arc::new(ScriptedSession::new("calc").with_tool(tool("subtract", "")));

        manager.attach_session("calc", first).await.unwrap();
        manager.attach_session("calc", second).await.unwrap();

        assert_eq!(manager.session_count().await, 1);
        assert_eq!(manager.router().resolve("add").await.as_deref(), Some("calc"));
        assert_eq!(manager.router().resolve("subtract").await, None);
    }

    #[tokio::test]
    async fn test_colliding_tool_routes_to_last_provider() {
        let manager = McpServerManager::new(McpClientConfig::new());
        let a = Arc::new(ScriptedSession::new("a").with_tool(tool("x", "from a")));
        let b = Arc::new(ScriptedSession::new("b").with_tool(tool("x", "from b")));

        manager.attach_session("a", a).await.unwrap();
        manager.attach_session("b", b).await.unwrap();

        assert_eq!(manager.router().resolve("x").await.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_tool_schemas_flatten_and_dedupe() {
        let manager = McpServerManager::new(McpClientConfig::new());
        let a = Arc::new(
            ScriptedSession::new("a")
                .with_tool(tool("x", "from a"))
                .with_tool(tool("y", "only a")),
        );
        let b = Arc::new(ScriptedSession::new("b").with_tool(tool("x", "from b")));

        manager.attach_session("a", a).await.unwrap();
        manager.attach_session("b", b).await.unwrap();

        let schemas = manager.tool_schemas().await.unwrap();
        assert_eq!(schemas.len(), 2);

        let x = schemas.iter().find(|s| s.name() == "x").unwrap();
        assert_eq!(x.description(), "from b");
        assert!(schemas.iter().any(|s| s.name() == "y"));
    }

    #[tokio::test]
    async fn test_shutdown_releases_in_reverse_order() {
        let close_log = Arc::new(StdMutex::new(Vec::new()));

        let manager = McpServerManager::new(McpClientConfig::new());
        for name in ["first", "second", "third"] {
            let session = Arc::new(
                ScriptedSession::new(name)
                    .with_tool(tool(&format!("{name}_tool"), ""))
                    .with_close_log(close_log.clone()),
            );
            manager.attach_session(name, session).await.unwrap();
        }

        manager.shutdown().await.unwrap();

        assert_eq!(*close_log.lock().unwrap(), vec!["third", "second", "first"]);
        assert_eq!(manager.session_count().await, 0);
        assert!(manager.router().is_empty().await);
        assert!(manager.connected_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_continues_past_failures() {
        let close_log = Arc::new(StdMutex::new(Vec::new()));

        let manager = McpServerManager::new(McpClientConfig::new());
        let ok = Arc::new(
            ScriptedSession::new("ok")
                .with_tool(tool("a", ""))
                .with_close_log(close_log.clone()),
        );
        let broken = Arc::new(
            ScriptedSession::new("broken")
                .with_tool(tool("b", ""))
                .with_close_log(close_log.clone())
                .with_failing_close(),
        );

        manager.attach_session("ok", ok).await.unwrap();
        manager.attach_session("broken", broken).await.unwrap();

        // "broken" closes first (reverse order) and fails; "ok" must still close
        let err = manager.shutdown().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Connection(_)));

        assert_eq!(*close_log.lock().unwrap(), vec!["broken", "ok"]);
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_with_no_sessions() {
        let manager = McpServerManager::new(McpClientConfig::new());
        manager.shutdown().await.unwrap();
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn test_disconnect_purges_routes() {
        let manager = McpServerManager::new(McpClientConfig::new());
        let a = Arc::new(ScriptedSession::new("a").with_tool(tool("x", "")));
        let b = Arc::new(ScriptedSession::new("b").with_tool(tool("y", "")));

        manager.attach_session("a", a).await.unwrap();
        manager.attach_session("b", b).await.unwrap();

        manager.disconnect("a").await.unwrap();

        assert_eq!(manager.router().resolve("x").await, None);
        assert_eq!(manager.router().resolve("y").await.as_deref(), Some("b"));
        assert_eq!(manager.connected_names().await, vec!["b"]);

        let err = manager.disconnect("a").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::NotConnected(_)));
    }
}
