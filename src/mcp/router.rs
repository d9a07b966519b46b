//! Tool routing table
//!
//! Maps each advertised tool name to the provider currently serving it. The
//! table is built incrementally by the connection manager and read by the
//! dispatcher on every tool call.

use std::collections::HashMap;

use tokio::sync::RwLock;

/// Routing table from tool name to provider name
///
/// Last writer wins: when two providers advertise the same tool name, the
/// provider registered later takes over the route and the collision is
/// logged as a warning.
#[derive(Debug, Default)]
pub struct ToolRouter {
    routes: RwLock<HashMap<String, String>>,
}

impl ToolRouter {
    /// Create an empty routing table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider's advertised tool names
    ///
    /// All names are registered under one write lock so readers never observe
    /// a provider's tools half-registered.
    pub async fn register<S: Into<String>>(
        &self,
        provider: &str,
        tool_names: impl IntoIterator<Item = S>,
    ) {
        let mut routes = self.routes.write().await;
        for tool_name in tool_names {
            let tool_name = tool_name.into();
            if let Some(previous) = routes.insert(tool_name.clone(), provider.to_string()) {
                if previous != provider {
                    tracing::warn!(
                        "[ToolRouter] Tool '{}' re-routed from '{}' to '{}'",
                        tool_name,
                        previous,
                        provider
                    );
                }
            } else {
                tracing::debug!("[ToolRouter] Tool '{}' routed to '{}'", tool_name, provider);
            }
        }
    }

    /// Resolve the provider currently serving a tool
    pub async fn resolve(&self, tool_name: &str) -> Option<String> {
        self.routes.read().await.get(tool_name).cloned()
    }

    /// Remove every route owned by a provider
    pub async fn remove_provider(&self, provider: &str) {
        self.routes.write().await.retain(|_, p| p != provider);
    }

    /// Drop all routes
    pub async fn clear(&self) {
        self.routes.write().await.clear();
    }

    /// Number of routed tool names
    pub async fn len(&self) -> usize {
        self.routes.read().await.len()
    }

    /// Check whether the table is empty
    pub async fn is_empty(&self) -> bool {
        self.routes.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_resolve() {
        let router = ToolRouter::new();
        router.register("calculator", ["add", "subtract"]).await;

        assert_eq!(router.resolve("add").await.as_deref(), Some("calculator"));
        assert_eq!(router.resolve("multiply").await, None);
        assert_eq!(router.len().await, 2);
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let router = ToolRouter::new();
        router.register("alpha", ["x"]).await;
        router.register("beta", ["x"]).await;

        assert_eq!(router.resolve("x").await.as_deref(), Some("beta"));
        assert_eq!(router.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_provider_purges_routes() {
        let router = ToolRouter::new();
        router.register("alpha", ["x", "y"]).await;
        router.register("beta", ["z"]).await;

        router.remove_provider("alpha").await;

        assert_eq!(router.resolve("x").await, None);
        assert_eq!(router.resolve("y").await, None);
        assert_eq!(router.resolve("z").await.as_deref(), Some("beta"));
    }

    #[tokio::test]
    async fn test_clear() {
        let router = ToolRouter::new();
        router.register("alpha", ["x"]).await;
        router.clear().await;
        assert!(router.is_empty().await);
    }
}
