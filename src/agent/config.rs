//! Orchestrator configuration

/// Settings for the conversation loop
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum tool-call rounds per turn (prevents unbounded loops against
    /// a misbehaving completion service)
    pub max_tool_rounds: usize,
}

impl OrchestratorConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self {
            max_tool_rounds: 32,
        }
    }

    /// Set the maximum tool-call rounds per turn
    pub fn with_max_tool_rounds(mut self, max: usize) -> Self {
        self.max_tool_rounds = max;
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_tool_rounds, 32);
    }

    #[test]
    fn test_with_max_tool_rounds() {
        let config = OrchestratorConfig::new().with_max_tool_rounds(4);
        assert_eq!(config.max_tool_rounds, 4);
    }
}
