//! Client error types

use thiserror::Error;

/// Errors that can occur while orchestrating tool providers and completions
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Provider name is not present in the descriptor store
    #[error("Unknown tool provider: {0}")]
    UnknownProvider(String),

    /// Provider exists but its `enabled` flag is false
    #[error("Tool provider '{0}' is disabled")]
    ProviderDisabled(String),

    /// No live session for the provider (or no providers connected at all)
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// Tool name does not resolve to any connected provider
    #[error("Tool '{0}' is not registered with any connected provider")]
    UnroutableTool(String),

    /// The provider executed the tool and reported an error
    #[error("Tool '{name}' failed: {detail}")]
    ToolExecution { name: String, detail: String },

    /// Tool result carried a content part we do not handle (image, resource)
    #[error("Unsupported content kind '{0}' in tool result")]
    UnsupportedContentKind(String),

    /// Tool result carried a content part we do not recognize at all
    #[error("Malformed tool result: {0}")]
    MalformedToolResult(String),

    /// Completion service hit its length cap
    #[error("Completion stopped: length limit reached")]
    LengthLimitExceeded,

    /// Completion service triggered its content filter
    #[error("Completion stopped: content filter triggered")]
    ContentFiltered,

    /// Completion service returned a finish signal we do not handle
    #[error("Unsupported finish signal: {0}")]
    UnsupportedFinishSignal(String),

    /// The conversation requested more tool-call rounds than allowed
    #[error("Tool-call round limit ({0}) exceeded")]
    ToolRoundLimitExceeded(usize),

    /// Spawning, handshaking, or talking to a provider process failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// HTTP or API-level failure from the completion service
    #[error("Completion service error: {0}")]
    CompletionService(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OrchestratorError {
    /// Create a connection error from any displayable cause
    pub fn connection(cause: impl std::fmt::Display) -> Self {
        OrchestratorError::Connection(cause.to_string())
    }

    /// Create a completion-service error from any displayable cause
    pub fn completion(cause: impl std::fmt::Display) -> Self {
        OrchestratorError::CompletionService(cause.to_string())
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::UnknownProvider("weather".into());
        assert_eq!(err.to_string(), "Unknown tool provider: weather");

        let err = OrchestratorError::UnroutableTool("add".into());
        assert_eq!(
            err.to_string(),
            "Tool 'add' is not registered with any connected provider"
        );

        let err = OrchestratorError::ToolExecution {
            name: "add".into(),
            detail: "division by zero".into(),
        };
        assert_eq!(err.to_string(), "Tool 'add' failed: division by zero");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such command");
        let err: OrchestratorError = io_err.into();
        assert!(matches!(err, OrchestratorError::Io(_)));
    }

    #[test]
    fn test_error_from_serde() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: OrchestratorError = parse_err.into();
        assert!(matches!(err, OrchestratorError::Serialization(_)));
    }
}
