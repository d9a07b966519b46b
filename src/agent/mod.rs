//! Conversation orchestration
//!
//! - `ChatOrchestrator`: drives the completion service / tool execution
//!   state machine for one conversation turn
//! - `ToolDispatcher`: resolves and executes tool calls against provider
//!   sessions, concurrently
//! - `OrchestratorConfig`: loop settings
//! - transcript helpers for callers consuming a finished turn

mod config;
mod executor;
mod orchestrator;
mod transcript;

pub use config::OrchestratorConfig;
pub use executor::ToolDispatcher;
pub use orchestrator::ChatOrchestrator;
pub use transcript::{invoked_tool_names, latest_assistant_text};
