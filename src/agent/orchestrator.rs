//! Conversation-turn state machine
//!
//! Alternates between completion-service calls and tool execution until the
//! service signals a normal stop. The state is the role of the last message
//! in the sequence; each tool-call round appends the assistant's request
//! message plus one tool message per call, so the next iteration resumes
//! from the tool state.

use std::sync::Arc;

use crate::core::{OrchestratorError, Result};
use crate::llm::{
    ChatMessage, CompletionClient, CompletionOutcome, FinishReason, RequestConfig, Role,
};
use crate::mcp::McpServerManager;

use super::config::OrchestratorConfig;
use super::executor::ToolDispatcher;

/// Drives one conversation turn across completions and tool calls
pub struct ChatOrchestrator {
    manager: Arc<McpServerManager>,
    dispatcher: ToolDispatcher,
    llm: Arc<dyn CompletionClient>,
    base_config: RequestConfig,
    config: OrchestratorConfig,
}

impl ChatOrchestrator {
    /// Create an orchestrator over connected providers and a completion client
    pub fn new(
        manager: Arc<McpServerManager>,
        llm: Arc<dyn CompletionClient>,
        base_config: RequestConfig,
    ) -> Self {
        Self {
            dispatcher: ToolDispatcher::new(manager.clone()),
            manager,
            llm,
            base_config,
            config: OrchestratorConfig::default(),
        }
    }

    /// Replace the loop settings
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Process a message sequence until the turn reaches a terminal state
    ///
    /// Takes ownership of the sequence and returns it with the turn's
    /// messages appended. A failure aborts the current turn; the caller's
    /// prior messages are untouched and reusable for a retry.
    ///
    /// `overrides`, when given, is merged per-field onto the base request
    /// configuration (explicitly supplied fields win, including clears).
    pub async fn process_messages(
        &self,
        mut messages: Vec<ChatMessage>,
        overrides: Option<&RequestConfig>,
    ) -> Result<Vec<ChatMessage>> {
        if self.manager.is_empty().await {
            return Err(OrchestratorError::NotConnected(
                "no tool providers are connected".into(),
            ));
        }

        let request_config = match overrides {
            Some(overrides) => self.base_config.merged(overrides),
            None => self.base_config.clone(),
        };

        let mut rounds = 0usize;

        loop {
            let Some(last) = messages.last() else {
                return Ok(messages);
            };

            // Only the user and tool states call the completion service; a
            // resume-after-tools turn tolerates unknown finish signals, a
            // fresh user turn does not.
            let strict = match last.role {
                Role::User => true,
                Role::Tool => {
                    tracing::debug!("[ChatOrchestrator] Resuming after tool execution");
                    false
                }
                Role::Assistant => {
                    // Turn already resolved, with or without tool calls
                    return Ok(messages);
                }
                Role::System => {
                    tracing::warn!(
                        "[ChatOrchestrator] Sequence ends with unhandled role, returning unchanged"
                    );
                    return Ok(messages);
                }
            };

            let tools = self.manager.tool_schemas().await?;

            tracing::info!(
                "[ChatOrchestrator] Requesting completion: {} messages, {} tools",
                messages.len(),
                tools.len()
            );

            let outcome = self.llm.complete(&messages, &tools, &request_config).await?;

            match outcome.finish {
                FinishReason::Stop => {
                    messages.push(ChatMessage::assistant(outcome.content));
                    return Ok(messages);
                }

                FinishReason::ToolCalls => {
                    rounds += 1;
                    if rounds > self.config.max_tool_rounds {
                        return Err(OrchestratorError::ToolRoundLimitExceeded(
                            self.config.max_tool_rounds,
                        ));
                    }
                    self.run_tool_round(&mut messages, outcome).await?;
                }

                FinishReason::Length => return Err(OrchestratorError::LengthLimitExceeded),

                FinishReason::ContentFilter => return Err(OrchestratorError::ContentFiltered),

                other => {
                    if strict {
                        return Err(OrchestratorError::UnsupportedFinishSignal(
                            other.as_str().to_string(),
                        ));
                    }
                    tracing::warn!(
                        "[ChatOrchestrator] Unexpected finish signal '{}' after tool execution, \
                         returning sequence unchanged",
                        other.as_str()
                    );
                    return Ok(messages);
                }
            }
        }
    }

    /// Append the assistant's tool-call message and every tool result
    async fn run_tool_round(
        &self,
        messages: &mut Vec<ChatMessage>,
        outcome: CompletionOutcome,
    ) -> Result<()> {
        let calls = outcome.tool_calls;

        tracing::info!(
            "[ChatOrchestrator] Completion requested {} tool call(s): {:?}",
            calls.len(),
            calls
                .iter()
                .map(|c| c.function.name.as_str())
                .collect::<Vec<_>>()
        );

        messages.push(ChatMessage::assistant_with_tool_calls(
            outcome.content,
            calls.clone(),
        ));

        let results = self.dispatcher.execute_many(&calls).await?;
        messages.extend(results);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;
    use crate::mcp::McpClientConfig;
    use crate::test_support::{text_result, tool, MockCompletionClient, ScriptedSession};

    fn stop_reply(content: &str) -> CompletionOutcome {
        CompletionOutcome {
            finish: FinishReason::Stop,
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
        }
    }

    fn tool_call_reply(calls: Vec<ToolCall>) -> CompletionOutcome {
        CompletionOutcome {
            finish: FinishReason::ToolCalls,
            content: None,
            tool_calls: calls,
        }
    }

    fn finish_reply(finish: FinishReason) -> CompletionOutcome {
        CompletionOutcome {
            finish,
            content: None,
            tool_calls: Vec::new(),
        }
    }

    async fn manager_with_adder() -> Arc<McpServerManager> {
        let manager = Arc::new(McpServerManager::new(McpClientConfig::new()));
        let session = ScriptedSession::new("calc")
            .with_tool(tool("add", "Add two integers"))
            .with_outcome("add", text_result("5"));
        manager
            .attach_session("calc", Arc::new(session))
            .await
            .unwrap();
        manager
    }

    fn orchestrator(
        manager: Arc<McpServerManager>,
        llm: MockCompletionClient,
    ) -> ChatOrchestrator {
        ChatOrchestrator::new(manager, Arc::new(llm), RequestConfig::new("gpt-4o"))
    }

    #[tokio::test]
    async fn test_turn_with_tool_round() {
        let manager = manager_with_adder().await;
        let llm = MockCompletionClient::new()
            .with_reply(tool_call_reply(vec![ToolCall::function(
                "call_1",
                "add",
                r#"{"a":2,"b":3}"#,
            )]))
            .with_reply(stop_reply("The result is 5."));
        let orchestrator = orchestrator(manager, llm);

        let messages = orchestrator
            .process_messages(vec![ChatMessage::user("compute 2+3")], None)
            .await
            .unwrap();

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].tool_calls[0].function.name, "add");
        assert_eq!(messages[2].role, Role::Tool);
        assert!(messages[2].text().unwrap().contains("5"));
        assert_eq!(messages[3].role, Role::Assistant);
        assert_eq!(messages[3].text(), Some("The result is 5."));
    }

    #[tokio::test]
    async fn test_plain_stop_turn() {
        let manager = manager_with_adder().await;
        let llm = MockCompletionClient::new().with_reply(stop_reply("Hello there."));
        let orchestrator = orchestrator(manager, llm);

        let messages = orchestrator
            .process_messages(vec![ChatMessage::user("hi")], None)
            .await
            .unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text(), Some("Hello there."));
    }

    #[tokio::test]
    async fn test_no_providers_fails_fast() {
        let manager = Arc::new(McpServerManager::new(McpClientConfig::new()));
        let llm = MockCompletionClient::new().with_reply(stop_reply("unreachable"));
        let orchestrator = orchestrator(manager, llm);

        let err = orchestrator
            .process_messages(vec![ChatMessage::user("hi")], None)
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::NotConnected(_)));
    }

    #[tokio::test]
    async fn test_length_finish_fails() {
        let manager = manager_with_adder().await;
        let llm = MockCompletionClient::new().with_reply(finish_reply(FinishReason::Length));
        let orchestrator = orchestrator(manager, llm);

        let err = orchestrator
            .process_messages(vec![ChatMessage::user("hi")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::LengthLimitExceeded));
    }

    #[tokio::test]
    async fn test_content_filter_finish_fails() {
        let manager = manager_with_adder().await;
        let llm = MockCompletionClient::new().with_reply(finish_reply(FinishReason::ContentFilter));
        let orchestrator = orchestrator(manager, llm);

        let err = orchestrator
            .process_messages(vec![ChatMessage::user("hi")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::ContentFiltered));
    }

    #[tokio::test]
    async fn test_unknown_finish_fails_on_user_turn() {
        let manager = manager_with_adder().await;
        let llm = MockCompletionClient::new()
            .with_reply(finish_reply(FinishReason::Other("eos_token".into())));
        let orchestrator = orchestrator(manager, llm);

        let err = orchestrator
            .process_messages(vec![ChatMessage::user("hi")], None)
            .await
            .unwrap_err();
        assert!(
            matches!(err, OrchestratorError::UnsupportedFinishSignal(signal) if signal == "eos_token")
        );
    }

    #[tokio::test]
    async fn test_unknown_finish_is_soft_after_tools() {
        let manager = manager_with_adder().await;
        let llm = MockCompletionClient::new()
            .with_reply(finish_reply(FinishReason::Other("eos_token".into())));
        let orchestrator = orchestrator(manager, llm);

        // Sequence already ends in a tool result, as if resuming mid-turn
        let input = vec![
            ChatMessage::user("compute 2+3"),
            ChatMessage::assistant_with_tool_calls(
                None,
                vec![ToolCall::function("call_1", "add", r#"{"a":2,"b":3}"#)],
            ),
            ChatMessage::tool("call_1", r#"{"a":2,"b":3,"add":["5"]}"#),
        ];

        let messages = orchestrator
            .process_messages(input.clone(), None)
            .await
            .unwrap();
        assert_eq!(messages.len(), input.len());
    }

    #[tokio::test]
    async fn test_assistant_last_is_a_no_op() {
        let manager = manager_with_adder().await;
        let llm = MockCompletionClient::new();
        let orchestrator = orchestrator(manager, llm);

        let input = vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant(Some("Hello there.".into())),
        ];
        let messages = orchestrator
            .process_messages(input.clone(), None)
            .await
            .unwrap();

        assert_eq!(messages.len(), input.len());
    }

    #[tokio::test]
    async fn test_empty_sequence_is_a_no_op() {
        let manager = manager_with_adder().await;
        let orchestrator = orchestrator(manager, MockCompletionClient::new());

        let messages = orchestrator.process_messages(Vec::new(), None).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_round_limit_stops_runaway_turns() {
        let manager = manager_with_adder().await;

        // Every reply asks for another tool round
        let mut llm = MockCompletionClient::new();
        for i in 0..8 {
            llm = llm.with_reply(tool_call_reply(vec![ToolCall::function(
                format!("call_{i}"),
                "add",
                r#"{"a":2,"b":3}"#,
            )]));
        }

        let orchestrator = orchestrator(manager, llm)
            .with_config(OrchestratorConfig::new().with_max_tool_rounds(3));

        let err = orchestrator
            .process_messages(vec![ChatMessage::user("loop forever")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::ToolRoundLimitExceeded(3)));
    }

    #[tokio::test]
    async fn test_failed_tool_round_aborts_turn() {
        let manager = Arc::new(McpServerManager::new(McpClientConfig::new()));
        let session = ScriptedSession::new("calc")
            .with_tool(tool("add", ""))
            .with_outcome("add", crate::test_support::error_result("overflow"));
        manager
            .attach_session("calc", Arc::new(session))
            .await
            .unwrap();

        let llm = MockCompletionClient::new().with_reply(tool_call_reply(vec![
            ToolCall::function("call_1", "add", r#"{"a":1,"b":2}"#),
        ]));
        let orchestrator = orchestrator(manager, llm);

        let err = orchestrator
            .process_messages(vec![ChatMessage::user("compute")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::ToolExecution { .. }));
    }
}
