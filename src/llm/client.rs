//! Completion-service client
//!
//! Works with any OpenAI-compatible `/chat/completions` endpoint. The
//! conversation loop only sees the `CompletionClient` trait, so tests can
//! script responses without a network.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::{OrchestratorError, Result};

use super::request::RequestConfig;
use super::types::{ChatMessage, CompletionOutcome, FinishReason, ToolCall, ToolSchema};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// The completion-service seam used by the conversation loop
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Request one completion over the full message history
    ///
    /// Tool choice is always automatic: the service decides whether to
    /// answer directly or request tool calls.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
        config: &RequestConfig,
    ) -> Result<CompletionOutcome>;
}

/// Client for an OpenAI-compatible chat-completion API
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    organization: Option<String>,
    project: Option<String>,
}

impl OpenAiClient {
    /// Create a client against the default API endpoint
    ///
    /// The credential is an opaque string supplied by the caller; this
    /// client never reads it from the environment or any settings store.
    pub fn new(api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            organization: None,
            project: None,
        }
    }

    /// Point the client at a different OpenAI-compatible endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the organization header
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Set the project header
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Build the request body for one completion call
    fn build_body(
        messages: &[ChatMessage],
        tools: &[ToolSchema],
        config: &RequestConfig,
    ) -> Result<Value> {
        let mut body = Map::new();
        config.apply_to(&mut body);
        body.insert("messages".to_string(), serde_json::to_value(messages)?);

        if !tools.is_empty() {
            body.insert("tools".to_string(), serde_json::to_value(tools)?);
            body.insert("tool_choice".to_string(), Value::String("auto".into()));
        }

        Ok(Value::Object(body))
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
        config: &RequestConfig,
    ) -> Result<CompletionOutcome> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::build_body(messages, tools, config)?;

        tracing::debug!(
            "[OpenAiClient] Requesting completion: model={} messages={} tools={}",
            config.model,
            messages.len(),
            tools.len()
        );

        let mut request = self.http.post(&url).bearer_auth(&self.api_key).json(&body);
        if let Some(organization) = &self.organization {
            request = request.header("OpenAI-Organization", organization);
        }
        if let Some(project) = &self.project {
            request = request.header("OpenAI-Project", project);
        }

        let response = request.send().await.map_err(OrchestratorError::completion)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!("[OpenAiClient] Completion failed: HTTP {}", status);
            return Err(OrchestratorError::CompletionService(format!(
                "HTTP {status}: {detail}"
            )));
        }

        let api_response: ApiResponse =
            response.json().await.map_err(OrchestratorError::completion)?;

        let choice = api_response.choices.into_iter().next().ok_or_else(|| {
            OrchestratorError::CompletionService("response contained no choices".into())
        })?;

        let finish = choice
            .finish_reason
            .as_deref()
            .map(FinishReason::parse)
            .unwrap_or_else(|| FinishReason::Other("<missing>".to_string()));

        tracing::debug!("[OpenAiClient] Completion finished: {}", finish.as_str());

        Ok(CompletionOutcome {
            finish,
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
        })
    }
}

// --- wire response types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiAssistantMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiAssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}
