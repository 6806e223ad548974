//! OpenAI-compatible chat completions client.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use scholarbot_shared::{ChatMessage, ModelConfig, Result, ScholarbotError};

use crate::ChatModel;

/// User-Agent string for model requests.
const USER_AGENT: &str = concat!("scholarbot/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body echoed back in error messages.
const MAX_ERROR_BODY: usize = 300;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Talks to `<base_url>/chat/completions` with bearer auth.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiCompatClient {
    /// Build a client from the `[model]` config table and a resolved API key.
    pub fn new(config: &ModelConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                ScholarbotError::external("model", format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: config.default_model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ChatModel for OpenAiCompatClient {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[&ChatMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ScholarbotError::external("model", e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ScholarbotError::external("model", format!("failed to read body: {e}")))?;

        if !status.is_success() {
            let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(ScholarbotError::external(
                "model",
                format!("HTTP {status}: {snippet}"),
            ));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ScholarbotError::external("model", format!("invalid response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ScholarbotError::external("model", "response had no message content"))?;

        debug!(reply_chars = content.len(), "model replied");
        Ok(content)
    }
}
