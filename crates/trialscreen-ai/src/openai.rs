//! OpenAI-compatible chat-completion client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ConfigurationError;
use crate::evaluator::{ChatCompletion, ChatRequest, EvaluationError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const CHAT_COMPLETIONS: &str = "/chat/completions";

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for `POST {base_url}/chat/completions` with bearer-token auth.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// Fails with [`ConfigurationError::MissingCredential`] when `api_key`
    /// is blank, before any request is made.
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self, ConfigurationError> {
        if api_key.trim().is_empty() {
            return Err(ConfigurationError::MissingCredential);
        }
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatCompletion for OpenAiClient {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<Vec<String>, EvaluationError> {
        let url = format!("{}{CHAT_COMPLETIONS}", self.base_url);
        let body = ChatBody {
            model: request.model,
            temperature: request.temperature,
            messages: [Message {
                role: "user",
                content: request.prompt,
            }],
        };

        debug!(url = %url, model = request.model, prompt_len = request.prompt.len(), "chat completion request");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => EvaluationError::Auth {
                    status: status.as_u16(),
                    body,
                },
                429 => EvaluationError::RateLimited { body },
                code => EvaluationError::Api { status: code, body },
            });
        }

        let bytes = resp.bytes().await?;
        let parsed: ChatResponse = serde_json::from_slice(&bytes)?;

        Ok(parsed
            .choices
            .into_iter()
            .map(|choice| {
                choice.message.content.unwrap_or_else(|| {
                    warn!("completion choice had no content");
                    String::new()
                })
            })
            .collect())
    }
}
