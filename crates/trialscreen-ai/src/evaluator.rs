//! Single-prompt evaluation against a chat-completion service.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::config::ScreeningConfig;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[cfg(feature = "openai")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication rejected (status {status}): {body}")]
    Auth { status: u16, body: String },

    #[error("rate limited: {body}")]
    RateLimited { body: String },

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("completion response contained no choices")]
    NoCompletions,
}

/// One chat-completion request: a single user-role message.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub temperature: f32,
    pub prompt: &'a str,
}

/// A chat-completion capability. Implementations return the text of every
/// candidate completion, in the order the service returned them.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<Vec<String>, EvaluationError>;
}

/// Sends prompts to a [`ChatCompletion`] client with a fixed model and temperature.
pub struct Evaluator {
    client: Box<dyn ChatCompletion>,
    model: String,
    temperature: f32,
}

impl Evaluator {
    /// `config` is expected to have passed [`ScreeningConfig::validate`].
    pub fn new(client: Box<dyn ChatCompletion>, config: &ScreeningConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Evaluate one prompt, returning the first completion's text verbatim.
    pub async fn evaluate(&self, prompt: &str) -> Result<String, EvaluationError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            prompt,
        };
        let choices = self.client.complete(request).await?;
        debug!(choices = choices.len(), model = %self.model, "completion received");
        choices
            .into_iter()
            .next()
            .ok_or(EvaluationError::NoCompletions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        reply: Vec<String>,
        seen: Mutex<Vec<(String, f32, String)>>,
    }

    #[async_trait]
    impl ChatCompletion for std::sync::Arc<Recording> {
        async fn complete(
            &self,
            request: ChatRequest<'_>,
        ) -> Result<Vec<String>, EvaluationError> {
            self.seen.lock().unwrap().push((
                request.model.to_string(),
                request.temperature,
                request.prompt.to_string(),
            ));
            Ok(self.reply.clone())
        }
    }

    fn recording(reply: &[&str]) -> std::sync::Arc<Recording> {
        std::sync::Arc::new(Recording {
            reply: reply.iter().map(|s| s.to_string()).collect(),
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn returns_first_choice_verbatim() {
        let client = recording(&["  Eligibility: eligible\n", "Eligibility: ineligible"]);
        let evaluator = Evaluator::new(Box::new(client.clone()), &ScreeningConfig::default());

        let text = evaluator.evaluate("prompt text").await.unwrap();
        assert_eq!(text, "  Eligibility: eligible\n");

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "gpt-4o-mini");
        assert_eq!(seen[0].1, 0.2);
        assert_eq!(seen[0].2, "prompt text");
    }

    #[tokio::test]
    async fn passes_configured_model_and_temperature() {
        let client = recording(&["ok"]);
        let config = ScreeningConfig {
            model: "gpt-4o".into(),
            temperature: 1.5,
            ..Default::default()
        };
        let evaluator = Evaluator::new(Box::new(client.clone()), &config);
        evaluator.evaluate("p").await.unwrap();

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].0, "gpt-4o");
        assert_eq!(seen[0].1, 1.5);
    }

    #[tokio::test]
    async fn zero_choices_is_an_error() {
        let evaluator = Evaluator::new(Box::new(recording(&[])), &ScreeningConfig::default());
        let err = evaluator.evaluate("p").await.unwrap_err();
        assert!(matches!(err, EvaluationError::NoCompletions));
    }
}
