//! Chat-completion clients for the structured extraction step.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CompletionError, ScanError};
use crate::models::config::CompletionConfig;

/// A generative text model answering one system + user exchange.
pub trait CompletionClient: Send + Sync {
    /// Send a single request and return the model's message content.
    fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// Build a client from configuration, reading the API key from the
    /// environment.
    ///
    /// Must not be called from inside an async runtime; the blocking HTTP
    /// client owns its own.
    pub fn from_config(config: &CompletionConfig) -> Result<Self, ScanError> {
        let api_key = config.api_key()?;
        Self::new(config, api_key)
    }

    /// Build a client with an explicit API key.
    pub fn new(config: &CompletionConfig, api_key: impl Into<String>) -> Result<Self, ScanError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("invoscan/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScanError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl CompletionClient for OpenAiClient {
    fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        debug!("Requesting completion from {} ({})", self.endpoint, self.model);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        content_from_body(&body)
    }
}

/// Pull the first choice's message content out of a response body.
fn content_from_body(body: &str) -> Result<String, CompletionError> {
    let envelope: ChatResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Envelope(e.to_string()))?;

    envelope
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(CompletionError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_choice_content() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"taxes\":\"5\"}"}}]}"#;
        assert_eq!(content_from_body(body).unwrap(), r#"{"taxes":"5"}"#);
    }

    #[test]
    fn test_no_choices_is_empty_response() {
        assert!(matches!(
            content_from_body(r#"{"choices":[]}"#),
            Err(CompletionError::EmptyResponse)
        ));
        assert!(matches!(
            content_from_body(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#),
            Err(CompletionError::EmptyResponse)
        ));
    }

    #[test]
    fn test_garbage_envelope() {
        assert!(matches!(content_from_body("<html>"), Err(CompletionError::Envelope(_))));
    }

    #[test]
    fn test_endpoint_and_debug_hide_key() {
        let config = CompletionConfig {
            base_url: "http://localhost:9999/v1/".to_string(),
            ..CompletionConfig::default()
        };
        let client = OpenAiClient::new(&config, "sk-secret").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9999/v1/chat/completions");
        assert!(!format!("{:?}", client).contains("sk-secret"));
    }

    #[test]
    fn test_unreachable_service_is_network_error() {
        let config = CompletionConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..CompletionConfig::default()
        };
        let client = OpenAiClient::new(&config, "sk-test").unwrap();
        assert!(matches!(
            client.complete("system", "user"),
            Err(CompletionError::Network(_))
        ));
    }
}
