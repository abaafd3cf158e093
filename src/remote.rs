//! Remote completion contract and an OpenAI-compatible HTTP client
//!
//! Everything in this crate talks to the model through [`CompletionClient`].
//! Any failure is reported as a [`RemoteError`]; callers treat all variants
//! the same way.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::tokens::HasContent;

/// Default endpoint: the Hugging Face OpenAI-compatible router
pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";

/// Environment variable holding the API key for the default endpoint
pub const DEFAULT_API_KEY_VAR: &str = "HF_TOKEN";

/// Errors raised by a completion call
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model returned an empty completion")]
    EmptyResponse,

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Role of a message sent to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestRole {
    System,
    User,
    Assistant,
}

/// One message of an outbound request. Built per call, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub role: RequestRole,
    pub content: String,
}

impl RequestMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: RequestRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: RequestRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: RequestRole::Assistant,
            content: content.into(),
        }
    }
}

impl HasContent for RequestMessage {
    fn content(&self) -> &str {
        &self.content
    }
}

/// The single remote-model primitive.
///
/// A call either yields the completion text or fails; there are no partial
/// results and no retries at this layer.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        model_id: &str,
        messages: &[RequestMessage],
        max_output_tokens: u32,
        temperature: f32,
    ) -> Result<String, RemoteError>;
}

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Read the API key from an environment variable.
    ///
    /// A missing variable yields an empty key; the endpoint then answers with
    /// an authentication error on first use, which callers already handle.
    pub fn from_env(var: &str, base_url: impl Into<String>) -> Self {
        let api_key = std::env::var(var).unwrap_or_default();
        if api_key.is_empty() {
            debug!("{} is not set, requests will be unauthenticated", var);
        }
        Self::new(api_key, base_url)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self::from_env(DEFAULT_API_KEY_VAR, DEFAULT_BASE_URL)
    }
}

/// `CompletionClient` for any `/chat/completions` endpoint
#[derive(Clone)]
pub struct OpenAiClient {
    config: RemoteConfig,
    client: Client,
}

impl OpenAiClient {
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        model_id: &str,
        messages: &[RequestMessage],
        max_output_tokens: u32,
        temperature: f32,
    ) -> Result<String, RemoteError> {
        let body = ChatCompletionRequest {
            model: model_id,
            messages,
            max_tokens: max_output_tokens,
            temperature,
            stream: false,
        };

        debug!(
            "Sending {} messages to {} ({})",
            messages.len(),
            model_id,
            self.endpoint()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => RemoteError::Authentication(message),
                429 => RemoteError::RateLimited(message),
                code => RemoteError::Api {
                    status: code,
                    message,
                },
            });
        }

        let text = response.text().await?;
        parse_completion(&text)
    }
}

/// Extract the first choice's text from a chat completion response body
pub fn parse_completion(body: &str) -> Result<String, RemoteError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| RemoteError::InvalidResponse("response has no choices".to_string()))?
        .message
        .content
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(RemoteError::EmptyResponse);
    }
    Ok(content)
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [RequestMessage],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let messages = vec![
            RequestMessage::system("Ты полезный AI-ассистент."),
            RequestMessage::user("Привет"),
        ];
        let body = ChatCompletionRequest {
            model: "Qwen/Qwen3-Coder-Next:novita",
            messages: &messages,
            max_tokens: 2000,
            temperature: 0.5,
            stream: false,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "Qwen/Qwen3-Coder-Next:novita");
        assert_eq!(json["max_tokens"], 2000);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Привет");
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Здравствуйте!"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        }"#;
        assert_eq!(parse_completion(body).unwrap(), "Здравствуйте!");
    }

    #[test]
    fn test_parse_completion_errors() {
        assert!(matches!(
            parse_completion("not json"),
            Err(RemoteError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices": []}"#),
            Err(RemoteError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices": [{"message": {"content": "  "}}]}"#),
            Err(RemoteError::EmptyResponse)
        ));
        assert!(matches!(
            parse_completion(r#"{"choices": [{"message": {"content": null}}]}"#),
            Err(RemoteError::EmptyResponse)
        ));
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = RemoteConfig::new("key", "https://example.test/v1/");
        let client = OpenAiClient::new(config).unwrap();
        assert_eq!(client.endpoint(), "https://example.test/v1/chat/completions");
    }
}
