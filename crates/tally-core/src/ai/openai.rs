//! OpenAI chat completions backend
//!
//! Works with the hosted OpenAI API and with any server implementing the
//! `/v1/chat/completions` endpoint.
//!
//! # Configuration
//!
//! Environment variables:
//! - `OPENAI_API_KEY`: API key (required)
//! - `OPENAI_BASE_URL`: Server URL (default: https://api.openai.com)
//! - `TALLY_REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 30)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::ChatMessage;
use crate::timeout::timeout_from_env;

use super::types::{CompletionRequest, SamplingParams};
use super::CompletionBackend;

/// Default OpenAI API host
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// OpenAI-compatible chat completions backend
#[derive(Clone)]
pub struct OpenAIBackend {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAIBackend {
    /// Create a backend for `base_url`
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
        })
    }

    /// Create from environment variables
    ///
    /// Required: `OPENAI_API_KEY`
    /// Optional: `OPENAI_BASE_URL`, `TALLY_REQUEST_TIMEOUT_SECS`
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout = timeout_from_env().unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        match Self::new(&base_url, Some(&api_key), timeout) {
            Ok(backend) => Some(backend),
            Err(e) => {
                warn!(error = %e, "Failed to build OpenAI HTTP client");
                None
            }
        }
    }
}

/// Chat completion request body
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(flatten)]
    params: &'a SamplingParams,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    /// `null` when the model produced no text (e.g. reasoning budget exhausted)
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionBackend for OpenAIBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            params: &request.params,
            stream: false,
        };

        let mut req_builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&body);

        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.bearer_auth(api_key);
        }

        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(model = %request.model, %status, body = %body, "Chat completions error body");
            return Err(Error::Backend(format!(
                "{} returned {}",
                request.model, status
            )));
        }

        let chat_response: ChatCompletionResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| Error::Backend(format!("No choices from {}", request.model)))
    }

    async fn health_check(&self) -> bool {
        let mut req_builder = self.http_client.get(format!("{}/v1/models", self.base_url));
        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.bearer_auth(api_key);
        }
        matches!(req_builder.send().await, Ok(resp) if resp.status().is_success())
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockCompletionServer, MockCompletionReply};

    fn backend_for(server: &MockCompletionServer) -> OpenAIBackend {
        OpenAIBackend::new(&server.url(), Some("sk-test"), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_backend_new_trims_trailing_slash() {
        let backend =
            OpenAIBackend::new("http://localhost:12434/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(backend.host(), "http://localhost:12434");
    }

    #[test]
    fn test_request_serialization_reasoning() {
        let request = CompletionRequest::new("gpt-5.2", vec![ChatMessage::user("Hello")], 1000, 0.7);
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            params: &request.params,
            stream: false,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-5.2");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Hello");
        assert_eq!(json["max_completion_tokens"], 1000);
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_request_serialization_standard() {
        let request = CompletionRequest::new("gpt-4o", vec![ChatMessage::system("ctx")], 1000, 0.7);
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            params: &request.params,
            stream: false,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["max_tokens"], 1000);
        let temp = json["temperature"].as_f64().unwrap();
        assert!((temp - 0.7).abs() < 0.001);
        assert!(json.get("max_completion_tokens").is_none());
    }

    #[test]
    fn test_null_content_is_empty() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#,
        )
        .unwrap();
        assert!(response.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn test_complete_against_mock_server() {
        let server = MockCompletionServer::start()
            .await
            .with_reply("gpt-4o", MockCompletionReply::Text("Hello there".into()));
        let backend = backend_for(&server);

        let request = CompletionRequest::new("gpt-4o", vec![ChatMessage::user("hi")], 1000, 0.7);
        let reply = backend.complete(&request).await.unwrap();
        assert_eq!(reply, "Hello there");

        let bodies = server.requests();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["model"], "gpt-4o");
        assert_eq!(bodies[0]["max_tokens"], 1000);
    }

    #[tokio::test]
    async fn test_null_content_over_the_wire() {
        let server = MockCompletionServer::start()
            .await
            .with_reply("gpt-5.2", MockCompletionReply::Null);
        let backend = backend_for(&server);

        let request = CompletionRequest::new("gpt-5.2", vec![ChatMessage::user("hi")], 1000, 0.7);
        assert_eq!(backend.complete(&request).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_error_status_is_summarized() {
        let server = MockCompletionServer::start()
            .await
            .with_reply("gpt-4o", MockCompletionReply::Status(429));
        let backend = backend_for(&server);

        let request = CompletionRequest::new("gpt-4o", vec![ChatMessage::user("hi")], 1000, 0.7);
        let err = backend.complete(&request).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("429"));
        assert!(!message.contains("rate_limit_exceeded"));
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockCompletionServer::start().await;
        assert!(backend_for(&server).health_check().await);

        let unreachable =
            OpenAIBackend::new("http://127.0.0.1:1", None, Duration::from_secs(1)).unwrap();
        assert!(!unreachable.health_check().await);
    }
}
