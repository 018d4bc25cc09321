//! Pluggable chat completion backend abstraction
//!
//! # Architecture
//!
//! - `CompletionBackend` trait: one chat completion call plus a health check
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAIBackend`, `MockBackend`
//! - `types`: `CompletionRequest` and the per-family `SamplingParams`
//! - `parsing`: best-effort decoding of structured model output
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (openai, mock). Default: openai
//! - `OPENAI_API_KEY`: API key (required for openai backend)
//! - `OPENAI_BASE_URL`: Server URL (default: https://api.openai.com)

mod mock;
mod openai;
pub mod parsing;
pub mod types;

pub use mock::{MockBackend, MockReply};
pub use openai::{OpenAIBackend, DEFAULT_BASE_URL};
pub use types::{CompletionRequest, ModelFamily, SamplingParams};

use async_trait::async_trait;

use crate::error::Result;

/// Interface to a chat completion service
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Run one completion and return the generated text
    ///
    /// An empty string is a valid (empty) reply, not an error.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
#[derive(Clone)]
pub enum AIClient {
    /// OpenAI or any server implementing its chat completions API
    OpenAI(OpenAIBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use:
    /// - `openai` (default): Uses OPENAI_API_KEY and OPENAI_BASE_URL
    /// - `mock`: Creates a mock backend with canned replies
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "openai".to_string());

        match backend.to_lowercase().as_str() {
            "openai" | "openai_compatible" => OpenAIBackend::from_env().map(AIClient::OpenAI),
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to openai");
                OpenAIBackend::from_env().map(AIClient::OpenAI)
            }
        }
    }

    /// Create a mock backend for testing
    pub fn mock(backend: MockBackend) -> Self {
        AIClient::Mock(backend)
    }

    /// Backend kind (for logging and health output)
    pub fn kind(&self) -> &'static str {
        match self {
            AIClient::OpenAI(_) => "openai",
            AIClient::Mock(_) => "mock",
        }
    }
}

#[async_trait]
impl CompletionBackend for AIClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        match self {
            AIClient::OpenAI(b) => b.complete(request).await,
            AIClient::Mock(b) => b.complete(request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::OpenAI(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAI(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
