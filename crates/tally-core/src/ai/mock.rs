//! Mock backend for testing
//!
//! Replies are scripted per model. Every request is recorded so tests can
//! assert on call order and request shape. Also used when running the server
//! with `AI_BACKEND=mock`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::Role;

use super::types::CompletionRequest;
use super::CompletionBackend;

/// Scripted outcome for one model
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Return this text
    Text(String),
    /// Return an empty completion
    Empty,
    /// Fail the call
    Fail,
}

/// Insights returned when nothing is scripted for an insight request
const CANNED_INSIGHTS: &str = r#"[
  {"title": "Dining is your top category", "description": "Food and drink led your spending this month. A weekly meal plan could trim it.", "type": "tip"},
  {"title": "Healthy savings cushion", "description": "Your savings balance covers several months of spending.", "type": "positive"},
  {"title": "Card balance to watch", "description": "Paying the card in full each month avoids interest charges.", "type": "warning"},
  {"title": "Automate a transfer", "description": "Schedule a recurring transfer to savings right after payday.", "type": "action"}
]"#;

/// Mock AI backend for testing
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    replies: Arc<HashMap<String, MockReply>>,
    default_reply: Option<MockReply>,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            replies: Arc::default(),
            default_reply: None,
            calls: Arc::default(),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// A backend whose every call fails
    pub fn failing() -> Self {
        Self::new().with_default(MockReply::Fail)
    }

    /// Script the reply for one model
    pub fn with_reply(mut self, model: &str, reply: MockReply) -> Self {
        Arc::make_mut(&mut self.replies).insert(model.to_string(), reply);
        self
    }

    /// Reply for models with no script of their own
    pub fn with_default(mut self, reply: MockReply) -> Self {
        self.default_reply = Some(reply);
        self
    }

    /// Every request received so far, in order
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Model ids of every request received so far, in order
    pub fn called_models(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.model).collect()
    }

    fn unscripted_reply(request: &CompletionRequest) -> String {
        let wants_json = request
            .system_prompt()
            .map(|p| p.contains("JSON array"))
            .unwrap_or(false);
        if wants_json {
            return CANNED_INSIGHTS.to_string();
        }

        let question = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");
        format!("[{}] Mock advisor reply to: {}", request.model, question)
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }

        let reply = self
            .replies
            .get(&request.model)
            .or(self.default_reply.as_ref());

        match reply {
            Some(MockReply::Text(text)) => Ok(text.clone()),
            Some(MockReply::Empty) => Ok(String::new()),
            Some(MockReply::Fail) => Err(Error::Backend(format!(
                "Mock failure for {}",
                request.model
            ))),
            None => Ok(Self::unscripted_reply(request)),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn host(&self) -> &str {
        "mock"
    }
}
