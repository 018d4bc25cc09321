//! Advisor handlers (chat, insights, model catalog)

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::read_json;
use crate::{AppError, AppState};
use tally_core::{ChatMessage, Insight, ModelInfo, APOLOGY_MESSAGE};

/// Request body for a chat turn
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Conversation so far, oldest first
    pub messages: Vec<ChatMessage>,
    /// Preferred model id
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub insights: Vec<Insight>,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

/// POST /api/advisor/chat - Answer the latest turn
///
/// Model failures never surface as errors: the reply degrades to a fixed
/// apology message.
pub async fn advisor_chat(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<ChatResponse>, AppError> {
    let req: ChatRequest = read_json(request).await?;

    let message = match &state.advisor {
        Some(advisor) => {
            let snapshot = state.snapshot.current();
            advisor
                .chat(
                    &snapshot,
                    &req.messages,
                    req.model.as_deref(),
                    Utc::now().date_naive(),
                )
                .await
        }
        None => ChatMessage::assistant(APOLOGY_MESSAGE),
    };

    Ok(Json(ChatResponse { message }))
}

/// GET /api/advisor/insights - Four insights for the dashboard, or none
pub async fn get_insights(State(state): State<Arc<AppState>>) -> Json<InsightsResponse> {
    let insights = match &state.advisor {
        Some(advisor) => {
            let snapshot = state.snapshot.current();
            advisor
                .generate_insights(&snapshot, Utc::now().date_naive())
                .await
        }
        None => Vec::new(),
    };

    Json(InsightsResponse { insights })
}

/// GET /api/advisor/models - Selectable chat models
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let models = state
        .advisor
        .as_ref()
        .map(|a| a.models().to_vec())
        .unwrap_or_default();

    Json(ModelsResponse { models })
}
