//! Institution linking handlers

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::read_json;
use crate::{AppError, AppState, SuccessResponse};
use tally_core::LinkProvider;

/// Response for link session creation
#[derive(Debug, Serialize)]
pub struct LinkSessionResponse {
    pub link_token: String,
}

/// Request body for token exchange
#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    /// Public token handed back by the linking widget
    #[serde(default, alias = "publicHandle")]
    pub public_token: Option<String>,
}

/// POST /api/create-link-session - Create a short-lived link token
pub async fn create_link_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LinkSessionResponse>, AppError> {
    let link_token = state
        .aggregator
        .provider()
        .create_link_token()
        .await
        .map_err(|e| AppError::internal_with("Failed to create link token", e))?;

    Ok(Json(LinkSessionResponse { link_token }))
}

/// POST /api/exchange-link-token - Exchange a public token and aggregate
///
/// Stores the resulting credential, then runs a full aggregation pass before
/// responding so the next snapshot read includes the new institution.
pub async fn exchange_link_token(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let req: ExchangeRequest = read_json(request).await?;

    let public_token = req
        .public_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::bad_request("public_token is required"))?;

    let credential = state
        .aggregator
        .provider()
        .exchange_public_token(public_token)
        .await
        .map_err(|e| AppError::internal_with("Failed to exchange token", e))?;

    let added = state.credentials.lock().await.append(credential);
    info!(added, "Linked institution, refreshing snapshot");

    let snapshot = state.refresh().await;
    info!(
        accounts = snapshot.accounts.len(),
        transactions = snapshot.transactions.len(),
        "Snapshot refreshed after linking"
    );

    Ok(Json(SuccessResponse { success: true }))
}
