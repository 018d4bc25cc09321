//! Snapshot and health handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use tally_core::Snapshot;

/// Response for the health check
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Number of linked connections
    pub credentials: usize,
    pub accounts: usize,
    pub refreshing: bool,
    /// Model backend kind, `null` when unconfigured
    pub advisor: Option<&'static str>,
}

/// GET /api/financial-snapshot - Current snapshot
pub async fn get_financial_snapshot(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json(state.snapshot.current().as_ref().clone())
}

/// POST /api/refresh-snapshot - Re-aggregate all connections
///
/// Failing connections are skipped inside the pass, so this always answers
/// with a snapshot.
pub async fn refresh_snapshot(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    let snapshot = state.refresh().await;
    Json(snapshot.as_ref().clone())
}

/// GET /api/health - Liveness and a few counters
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let credentials = state.credentials.lock().await.len();

    Json(HealthResponse {
        status: "ok",
        credentials,
        accounts: state.snapshot.current().accounts.len(),
        refreshing: state.snapshot.is_refreshing(),
        advisor: state.advisor.as_ref().map(|a| a.backend().kind()),
    })
}
