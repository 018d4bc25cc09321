//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod advisor;
pub mod link;
pub mod snapshot;

// Re-export all handlers for use in router
pub use advisor::*;
pub use link::*;
pub use snapshot::*;

use axum::extract::Request;
use serde::de::DeserializeOwned;

use crate::{AppError, MAX_BODY_SIZE};

/// Read and decode a JSON request body
pub(crate) async fn read_json<T: DeserializeOwned>(request: Request) -> Result<T, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_SIZE)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))
}
