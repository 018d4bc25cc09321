//! Tally Web Server
//!
//! Axum-based REST API for the Tally financial advisor.
//!
//! The server owns the credential store and the shared snapshot. Linking a
//! new institution appends a credential and runs a full aggregation pass
//! before answering; the advisor endpoints read whatever snapshot is current.
//!
//! Security features:
//! - Restrictive CORS policy
//! - Security headers on every response
//! - Sanitized error responses (credentials and provider payloads never leave the process)

use std::path::Path;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use tally_core::{Advisor, Aggregator, CompletionBackend, Credential, CredentialStore, SnapshotCell};

mod handlers;

/// Default listen port
pub const DEFAULT_PORT: u16 = 5001;

/// Maximum JSON request body size (64 KB; chat histories are the largest bodies)
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    /// Latest aggregated snapshot
    pub snapshot: SnapshotCell,
    /// Linked credentials; the lock is held only while reading or appending
    pub credentials: Mutex<CredentialStore>,
    pub aggregator: Aggregator,
    /// `None` when no model backend is configured; chat then apologises and
    /// insights come back empty
    pub advisor: Option<Advisor>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(
        credentials: CredentialStore,
        aggregator: Aggregator,
        advisor: Option<Advisor>,
        config: ServerConfig,
    ) -> Self {
        Self {
            snapshot: SnapshotCell::new(),
            credentials: Mutex::new(credentials),
            aggregator,
            advisor,
            config,
        }
    }

    /// Copy of the current credential list
    pub async fn credential_list(&self) -> Vec<Credential> {
        self.credentials.lock().await.credentials().to_vec()
    }

    /// Aggregate every stored credential and publish the result
    pub async fn refresh(&self) -> Arc<tally_core::Snapshot> {
        let credentials = self.credential_list().await;
        self.snapshot.refresh(&self.aggregator, &credentials).await
    }
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, static_dir: Option<&str>) -> Router {
    let api_routes = Router::new()
        // Linking
        .route("/create-link-session", post(handlers::create_link_session))
        .route("/exchange-link-token", post(handlers::exchange_link_token))
        // Snapshot
        .route("/financial-snapshot", get(handlers::get_financial_snapshot))
        .route("/refresh-snapshot", post(handlers::refresh_snapshot))
        // Advisor
        .route("/advisor/chat", post(handlers::advisor_chat))
        .route("/advisor/insights", get(handlers::get_insights))
        .route("/advisor/models", get(handlers::list_models))
        // Health
        .route("/health", get(handlers::health));

    let config = &state.config;

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    // CSP: the linking widget is loaded from the provider's CDN and talks to it
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self' https://cdn.plaid.com; style-src 'self' 'unsafe-inline'; img-src 'self' blob: data:; font-src 'self'; connect-src 'self' https://*.plaid.com; frame-src https://cdn.plaid.com; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve the front-end; unknown paths get index.html for client-side routing
    if let Some(dir) = static_dir {
        let index = Path::new(dir).join("index.html");
        app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    app
}

/// Start the server
///
/// When credentials were restored from disk, one aggregation pass runs in
/// the background so the first snapshot request finds data.
pub async fn serve(
    state: AppState,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    check_ai_connection(state.advisor.as_ref()).await;

    let state = Arc::new(state);

    let stored = state.credentials.lock().await.len();
    if stored > 0 {
        info!("Restoring financial data for {} saved connection(s)", stored);
        let restore = state.clone();
        tokio::spawn(async move {
            let snapshot = restore.refresh().await;
            info!(
                "Restored {} account(s), {} transaction(s)",
                snapshot.accounts.len(),
                snapshot.transactions.len()
            );
        });
    }

    let app = create_router(state, static_dir);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log model backend connection status
async fn check_ai_connection(advisor: Option<&Advisor>) {
    match advisor {
        Some(advisor) => {
            let backend = advisor.backend();
            let config = advisor.config();
            if backend.health_check().await {
                info!(
                    "✅ AI backend connected: {} (default: {}, fallback: {})",
                    backend.host(),
                    config.default_model,
                    config.fallback_model
                );
            } else {
                warn!(
                    "⚠️  AI backend configured but not responding: {} (default: {})",
                    backend.host(),
                    config.default_model
                );
            }
        }
        None => {
            info!("ℹ️  AI backend not configured (set OPENAI_API_KEY to enable the advisor)");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// 500 with a fixed client message; `err` is only logged
    pub fn internal_with(msg: &str, err: impl Into<anyhow::Error>) -> Self {
        Self {
            internal: Some(err.into()),
            ..Self::internal(msg)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            internal: Some(err.into()),
        }
    }
}
