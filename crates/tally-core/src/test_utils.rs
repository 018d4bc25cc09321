//! Test utilities for tally-core
//!
//! Mock HTTP servers that speak just enough of the Plaid and OpenAI chat
//! completions APIs for unit and integration tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// Access token the mock Plaid server rejects
pub const INVALID_ACCESS_TOKEN: &str = "access-invalid-token";

/// Handle to a server spawned on an ephemeral port
struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ServerHandle {
    async fn spawn(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Plaid ───────────────────────────────────────────────────────────────────

/// Mock Plaid server
///
/// Serves one sandbox item for any access token except
/// [`INVALID_ACCESS_TOKEN`]: two accounts (checking and a credit card with a
/// 5000 limit) at institution `ins_1` ("First Platypus Bank") and three
/// transactions in Q1 2024, paged according to the request's count/offset.
pub struct MockPlaidServer {
    handle: ServerHandle,
}

impl MockPlaidServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/link/token/create", post(plaid_link_token))
            .route("/item/public_token/exchange", post(plaid_exchange))
            .route("/accounts/get", post(plaid_accounts))
            .route("/item/get", post(plaid_item))
            .route("/institutions/get_by_id", post(plaid_institution))
            .route("/transactions/get", post(plaid_transactions));

        Self {
            handle: ServerHandle::spawn(app).await,
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        self.handle.url()
    }
}

#[derive(Debug, Deserialize)]
struct PlaidTokenBody {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    public_token: String,
    #[serde(default)]
    institution_id: String,
    #[serde(default)]
    options: Option<PlaidPageOptions>,
}

#[derive(Debug, Deserialize)]
struct PlaidPageOptions {
    count: usize,
    offset: usize,
}

fn plaid_error(error_type: &str, error_code: &str, message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error_type": error_type,
            "error_code": error_code,
            "error_message": message,
            "display_message": null,
            "request_id": "mock-request",
        })),
    )
        .into_response()
}

fn invalid_token() -> Response {
    plaid_error(
        "INVALID_INPUT",
        "INVALID_ACCESS_TOKEN",
        "provided access token is in an invalid format",
    )
}

async fn plaid_link_token() -> Json<Value> {
    Json(json!({
        "link_token": "link-sandbox-00000000-0000-0000-0000-000000000000",
        "expiration": "2024-01-01T04:00:00Z",
        "request_id": "mock-request",
    }))
}

async fn plaid_exchange(Json(body): Json<PlaidTokenBody>) -> Response {
    match body.public_token.strip_prefix("public-") {
        Some(rest) if !rest.is_empty() => Json(json!({
            "access_token": format!("access-{}", rest),
            "item_id": "item-1",
            "request_id": "mock-request",
        }))
        .into_response(),
        _ => plaid_error(
            "INVALID_INPUT",
            "INVALID_PUBLIC_TOKEN",
            "provided public token is in an invalid format",
        ),
    }
}

async fn plaid_accounts(Json(body): Json<PlaidTokenBody>) -> Response {
    if body.access_token == INVALID_ACCESS_TOKEN {
        return invalid_token();
    }
    Json(json!({
        "accounts": [
            {
                "account_id": "acc-checking",
                "name": "Plaid Checking",
                "official_name": "Plaid Gold Standard 0% Interest Checking",
                "type": "depository",
                "subtype": "checking",
                "mask": "0000",
                "balances": {"current": 110.0, "available": 100.0, "limit": null, "iso_currency_code": "USD"}
            },
            {
                "account_id": "acc-credit",
                "name": "Plaid Credit Card",
                "official_name": "Plaid Diamond 12.5% APR Interest Credit Card",
                "type": "credit",
                "subtype": "credit card",
                "mask": "3333",
                "balances": {"current": 410.0, "available": null, "limit": 5000.0, "iso_currency_code": "USD"}
            }
        ],
        "request_id": "mock-request",
    }))
    .into_response()
}

async fn plaid_item(Json(body): Json<PlaidTokenBody>) -> Response {
    if body.access_token == INVALID_ACCESS_TOKEN {
        return invalid_token();
    }
    Json(json!({
        "item": {"item_id": "item-1", "institution_id": "ins_1"},
        "request_id": "mock-request",
    }))
    .into_response()
}

async fn plaid_institution(Json(body): Json<PlaidTokenBody>) -> Response {
    if body.institution_id != "ins_1" {
        return plaid_error(
            "INVALID_INPUT",
            "INVALID_INSTITUTION",
            "invalid institution_id provided",
        );
    }
    Json(json!({
        "institution": {"institution_id": "ins_1", "name": "First Platypus Bank"},
        "request_id": "mock-request",
    }))
    .into_response()
}

fn plaid_fixture_transactions() -> Vec<Value> {
    vec![
        json!({
            "transaction_id": "tx-3",
            "account_id": "acc-credit",
            "date": "2024-03-10",
            "name": "Uber 063015 SF**POOL**",
            "merchant_name": "Uber",
            "amount": 5.4,
            "category": ["Travel", "Taxi"],
            "personal_finance_category": {"primary": "TRANSPORTATION", "detailed": "TRANSPORTATION_TAXIS_AND_RIDE_SHARES"},
            "pending": false
        }),
        json!({
            "transaction_id": "tx-2",
            "account_id": "acc-checking",
            "date": "2024-02-15",
            "name": "INTRST PYMNT",
            "merchant_name": null,
            "amount": -4.22,
            "category": ["Transfer", "Credit"],
            "personal_finance_category": null,
            "pending": false
        }),
        json!({
            "transaction_id": "tx-1",
            "account_id": "acc-credit",
            "date": "2024-01-05",
            "name": "McDonald's",
            "merchant_name": "McDonald's",
            "amount": 12.0,
            "category": null,
            "personal_finance_category": {"primary": "FOOD_AND_DRINK"},
            "pending": false
        }),
    ]
}

async fn plaid_transactions(Json(body): Json<PlaidTokenBody>) -> Response {
    if body.access_token == INVALID_ACCESS_TOKEN {
        return invalid_token();
    }
    let all = plaid_fixture_transactions();
    let total = all.len();
    let (count, offset) = body
        .options
        .map(|o| (o.count, o.offset))
        .unwrap_or((100, 0));
    let page: Vec<Value> = all.into_iter().skip(offset).take(count).collect();

    Json(json!({
        "accounts": [],
        "transactions": page,
        "total_transactions": total,
        "request_id": "mock-request",
    }))
    .into_response()
}

// ── Chat completions ────────────────────────────────────────────────────────

/// Scripted reply for one model on the mock completion server
#[derive(Debug, Clone)]
pub enum MockCompletionReply {
    /// Reply with this content
    Text(String),
    /// Reply with `"content": null`
    Null,
    /// Fail with this HTTP status and an OpenAI-style error body
    Status(u16),
}

#[derive(Default)]
struct CompletionState {
    replies: Mutex<HashMap<String, MockCompletionReply>>,
    requests: Mutex<Vec<Value>>,
}

/// Mock OpenAI chat completions server
///
/// Records every request body. Models without a scripted reply answer with
/// `Mock reply from <model>`.
pub struct MockCompletionServer {
    handle: ServerHandle,
    state: Arc<CompletionState>,
}

impl MockCompletionServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = Arc::new(CompletionState::default());
        let app = Router::new()
            .route("/v1/models", get(completion_models))
            .route("/v1/chat/completions", post(completion_chat))
            .with_state(state.clone());

        Self {
            handle: ServerHandle::spawn(app).await,
            state,
        }
    }

    /// Script the reply for one model
    pub fn with_reply(self, model: &str, reply: MockCompletionReply) -> Self {
        self.state
            .replies
            .lock()
            .unwrap()
            .insert(model.to_string(), reply);
        self
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        self.handle.url()
    }

    /// Request bodies received so far, in order
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn completion_models() -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [{"id": "gpt-4o", "object": "model"}],
    }))
}

async fn completion_chat(
    State(state): State<Arc<CompletionState>>,
    Json(body): Json<Value>,
) -> Response {
    let model = body["model"].as_str().unwrap_or_default().to_string();
    state.requests.lock().unwrap().push(body);

    let reply = state.replies.lock().unwrap().get(&model).cloned();
    let content = match reply {
        Some(MockCompletionReply::Status(code)) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (
                status,
                Json(json!({
                    "error": {
                        "message": "Rate limit reached for requests",
                        "type": "rate_limit_exceeded",
                        "code": "rate_limit_exceeded"
                    }
                })),
            )
                .into_response();
        }
        Some(MockCompletionReply::Null) => Value::Null,
        Some(MockCompletionReply::Text(text)) => Value::String(text),
        None => Value::String(format!("Mock reply from {}", model)),
    };

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
    }))
    .into_response()
}
