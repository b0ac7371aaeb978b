//! HTTP API for chatting with uploaded PDFs.
//!
//! Each upload becomes a session: the PDF is extracted, chunked, embedded,
//! and indexed, and questions against the session are answered by the
//! document agent with the session's own conversation memory.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/sessions?name=<file>` | Upload a PDF (raw body), create a session |
//! | `GET`  | `/sessions/{id}` | Session info |
//! | `GET`  | `/sessions/{id}/pages/{page}` | Normalized page text and its chunks |
//! | `POST` | `/sessions/{id}/ask` | Ask a question: `{"query": "..."}` |
//! | `GET`  | `/sessions/{id}/memory` | Conversation so far |
//! | `DELETE` | `/sessions/{id}` | Drop the session |
//!
//! An `x-openai-key` header on upload overrides `OPENAI_API_KEY` for that
//! session.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `payload_too_large`
//! (413), `upstream` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use libran_core::memory::Turn;

use crate::agent::AgentError;
use crate::config::Config;
use crate::extract::ExtractError;
use crate::ingest::{fingerprint, ingest_pdf};
use crate::progress::NoProgress;
use crate::session::{ChatSession, PageView, Providers, SessionInfo, SessionStore};

pub const OPENAI_KEY_HEADER: &str = "x-openai-key";

const DEFAULT_DOCUMENT_NAME: &str = "document.pdf";

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<SessionStore>,
    /// Providers for uploads without an `x-openai-key` header. When `None`,
    /// they are built from config on each upload.
    pub providers: Option<Providers>,
}

impl AppState {
    pub fn new(config: Config, providers: Option<Providers>) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(SessionStore::new()),
            providers,
        }
    }

    fn providers_for(&self, api_key: Option<&str>) -> anyhow::Result<Providers> {
        match (api_key, &self.providers) {
            (None, Some(providers)) => Ok(providers.clone()),
            (key, _) => Providers::from_config(&self.config, key),
        }
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // One byte of slack so oversized uploads reach the handler and get the
    // JSON 413 body.
    let body_limit = state.config.ingest.max_pdf_bytes.saturating_add(1);

    Router::new()
        .route("/health", get(handle_health))
        .route("/sessions", post(handle_upload))
        .route(
            "/sessions/{id}",
            get(handle_session_info).delete(handle_delete),
        )
        .route("/sessions/{id}/pages/{page}", get(handle_page))
        .route("/sessions/{id}/ask", post(handle_ask))
        .route("/sessions/{id}/memory", get(handle_memory))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server.
///
/// Binds to the address configured in `[server].bind`. Runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let providers = match Providers::from_config(config, None) {
        Ok(providers) => Some(providers),
        Err(e) => {
            tracing::warn!(error = %e, "no default providers; uploads must send {}", OPENAI_KEY_HEADER);
            None
        }
    };
    let bind_addr = config.server.bind.clone();
    let app = router(AppState::new(config.clone(), providers));

    println!("libran server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn payload_too_large(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::PAYLOAD_TOO_LARGE,
        code: "payload_too_large",
        message: message.into(),
    }
}

fn upstream(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "upstream",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

/// Map an ingest failure: bad input is the client's fault, anything else
/// happened talking to the embedding provider.
fn classify_ingest_error(err: anyhow::Error) -> AppError {
    match err.downcast_ref::<ExtractError>() {
        Some(e @ ExtractError::TooLarge { .. }) => payload_too_large(e.to_string()),
        Some(e) => bad_request(e.to_string()),
        None => upstream(format!("{:#}", err)),
    }
}

impl From<AgentError> for AppError {
    fn from(err: AgentError) -> Self {
        upstream(err.to_string())
    }
}

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| bad_request(format!("invalid session id: {}", id)))
}

async fn find_session(
    state: &AppState,
    id: &str,
) -> Result<Arc<tokio::sync::Mutex<ChatSession>>, AppError> {
    let id = parse_id(id)?;
    state
        .store
        .get(&id)
        .await
        .ok_or_else(|| not_found(format!("no session with id: {}", id)))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /sessions ============

#[derive(Deserialize)]
struct UploadParams {
    name: Option<String>,
}

#[derive(Serialize)]
struct UploadResponse {
    id: Uuid,
    name: String,
    pages: usize,
    chunks: usize,
    /// True when an earlier upload of the same bytes was reused.
    reused: bool,
}

async fn handle_upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    if body.is_empty() {
        return Err(bad_request("request body must contain a PDF"));
    }
    let name = params
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DOCUMENT_NAME.to_string());
    let api_key = headers
        .get(OPENAI_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty());

    let providers = state
        .providers_for(api_key)
        .map_err(|e| bad_request(e.to_string()))?;

    let fp = fingerprint(&body);
    let (document, reused) = match state.store.find_document(&fp).await {
        Some(document) => (document, true),
        None => {
            let document = ingest_pdf(
                &name,
                &body,
                &state.config,
                providers.embedder.as_ref(),
                &NoProgress,
            )
            .await
            .map_err(classify_ingest_error)?;
            (Arc::new(document), false)
        }
    };

    let session = ChatSession::new(document, &providers, &state.config);
    let info = session.info();
    state.store.insert(session).await;
    tracing::info!(session = %info.id, name = %name, reused, "session created");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            id: info.id,
            name,
            pages: info.pages,
            chunks: info.chunks,
            reused,
        }),
    ))
}

// ============ GET /sessions/{id} ============

async fn handle_session_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionInfo>, AppError> {
    let session = find_session(&state, &id).await?;
    let info = session.lock().await.info();
    Ok(Json(info))
}

// ============ GET /sessions/{id}/pages/{page} ============

async fn handle_page(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, usize)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = find_session(&state, &id).await?;
    let session = session.lock().await;
    let view: PageView<'_> = session
        .page(page)
        .ok_or_else(|| not_found(format!("no page {} in document", page)))?;
    let value = serde_json::to_value(&view).map_err(|e| internal(e.to_string()))?;
    Ok(Json(value))
}

// ============ POST /sessions/{id}/ask ============

#[derive(Deserialize)]
struct AskRequest {
    query: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let session = find_session(&state, &id).await?;
    let answer = session.lock().await.ask(query).await?;
    Ok(Json(AskResponse { answer }))
}

// ============ GET /sessions/{id}/memory ============

#[derive(Serialize)]
struct MemoryResponse {
    turns: Vec<Turn>,
    buffer: String,
}

async fn handle_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MemoryResponse>, AppError> {
    let session = find_session(&state, &id).await?;
    let session = session.lock().await;
    Ok(Json(MemoryResponse {
        turns: session.memory().turns().to_vec(),
        buffer: session.memory().buffer(),
    }))
}

// ============ DELETE /sessions/{id} ============

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    if state.store.remove(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(format!("no session with id: {}", id)))
    }
}
