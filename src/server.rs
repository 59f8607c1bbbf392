//! HTTP server: the query endpoint and the account service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat/query` | Answer a question from the indexed document |
//! | `POST` | `/signup` | Create an account |
//! | `POST` | `/login` | Verify credentials, issue an access token |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses carry a single-field JSON body:
//!
//! ```json
//! { "detail": "Username or password is incorrect" }
//! ```
//!
//! Query failures are 500 with the underlying error message; account
//! validation failures are 400 with a fixed message and no internal
//! detail.
//!
//! # CORS
//!
//! Cross-origin access is restricted to the single origin configured in
//! `[server].cors_origin`.

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::accounts::{self, AccountError};
use crate::answer::AnswerEngine;
use crate::config::Config;
use crate::db;
use crate::embedding::{EmbeddingProvider, OpenAiEmbeddings};
use crate::index::prepare_index;
use crate::llm::{ChatModel, OpenAiChat};
use crate::migrate;

/// Shared application state, constructed once at startup and passed to
/// handlers via Axum's `State` extractor. Nothing here is initialized
/// at import time, and nothing mutates after startup except the account
/// store.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    engine: Arc<AnswerEngine>,
    pool: sqlx::SqlitePool,
}

impl AppState {
    /// Full startup routine against the hosted provider: load or build
    /// the vector index (per `rebuild` and artifact presence), connect
    /// the account store, and assemble the answer engine.
    ///
    /// Fails fatally, before any traffic is served, on a missing API
    /// key, a missing source document, or a corrupt index artifact.
    pub async fn initialize(config: Config, rebuild: bool) -> anyhow::Result<Self> {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OpenAiEmbeddings::new(&config.provider)?);
        let chat: Arc<dyn ChatModel> = Arc::new(OpenAiChat::new(&config.provider)?);
        Self::with_providers(config, embedder, chat, rebuild).await
    }

    /// Startup with injected providers. Tests assemble the state with
    /// fakes through this constructor.
    pub async fn with_providers(
        config: Config,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatModel>,
        rebuild: bool,
    ) -> anyhow::Result<Self> {
        let index = prepare_index(&config, embedder.as_ref(), rebuild).await?;

        let pool = db::connect(&config.accounts.db_path).await?;
        migrate::run_migrations(&pool).await?;

        let engine = AnswerEngine::new(
            Arc::new(index),
            embedder,
            chat,
            config.retrieval.clone(),
            config.answer.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            pool,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Build the application router with CORS restricted to the configured
/// origin.
pub fn router(state: AppState) -> anyhow::Result<Router> {
    let origin = state
        .config
        .server
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|_| anyhow::anyhow!("Invalid server.cors_origin: {}", state.config.server.cors_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .route("/chat/query", post(handle_query))
        .route("/signup", post(handle_signup))
        .route("/login", post(handle_login))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state))
}

/// Initialize state and serve until the process is terminated.
pub async fn run_server(config: Config, rebuild: bool) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState::initialize(config, rebuild).await?;
    let app = router(state)?;

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("askdoc listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// Error body matching the wire contract: `{"detail": "..."}`.
#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

struct AppError {
    status: StatusCode,
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}

/// 400 with a fixed, non-leaking message.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        detail: message.into(),
    }
}

/// 500 carrying the error's message as detail.
fn internal_error(err: impl std::fmt::Display) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        detail: err.to_string(),
    }
}

fn account_error(err: AccountError) -> AppError {
    match err {
        AccountError::Conflict | AccountError::InvalidCredentials => bad_request(err.to_string()),
        AccountError::Internal(e) => internal_error(e),
    }
}

// ============ POST /chat/query ============

#[derive(Deserialize)]
struct QueryRequest {
    question: String,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
}

/// Handler for `POST /chat/query`.
///
/// Any failure of the synthesis path (retrieval, embedding, or the
/// chat call) is converted into a 500 carrying the error message.
async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let answer = state
        .engine
        .answer(&request.question)
        .await
        .map_err(internal_error)?;

    Ok(Json(QueryResponse { answer }))
}

// ============ POST /signup ============

#[derive(Deserialize)]
struct SignupRequest {
    username: String,
    email: String,
    password: String,
}

#[derive(Serialize)]
struct SignupResponse {
    msg: String,
}

async fn handle_signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<SignupResponse>, AppError> {
    accounts::signup(
        &state.pool,
        &request.username,
        &request.email,
        &request.password,
    )
    .await
    .map_err(account_error)?;

    Ok(Json(SignupResponse {
        msg: "User created successfully".to_string(),
    }))
}

// ============ POST /login ============

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    access_token: String,
    username: String,
}

async fn handle_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let outcome = accounts::login(
        &state.pool,
        &state.config.auth,
        &request.username,
        &request.password,
    )
    .await
    .map_err(account_error)?;

    Ok(Json(LoginResponse {
        access_token: outcome.access_token,
        username: outcome.username,
    }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
