//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/query` | Full RAG answer with sources |
//! | `POST` | `/api/retrieve` | Retrieval and context only, no LLM |
//! | `GET`  | `/api/health` | Index reachability and vector count |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `missing_api_key` (400),
//! `retrieval_error` (500), `retrieval_timeout` (500), `llm_error` (502).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted for browser clients.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use medassist_core::models::RetrievedResult;
use medassist_core::retrieve::RetrievalError;

use crate::config::Config;
use crate::generate::GenerateError;
use crate::pipeline::{PipelineError, RagPipeline};

#[derive(Clone)]
struct AppState {
    pipeline: Arc<RagPipeline>,
}

/// Build the router over a ready pipeline.
pub fn router(pipeline: Arc<RagPipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/query", post(handle_query))
        .route("/api/retrieve", post(handle_retrieve))
        .route("/api/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { pipeline })
}

/// Serve on an already-bound listener until the process ends.
pub async fn serve(listener: tokio::net::TcpListener, pipeline: Arc<RagPipeline>) -> anyhow::Result<()> {
    axum::serve(listener, router(pipeline)).await?;
    Ok(())
}

/// Bind `[server].bind` and serve.
pub async fn run_server(config: &Config, pipeline: Arc<RagPipeline>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "server listening");
    println!("MedAssist listening on http://{}", config.server.bind);
    serve(listener, pipeline).await
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
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

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        tracing::error!(error = %err, "retrieval failed");
        let code = match err {
            RetrievalError::Timeout { .. } => "retrieval_timeout",
            _ => "retrieval_error",
        };
        AppError::new(StatusCode::INTERNAL_SERVER_ERROR, code, err.to_string())
    }
}

impl From<GenerateError> for AppError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::MissingApiKey(_) => {
                AppError::new(StatusCode::BAD_REQUEST, "missing_api_key", err.to_string())
            }
            other => {
                tracing::error!(error = %other, "generation failed");
                AppError::new(StatusCode::BAD_GATEWAY, "llm_error", other.to_string())
            }
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Retrieval(e) => e.into(),
            PipelineError::Generation(e) => e.into(),
        }
    }
}

fn non_empty(question: &str) -> Result<&str, AppError> {
    let q = question.trim();
    if q.is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "bad_request",
            "question must not be empty",
        ));
    }
    Ok(q)
}

// ============ POST /api/query ============

#[derive(Deserialize)]
struct QueryRequest {
    question: String,
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
    sources: Vec<RetrievedResult>,
    question: String,
}

async fn handle_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let question = non_empty(&req.question)?;
    let answer = state
        .pipeline
        .query(question, req.api_key.as_deref())
        .await?;

    Ok(Json(QueryResponse {
        answer: answer.answer,
        sources: answer.sources,
        question: answer.question,
    }))
}

// ============ POST /api/retrieve ============

#[derive(Deserialize)]
struct RetrieveRequest {
    question: String,
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct RetrieveResponse {
    results: Vec<RetrievedResult>,
    context: String,
}

async fn handle_retrieve(
    State(state): State<AppState>,
    Json(req): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, AppError> {
    let question = non_empty(&req.question)?;
    let (results, context) = state.pipeline.retrieve_only(question, req.top_k).await?;
    Ok(Json(RetrieveResponse { results, context }))
}

// ============ GET /api/health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    index_connected: bool,
    vectors: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    version: &'static str,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let version = env!("CARGO_PKG_VERSION");
    match state.pipeline.retriever().index().count().await {
        Ok(n) => Json(HealthResponse {
            status: "healthy",
            index_connected: true,
            vectors: Some(n),
            error: None,
            version,
        }),
        Err(e) => Json(HealthResponse {
            status: "degraded",
            index_connected: false,
            vectors: None,
            error: Some(e.to_string()),
            version,
        }),
    }
}
