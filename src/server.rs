//! HTTP server.
//!
//! Exposes ingestion and retrieval via a JSON HTTP API. One [`Engine`] is
//! opened at start-up and shared by every handler.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/embed` | Store one text, returns its id (201) |
//! | `POST` | `/search` | k nearest stored texts |
//! | `GET`  | `/texts` | Every record, newest first |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `provider_error` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use chunkvec_core::models::VectorRecord;
use chunkvec_core::search::{query, QueryResponse};
use chunkvec_core::Error;

use crate::config::Config;
use crate::engine::Engine;
use crate::ingest::Ingestor;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    engine: Engine,
    ingestor: Arc<Ingestor>,
    default_k: i64,
}

/// Starts the HTTP server.
///
/// Opens the configured store, binds to `[server].bind` and serves until
/// the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let engine = Engine::open(config).await?;
    let bind_addr = config.server.bind.clone();
    let app = router(engine)?;

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "server listening");
    println!("chunkvec server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router over an opened engine.
pub fn router(engine: Engine) -> anyhow::Result<Router> {
    let state = AppState {
        default_k: engine.config.retrieval.default_k,
        ingestor: Arc::new(Ingestor::from_engine(&engine)?),
        engine,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .route("/health", get(handle_health))
        .route("/embed", post(handle_embed))
        .route("/search", post(handle_search))
        .route("/texts", get(handle_texts))
        .layer(cors)
        .with_state(state))
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
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

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        if err.is_validation() {
            return bad_request(err.to_string());
        }
        match err {
            Error::ProviderError(_) => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "provider_error",
                message: err.to_string(),
            },
            other => {
                error!(error = %other, "request failed");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal",
                    message: other.to_string(),
                }
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ POST /embed ============

#[derive(Deserialize)]
struct EmbedRequest {
    text: String,
}

#[derive(Serialize)]
struct EmbedResponse {
    message: &'static str,
    text: String,
    embedding_id: i64,
    embedding_dimension: usize,
}

async fn handle_embed(
    State(state): State<AppState>,
    body: Result<Json<EmbedRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EmbedResponse>), AppError> {
    let Json(req) = body?;
    let id = state.ingestor.ingest_text(&req.text).await?;

    Ok((
        StatusCode::CREATED,
        Json(EmbedResponse {
            message: "Embedding created and stored successfully",
            text: req.text,
            embedding_id: id,
            embedding_dimension: state.engine.embedder.dims(),
        }),
    ))
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    text: String,
    #[serde(default)]
    k: Option<i64>,
}

async fn handle_search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(req) = body?;
    let k = req.k.unwrap_or(state.default_k);
    let response = query(
        state.engine.store.as_ref(),
        state.engine.embedder.as_ref(),
        &req.text,
        k,
    )
    .await?;
    Ok(Json(response))
}

// ============ GET /texts ============

#[derive(Serialize)]
struct TextsResponse {
    texts: Vec<VectorRecord>,
    count: usize,
}

async fn handle_texts(State(state): State<AppState>) -> Result<Json<TextsResponse>, AppError> {
    let texts = state.engine.store.list_all().await?;
    Ok(Json(TextsResponse {
        count: texts.len(),
        texts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(AppError::from(Error::EmptyQuery).status, StatusCode::BAD_REQUEST);
        assert_eq!(AppError::from(Error::InvalidK(0)).status, StatusCode::BAD_REQUEST);
        let provider = AppError::from(Error::ProviderError("down".into()));
        assert_eq!(provider.status, StatusCode::BAD_GATEWAY);
        assert_eq!(provider.code, "provider_error");
        let storage = AppError::from(Error::StorageIo("disk".into()));
        assert_eq!(storage.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(storage.code, "internal");
    }
}
