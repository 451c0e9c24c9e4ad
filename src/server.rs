//! HTTP surface for the search service.
//!
//! Routes:
//! - `GET  /health`
//! - `POST /search`           `{query, match_count?}` → `[EnrichedResult]`
//! - `GET  /pages/{issue_id}` → `[PageEntry]`
//! - `POST /warm-namespace`   → `{status, message}`

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::SearchError;
use crate::provider::WarmStatus;
use crate::search::{EnrichedResult, PageEntry, SearchService};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
}

/// Error returned by handlers, rendered as `{"error": "message"}`.
#[derive(Debug)]
pub enum ApiError {
    /// Invalid request parameters (400).
    BadRequest { message: String, field: Option<String> },
    /// Unexpected server error (500). Carries a fixed per-route message;
    /// the underlying error is only logged.
    Internal(&'static str),
}

const SEARCH_FAILED: &str = "Failed to search pages";
const PAGES_FAILED: &str = "Failed to fetch pages";
const WARM_FAILED: &str = "Failed to warm namespace cache";

impl ApiError {
    /// Validation failures pass through; anything else is logged and
    /// reported as `public_message`.
    fn from_search(error: SearchError, public_message: &'static str) -> Self {
        match error {
            SearchError::Validation { message, field } => ApiError::BadRequest { message, field },
            other => {
                tracing::error!(error = %other, "Request failed");
                ApiError::Internal(public_message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest { message, field } => {
                let mut body = json!({ "error": message });
                if let Some(f) = field {
                    body["field"] = json!(f);
                }
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": message }))).into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub match_count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", post(search))
        .route("/pages/{issue_id}", get(list_pages))
        .route("/warm-namespace", post(warm_namespace))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<Vec<EnrichedResult>>, ApiError> {
    tracing::info!(match_count = ?req.match_count, "POST /search");

    let match_count = state
        .service
        .match_count(req.match_count)
        .map_err(|e| ApiError::from_search(e, SEARCH_FAILED))?;

    let results = state
        .service
        .search_text(&req.query, match_count)
        .await
        .map_err(|e| ApiError::from_search(e, SEARCH_FAILED))?;
    Ok(Json(results))
}

async fn list_pages(
    State(state): State<AppState>,
    Path(issue_id): Path<String>,
) -> Result<Json<Vec<PageEntry>>, ApiError> {
    tracing::info!(issue_id = %issue_id, "GET /pages");

    let pages = state
        .service
        .list_pages(&issue_id)
        .await
        .map_err(|e| ApiError::from_search(e, PAGES_FAILED))?;
    Ok(Json(pages))
}

async fn warm_namespace(State(state): State<AppState>) -> Result<Json<WarmStatus>, ApiError> {
    tracing::info!("POST /warm-namespace");

    let status = state
        .service
        .warm()
        .await
        .map_err(|e| ApiError::from_search(e, WARM_FAILED))?;
    Ok(Json(status))
}
