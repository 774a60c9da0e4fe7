//! REST surface over the aggregator.
//!
//! - `POST /search` with `{query, num_results?, engines?}` returns a JSON
//!   array of results.
//! - `GET /engines` lists the enabled engine names.
//! - `GET /health` returns `{"status":"ok"}`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::query::DEFAULT_NUM_RESULTS;
use crate::{Aggregator, Result, SearchError, SearchQuery, SearchResult};

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<Aggregator>,
    default_num_results: usize,
}

impl AppState {
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            default_num_results: DEFAULT_NUM_RESULTS,
        }
    }

    /// Result count used when a request omits `num_results`.
    pub fn with_default_num_results(mut self, num_results: usize) -> Self {
        self.default_num_results = num_results.max(1);
        self
    }
}

/// Body of `POST /search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub num_results: Option<usize>,
    #[serde(default)]
    pub engines: Option<Vec<String>>,
    #[serde(default)]
    pub include_domains: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_domains: Option<Vec<String>>,
}

impl SearchRequest {
    fn into_query(self, default_num_results: usize) -> SearchQuery {
        SearchQuery::new(self.query)
            .with_num_results(self.num_results.unwrap_or(default_num_results))
            .with_engines(self.engines.unwrap_or_default())
            .with_include_domains(self.include_domains.unwrap_or_default())
            .with_exclude_domains(self.exclude_domains.unwrap_or_default())
    }
}

/// Error response rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        let status = match err {
            SearchError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct EngineList {
    pub engines: Vec<String>,
}

/// Builds the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/search", post(handle_search))
        .route("/engines", get(handle_engines))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Binds `host:port` and serves until the process is stopped.
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let listener = TcpListener::bind((host, port))
        .await
        .map_err(|e| SearchError::Other(format!("Failed to bind {host}:{port}: {e}")))?;
    let addr = listener
        .local_addr()
        .map_err(|e| SearchError::Other(e.to_string()))?;
    info!(%addr, "REST service listening");
    axum::serve(listener, router(state))
        .await
        .map_err(|e| SearchError::Other(format!("Server error: {e}")))
}

pub async fn handle_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> std::result::Result<Json<Vec<SearchResult>>, ApiError> {
    let query = request.into_query(state.default_num_results);
    if query.is_blank() {
        return Err(SearchError::InvalidQuery("query must not be empty".into()).into());
    }
    if state.aggregator.select_engines(&query).is_empty() {
        return Err(SearchError::NoEngines.into());
    }

    match state.aggregator.search(&query).await {
        Ok(results) => Ok(Json(results)),
        Err(e) => {
            error!(error = %e, "Search failed");
            Err(e.into())
        }
    }
}

pub async fn handle_engines(State(state): State<AppState>) -> Json<EngineList> {
    Json(EngineList {
        engines: state.aggregator.engine_names(),
    })
}

pub async fn handle_health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
