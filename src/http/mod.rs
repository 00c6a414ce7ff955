//! HTTP transports.
//!
//! Three separate servers share this module:
//!
//! - [`rest_router`] — the REST convenience API for `curl`-style testing
//!   (`/api/uuid`, `/api/list`, `/api/metrics`, `/health`, `/`)
//! - [`streamable`] — JSON-RPC over HTTP with SSE push on one endpoint
//! - [`websocket`] — JSON-RPC over a bidirectional socket
//!
//! Each binds its own port and is enabled independently via CLI flags.

pub mod metrics;
pub mod security;
pub mod streamable;
pub mod websocket;

pub use metrics::RequestMetrics;
pub use security::OriginPolicy;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::mcp::protocol::SERVER_NAME;
use crate::tools::{JsonMap, ToolDirectory};

/// Shared state for the REST convenience API.
#[derive(Clone)]
pub struct RestState {
    /// The immutable tool directory.
    pub directory: Arc<ToolDirectory>,
    /// Request counters, injected at construction.
    pub metrics: Arc<RequestMetrics>,
}

/// Builds the REST convenience router.
#[must_use]
pub fn rest_router(directory: Arc<ToolDirectory>, metrics: Arc<RequestMetrics>) -> Router {
    let state = RestState { directory, metrics };

    Router::new()
        .route("/api/uuid", get(uuid_handler))
        .route("/api/list", get(list_handler))
        .route("/api/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/", get(index_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// `GET /api/uuid` — runs the `generate_uuid` tool directly.
async fn uuid_handler(State(state): State<RestState>) -> Response {
    state.metrics.record_uuid();

    match state.directory.execute("generate_uuid", &JsonMap::new()) {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to execute generate_uuid tool");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate UUID").into_response()
        }
    }
}

/// `GET /api/list` — tool name to description map.
async fn list_handler(State(state): State<RestState>) -> Response {
    state.metrics.record_list();
    Json(state.directory.descriptions()).into_response()
}

/// `GET /api/metrics` — request counter snapshot.
async fn metrics_handler(State(state): State<RestState>) -> Response {
    Json(state.metrics.snapshot()).into_response()
}

/// `GET /health` — liveness probe.
async fn health_handler(State(state): State<RestState>) -> Response {
    state.metrics.record_health();
    Json(json!({ "status": "healthy" })).into_response()
}

/// `GET /` — service banner.
async fn index_handler() -> Response {
    Json(json!({
        "service": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "message": "Multi-transport JSON-RPC tool server",
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::UuidGen;

    fn state() -> RestState {
        RestState {
            directory: Arc::new(ToolDirectory::from_tools(vec![Box::new(UuidGen::new())])),
            metrics: Arc::new(RequestMetrics::new()),
        }
    }

    #[tokio::test]
    async fn uuid_handler_returns_uuid_and_counts() {
        let state = state();
        let response = uuid_handler(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.metrics.snapshot().uuid_requests, 1);
    }

    #[tokio::test]
    async fn uuid_handler_fails_without_tool() {
        let state = RestState {
            directory: Arc::new(ToolDirectory::from_tools(vec![])),
            metrics: Arc::new(RequestMetrics::new()),
        };
        let response = uuid_handler(State(state)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn list_handler_reports_registered_tools() {
        let response = list_handler(State(state())).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_handler_is_ok() {
        let state = state();
        let response = health_handler(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.metrics.snapshot().health_requests, 1);
    }

    #[tokio::test]
    async fn metrics_handler_serialises_snapshot() {
        let response = metrics_handler(State(state())).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn router_builds() {
        let state = state();
        let _router = rest_router(state.directory, state.metrics);
    }
}
