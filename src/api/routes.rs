//! Route table for the HTTP API.

use crate::api::{handlers, ApiDoc};
use crate::AppState;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use utoipa::OpenApi;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::root))
        .route("/query", post(handlers::query))
        .route("/session", post(handlers::create_session))
        .route("/session/{session_id}", delete(handlers::delete_session))
        .route("/ingest", post(handlers::ingest))
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
}
