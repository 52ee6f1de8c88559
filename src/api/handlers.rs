//! Request handlers for the query, session, ingestion, and system endpoints.

use crate::types::{
    AppError, ClearSessionResponse, HealthResponse, InfoResponse, IngestRequest, IngestResponse,
    QueryRequest, QueryResponse, Result, ScoredChunk, SessionRequest, SessionResponse, SourceRef,
    StatsResponse,
};
use crate::AppState;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

const PREVIEW_CHARS: usize = 200;

/// Format a retrieved chunk as a displayable source citation.
fn format_source(scored: &ScoredChunk) -> SourceRef {
    let content = &scored.chunk.content;
    let content_preview = if content.chars().count() > PREVIEW_CHARS {
        let truncated: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", truncated)
    } else {
        content.clone()
    };

    SourceRef {
        content_preview,
        source_path: scored.chunk.metadata.source_path.clone(),
        display_name: scored.chunk.metadata.display_name.clone(),
    }
}

/// Answer a question against the knowledge base.
#[utoipa::path(
    post,
    path = "/query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Answer with sources and confidence", body = QueryResponse),
        (status = 400, description = "Invalid question"),
        (status = 502, description = "External model call failed"),
        (status = 503, description = "Index not ready, ingest documents first")
    ),
    tag = "query"
)]
pub async fn query(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let outcome = state
        .pipeline
        .query(&payload.question, payload.session_id.as_deref())
        .await?;

    let sources = if payload.include_sources {
        outcome.sources.iter().map(format_source).collect()
    } else {
        Vec::new()
    };

    Ok(Json(QueryResponse {
        answer: outcome.answer,
        sources,
        confidence: outcome.confidence,
        session_id: outcome.session_id,
        timestamp: Utc::now(),
    }))
}

/// Create a new conversation session.
#[utoipa::path(
    post,
    path = "/session",
    request_body = SessionRequest,
    responses(
        (status = 200, description = "Session created", body = SessionResponse)
    ),
    tag = "session"
)]
pub async fn create_session(
    State(_state): State<AppState>,
    Json(payload): Json<SessionRequest>,
) -> Result<Json<SessionResponse>> {
    let owner = payload.user_id.as_deref().unwrap_or("anonymous");
    let suffix = Uuid::new_v4().simple().to_string();
    let session_id = format!("{}-{}", owner, &suffix[..8]);

    Ok(Json(SessionResponse {
        session_id,
        created_at: Utc::now(),
    }))
}

/// Clear conversation history for a session. Idempotent.
#[utoipa::path(
    delete,
    path = "/session/{session_id}",
    params(("session_id" = String, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session cleared", body = ClearSessionResponse)
    ),
    tag = "session"
)]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ClearSessionResponse>> {
    state.pipeline.clear_session(&session_id);

    Ok(Json(ClearSessionResponse {
        message: format!("Session {} cleared", session_id),
        timestamp: Utc::now(),
    }))
}

/// Start background ingestion of a document directory.
///
/// Returns immediately; progress is observable only through the index
/// ready state reported by `/health`.
#[utoipa::path(
    post,
    path = "/ingest",
    request_body = IngestRequest,
    responses(
        (status = 200, description = "Ingestion started", body = IngestResponse),
        (status = 400, description = "Invalid request")
    ),
    tag = "ingest"
)]
pub async fn ingest(
    State(state): State<AppState>,
    Json(payload): Json<IngestRequest>,
) -> Result<Json<IngestResponse>> {
    if payload.docs_directory.trim().is_empty() {
        return Err(AppError::Validation("docs_directory required".into()));
    }

    let pipeline = Arc::clone(&state.pipeline);
    let directory = PathBuf::from(payload.docs_directory.clone());

    tokio::spawn(async move {
        tracing::info!(directory = %directory.display(), "Starting document ingestion");
        match pipeline.initialize_from_documents(&directory).await {
            Ok(chunks) => {
                tracing::info!(directory = %directory.display(), chunks, "Document ingestion completed");
            }
            Err(e) => {
                tracing::error!(directory = %directory.display(), error = %e, "Document ingestion failed");
            }
        }
    });

    Ok(Json(IngestResponse {
        message: "Document ingestion started".to_string(),
        docs_directory: payload.docs_directory,
        timestamp: Utc::now(),
    }))
}

/// Service self-description with pointers to the docs and health check.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = InfoResponse)
    ),
    tag = "system"
)]
pub async fn root() -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "SAGE".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: env!("CARGO_PKG_DESCRIPTION").to_string(),
        docs_url: "/api-docs/openapi.json".to_string(),
        health_url: "/health".to_string(),
    })
}

/// Health check.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        index_ready: state.pipeline.is_ready(),
        timestamp: Utc::now(),
    })
}

/// Knowledge base statistics.
#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Knowledge base statistics", body = StatsResponse),
        (status = 503, description = "Index not ready")
    ),
    tag = "system"
)]
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    if !state.pipeline.is_ready() {
        return Err(AppError::IndexNotReady);
    }

    Ok(Json(StatsResponse {
        total_chunks: state.pipeline.total_chunks(),
        active_sessions: state.pipeline.active_sessions(),
        embedding_model: state.config.llm.embedding_model.clone(),
        llm_model: state.config.llm.llm_model.clone(),
        timestamp: Utc::now(),
    }))
}
