//! Core types (documents, chunks, API requests/responses, errors).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============= Document Types =============

/// A source document loaded from disk, prior to chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

/// Provenance metadata for a loaded document.
///
/// `source_path` is relative to the ingestion root, so identity is stable
/// across machines as long as the tree is re-rooted identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source_path: String,
    pub display_name: String,
    pub token_count: usize,
}

/// A bounded-length contiguous slice of a document's text.
///
/// The unit of embedding and retrieval. Ordering within a document is
/// preserved via `chunk_index`; `total_chunks` is fixed once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Metadata carried by every chunk: document provenance plus position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_path: String,
    pub display_name: String,
    pub token_count: usize,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// A retrieved chunk paired with its similarity score. Transient per query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

// ============= API Request/Response Types =============

fn default_include_sources() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryRequest {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default = "default_include_sources")]
    pub include_sources: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Source citation formatted for display.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SourceRef {
    pub content_preview: String,
    pub source_path: String,
    pub display_name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClearSessionResponse {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestRequest {
    pub docs_directory: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    pub message: String,
    pub docs_directory: String,
    pub timestamp: DateTime<Utc>,
}

/// Service self-description served at the API root.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InfoResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub docs_url: String,
    pub health_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub index_ready: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub total_chunks: usize,
    pub active_sessions: usize,
    pub embedding_model: String,
    pub llm_model: String,
    pub timestamp: DateTime<Utc>,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Per-file load/decode failure during ingestion. Recovered locally
    /// by the loader; surfaces only when a whole directory is unreadable.
    #[error("Ingestion read error: {0}")]
    IngestionRead(String),

    /// Query issued against an empty or uninitialized index.
    #[error("Vector index not ready. Please ingest documents first.")]
    IndexNotReady,

    /// Embedding or synthesis call failure. Not retried by the core.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Request rejected before any external call was issued.
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::IngestionRead(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            AppError::IndexNotReady => axum::http::StatusCode::SERVICE_UNAVAILABLE,
            AppError::ExternalService(_) => axum::http::StatusCode::BAD_GATEWAY,
            AppError::Validation(_) => axum::http::StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
            AppError::Configuration(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
