//! HTTP API handlers and routes.

pub mod handlers;
pub mod routes;

use utoipa::OpenApi;

/// OpenAPI document for the query, session, and ingestion endpoints.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root,
        handlers::query,
        handlers::create_session,
        handlers::delete_session,
        handlers::ingest,
        handlers::health,
        handlers::stats,
    ),
    components(schemas(
        crate::types::QueryRequest,
        crate::types::QueryResponse,
        crate::types::SourceRef,
        crate::types::SessionRequest,
        crate::types::SessionResponse,
        crate::types::ClearSessionResponse,
        crate::types::IngestRequest,
        crate::types::IngestResponse,
        crate::types::InfoResponse,
        crate::types::HealthResponse,
        crate::types::StatsResponse,
    )),
    tags(
        (name = "query", description = "Knowledge base question answering"),
        (name = "session", description = "Conversation session lifecycle"),
        (name = "ingest", description = "Document ingestion"),
        (name = "system", description = "Health and statistics")
    )
)]
pub struct ApiDoc;
