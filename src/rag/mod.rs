//! Retrieval Augmented Generation (RAG) pipeline.
//!
//! The pipeline flow:
//!
//! 1. **Ingestion** - [`loader`] reads a document tree, [`chunker`] splits
//!    each document along natural boundaries, and the vector index embeds
//!    and persists the chunks.
//! 2. **Query** - the question is embedded, similar chunks are retrieved,
//!    and [`pipeline`] assembles question, context, and recent session
//!    history into a synthesis request.

pub mod chunker;
pub mod loader;
pub mod pipeline;

pub use chunker::TextChunker;
pub use loader::DocumentLoader;
pub use pipeline::{confidence_from_sources, QueryOutcome, RagPipeline};
