//! SAGE, a source-augmented generation engine.
//!
//! Serves question answering over a local document corpus: documents are
//! chunked, embedded, and held in an in-process vector index; queries
//! retrieve the most similar chunks and synthesize an answer through an
//! OpenAI-compatible model, with optional per-session conversation memory.

pub mod api;
pub mod index;
pub mod llm;
pub mod memory;
pub mod rag;
pub mod types;
pub mod utils;

use crate::rag::RagPipeline;
use crate::utils::config::Config;
use std::sync::Arc;

/// Shared application state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub config: Arc<Config>,
}
