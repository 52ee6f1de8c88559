//! External model clients: embeddings and answer synthesis.
//!
//! The pipeline talks to hosted models through two narrow trait seams,
//! [`client::EmbeddingClient`] and [`client::CompletionClient`], so the
//! orchestrator never depends on a concrete provider. The shipped
//! implementation, [`openai::OpenAiCompatClient`], targets any
//! OpenAI-compatible HTTP API with strictly typed request/response
//! contracts validated at the boundary.

pub mod client;
pub mod openai;

pub use client::{ChatMessage, CompletionClient, EmbeddingClient, MessageRole};
pub use openai::OpenAiCompatClient;
