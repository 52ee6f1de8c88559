use crate::types::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role of a chat message in a synthesis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single message in a synthesis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Text-to-vector capability of a hosted embedding model.
///
/// All vectors returned by one client share a fixed dimension; the vector
/// index enforces this on insert.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name/identifier.
    fn model_name(&self) -> &str;
}

/// Prompt-to-text capability of a hosted completion model.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion from an ordered message sequence.
    async fn generate_with_history(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Get the model name/identifier.
    fn model_name(&self) -> &str;
}
