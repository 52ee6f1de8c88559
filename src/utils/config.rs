use crate::types::AppError;
use serde::Deserialize;
use std::env;

/// Immutable record of tunables, fixed at pipeline construction and
/// shared read-only by all components.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub rag: RagConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    pub api_base: String,
    pub api_key: String,
    pub embedding_model: String,
    pub llm_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k_results: usize,
    pub similarity_threshold: f32,
    pub max_history_length: usize,
    pub collection_name: String,
    pub persist_directory: String,
    /// File extensions recognized by the document loader.
    pub document_extensions: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
            },
            llm: LlmConfig {
                api_base: env::var("LLM_API_BASE")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                api_key: env::var("LLM_API_KEY").unwrap_or_default(),
                embedding_model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
                llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            },
            rag: RagConfig {
                chunk_size: env::var("CHUNK_SIZE")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()?,
                chunk_overlap: env::var("CHUNK_OVERLAP")
                    .unwrap_or_else(|_| "200".to_string())
                    .parse()?,
                top_k_results: env::var("TOP_K_RESULTS")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()?,
                similarity_threshold: env::var("SIMILARITY_THRESHOLD")
                    .unwrap_or_else(|_| "0.7".to_string())
                    .parse()?,
                max_history_length: env::var("MAX_HISTORY_LENGTH")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
                collection_name: env::var("COLLECTION_NAME")
                    .unwrap_or_else(|_| "qa_knowledge_base".to_string()),
                persist_directory: env::var("PERSIST_DIRECTORY")
                    .unwrap_or_else(|_| "./data/index".to_string()),
                document_extensions: env::var("DOCUMENT_EXTENSIONS")
                    .unwrap_or_else(|_| "md".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject tunable combinations the pipeline cannot run with, so a bad
    /// environment fails startup with an error instead of a panic later.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.rag.chunk_size == 0 {
            return Err(AppError::Configuration(
                "CHUNK_SIZE must be positive".to_string(),
            ));
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(AppError::Configuration(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k_results: 3,
            similarity_threshold: 0.7,
            max_history_length: 5,
            collection_name: "qa_knowledge_base".to_string(),
            persist_directory: "./data/index".to_string(),
            document_extensions: vec!["md".to_string()],
        }
    }
}
