//! RAG orchestrator: composes loading, chunking, retrieval, and synthesis.

use crate::index::VectorIndex;
use crate::llm::{ChatMessage, CompletionClient};
use crate::memory::{SessionStore, Turn};
use crate::rag::{DocumentLoader, TextChunker};
use crate::types::{AppError, Result, ScoredChunk};
use crate::utils::config::RagConfig;
use std::path::Path;
use std::sync::Arc;

const MAX_QUESTION_CHARS: usize = 1000;

const SYSTEM_PROMPT: &str = "You are a knowledge base assistant. Answer the user's question using \
only the provided context. Cite the source documents you relied on, and say so plainly when the \
context does not contain the answer.";

/// Result of a single query through the pipeline.
#[derive(Debug)]
pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<ScoredChunk>,
    pub confidence: f32,
    pub session_id: Option<String>,
}

/// Confidence derived solely from the count of qualifying sources.
///
/// A coarse heuristic, not a calibrated probability: retrieval similarity
/// scores are deliberately ignored.
pub fn confidence_from_sources(count: usize) -> f32 {
    match count {
        0 => 0.0,
        1 => 0.5,
        2 => 0.7,
        _ => 0.9,
    }
}

/// The RAG pipeline: ingestion (load, chunk, embed, index) and query
/// (retrieve, synthesize, score, remember).
pub struct RagPipeline {
    config: RagConfig,
    index: Arc<VectorIndex>,
    sessions: SessionStore,
    llm: Arc<dyn CompletionClient>,
    loader: DocumentLoader,
    chunker: TextChunker,
}

impl RagPipeline {
    pub fn new(config: RagConfig, index: Arc<VectorIndex>, llm: Arc<dyn CompletionClient>) -> Self {
        let sessions = SessionStore::new(config.max_history_length);
        let loader = DocumentLoader::new(config.document_extensions.clone());
        let chunker = TextChunker::new(config.chunk_size, config.chunk_overlap);

        Self {
            config,
            index,
            sessions,
            llm,
            loader,
            chunker,
        }
    }

    /// Ingest a document tree: load, chunk, and index.
    ///
    /// Per-file read failures are logged and skipped inside the loader; a
    /// failure while embedding or writing the index aborts the whole call
    /// and the caller should retry it in full.
    pub async fn initialize_from_documents(&self, docs_directory: &Path) -> Result<usize> {
        let documents = self.loader.load(docs_directory).await?;
        tracing::info!(
            directory = %docs_directory.display(),
            documents = documents.len(),
            "Loaded documents"
        );

        let mut chunks = Vec::new();
        for document in &documents {
            chunks.extend(self.chunker.chunk_document(document));
        }
        tracing::info!(chunks = chunks.len(), "Chunked documents");

        self.index.upsert(chunks).await
    }

    /// Answer a question against the indexed corpus.
    ///
    /// Validation happens before any external call. Retrieval against an
    /// empty index propagates [`AppError::IndexNotReady`]; an answer is
    /// never synthesized without an initialized index.
    pub async fn query(&self, question: &str, session_id: Option<&str>) -> Result<QueryOutcome> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Validation("Question must not be empty".into()));
        }
        if question.chars().count() > MAX_QUESTION_CHARS {
            return Err(AppError::Validation(format!(
                "Question exceeds {} characters",
                MAX_QUESTION_CHARS
            )));
        }

        let sources = self
            .index
            .query(question, self.config.top_k_results)
            .await?;

        let history = session_id
            .map(|id| self.sessions.history(id))
            .unwrap_or_default();

        let messages = build_messages(question, &sources, &history);
        let answer = self.llm.generate_with_history(&messages).await?;

        let confidence = confidence_from_sources(sources.len());

        if let Some(id) = session_id {
            self.sessions.append_turn(id, question, &answer);
        }

        tracing::info!(
            session_id = ?session_id,
            sources = sources.len(),
            confidence = confidence,
            "Query answered"
        );

        Ok(QueryOutcome {
            answer,
            sources,
            confidence,
            session_id: session_id.map(String::from),
        })
    }

    /// Drop all conversation state for a session. Idempotent.
    pub fn clear_session(&self, session_id: &str) {
        self.sessions.clear(session_id);
    }

    /// Recent turns for a session, oldest first.
    pub fn session_history(&self, session_id: &str) -> Vec<Turn> {
        self.sessions.history(session_id)
    }

    /// Whether the index can serve queries.
    pub fn is_ready(&self) -> bool {
        self.index.is_ready()
    }

    pub fn total_chunks(&self) -> usize {
        self.index.len()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.active_sessions()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }
}

/// Assemble the synthesis request: system prompt, recent history oldest to
/// newest, then the question with retrieved context in descending score
/// order. Deterministic for fixed inputs.
fn build_messages(question: &str, sources: &[ScoredChunk], history: &[Turn]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));

    for turn in history {
        messages.push(ChatMessage::user(turn.question.clone()));
        messages.push(ChatMessage::assistant(turn.answer.clone()));
    }

    let mut prompt = String::from("Context:\n");
    if sources.is_empty() {
        prompt.push_str("(no relevant documents found)\n");
    }
    for (i, source) in sources.iter().enumerate() {
        prompt.push_str(&format!(
            "[{}] {}\n{}\n\n",
            i + 1,
            source.chunk.metadata.source_path,
            source.chunk.content
        ));
    }
    prompt.push_str(&format!("Question: {}", question));
    messages.push(ChatMessage::user(prompt));

    messages
}
