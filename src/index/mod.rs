//! Embedded vector index with JSON persistence.
//!
//! Stores `(vector, chunk)` records under a named collection and answers
//! nearest-neighbor queries by cosine similarity. Embedding always happens
//! before any lock is taken, so no lock is held across a network call.

use crate::llm::EmbeddingClient;
use crate::types::{AppError, Chunk, Result, ScoredChunk};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// A persisted chunk vector. Owned exclusively by the index once inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmbeddingRecord {
    id: String,
    vector: Vec<f32>,
    chunk: Chunk,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexState {
    /// Fixed by the first insert; constant for the lifetime of the index.
    dimensions: Option<usize>,
    records: Vec<EmbeddingRecord>,
}

/// Vector index over a single named collection.
pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingClient>,
    collection_name: String,
    persist_directory: Option<PathBuf>,
    similarity_threshold: f32,
    state: RwLock<IndexState>,
}

impl VectorIndex {
    /// Open an index, loading any persisted collection from disk.
    ///
    /// A missing or corrupt index file is recoverable: the index starts
    /// empty and ingestion can populate it later.
    pub async fn open(
        embedder: Arc<dyn EmbeddingClient>,
        collection_name: impl Into<String>,
        persist_directory: Option<String>,
        similarity_threshold: f32,
    ) -> Self {
        let index = Self {
            embedder,
            collection_name: collection_name.into(),
            persist_directory: persist_directory.map(PathBuf::from),
            similarity_threshold,
            state: RwLock::new(IndexState::default()),
        };

        index.load().await;
        index
    }

    fn index_path(&self) -> Option<PathBuf> {
        self.persist_directory
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", self.collection_name)))
    }

    async fn load(&self) {
        let Some(path) = self.index_path() else {
            return;
        };

        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No persisted index, starting empty");
                return;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read index, starting empty");
                return;
            }
        };

        match serde_json::from_str::<IndexState>(&data) {
            Ok(loaded) => {
                tracing::info!(
                    collection = %self.collection_name,
                    records = loaded.records.len(),
                    "Loaded persisted index"
                );
                *self.state.write() = loaded;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Corrupt index file, starting empty");
            }
        }
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = self.index_path() else {
            return Ok(());
        };

        // Snapshot under the lock, write after releasing it.
        let data = {
            let state = self.state.read();
            serde_json::to_string(&*state)
                .map_err(|e| AppError::Internal(format!("Failed to serialize index: {}", e)))?
        };

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                AppError::Internal(format!("Failed to create index directory: {}", e))
            })?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write index file: {}", e)))
    }

    /// Embed and persist a batch of chunks.
    ///
    /// The batch commits atomically: a dimension mismatch anywhere in it
    /// rejects the whole call and leaves the index unchanged. Safe to call
    /// multiple times, but exact-duplicate suppression is NOT performed:
    /// ingesting the same content twice stores duplicate records.
    pub async fn upsert(&self, chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let inserted = chunks.len();
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(AppError::ExternalService(format!(
                "Embedding count mismatch: sent {} chunks, got {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        {
            let mut state = self.state.write();

            // Validate every vector before touching the records, so a bad
            // batch never becomes partially visible.
            let dims = match state.dimensions {
                Some(dims) => dims,
                None => vectors[0].len(),
            };
            if let Some(vector) = vectors.iter().find(|v| v.len() != dims) {
                return Err(AppError::ExternalService(format!(
                    "Embedding dimension mismatch: index has {}, got {}",
                    dims,
                    vector.len()
                )));
            }

            state.dimensions = Some(dims);
            for (chunk, vector) in chunks.into_iter().zip(vectors.into_iter()) {
                state.records.push(EmbeddingRecord {
                    id: Uuid::new_v4().to_string(),
                    vector,
                    chunk,
                });
            }
        }

        self.persist().await?;

        tracing::info!(
            collection = %self.collection_name,
            inserted = inserted,
            total_records = self.len(),
            "Upserted chunks"
        );
        Ok(inserted)
    }

    /// Embed `text` and return the `k` nearest chunks by cosine similarity,
    /// descending, filtered to scores at or above the configured threshold.
    ///
    /// Fails with [`AppError::IndexNotReady`] when the collection is empty,
    /// so callers can distinguish "ingest first" from "no matches".
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if !self.is_ready() {
            return Err(AppError::IndexNotReady);
        }

        let vectors = self.embedder.embed(&[text.to_string()]).await?;
        let query_vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ExternalService("Embedding returned no vector".to_string()))?;

        let state = self.state.read();

        let mut results: Vec<ScoredChunk> = state
            .records
            .iter()
            .filter_map(|record| {
                let score = cosine_similarity(&query_vector, &record.vector);
                (score >= self.similarity_threshold).then(|| ScoredChunk {
                    chunk: record.chunk.clone(),
                    score,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);

        Ok(results)
    }

    /// Whether the collection holds at least one record.
    pub fn is_ready(&self) -> bool {
        !self.state.read().records.is_empty()
    }

    /// Number of records in the collection.
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;
    use async_trait::async_trait;

    /// Deterministic embedder: each text maps to a unit vector whose cosine
    /// against the query vector [1, 0] equals the leading component.
    struct StaticEmbedder;

    fn vector_for(text: &str) -> Vec<f32> {
        let s: f32 = match text {
            "high" => 0.9,
            "mid" => 0.75,
            "low" => 0.4,
            _ => 1.0, // queries
        };
        vec![s, (1.0 - s * s).sqrt()]
    }

    #[async_trait]
    impl EmbeddingClient for StaticEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vector_for(t)).collect())
        }

        fn model_name(&self) -> &str {
            "static-test-embedder"
        }
    }

    fn chunk(content: &str) -> Chunk {
        Chunk {
            content: content.to_string(),
            metadata: ChunkMetadata {
                source_path: "docs/test.md".to_string(),
                display_name: "test.md".to_string(),
                token_count: content.len() / 4,
                chunk_index: 0,
                total_chunks: 1,
            },
        }
    }

    async fn memory_index(threshold: f32) -> VectorIndex {
        VectorIndex::open(Arc::new(StaticEmbedder), "test", None, threshold).await
    }

    #[tokio::test]
    async fn test_query_before_ingest_is_not_ready() {
        let index = memory_index(0.7).await;

        let result = index.query("anything", 3).await;
        assert!(matches!(result, Err(AppError::IndexNotReady)));
    }

    #[tokio::test]
    async fn test_threshold_filter_and_ordering() {
        let index = memory_index(0.7).await;
        index
            .upsert(vec![chunk("low"), chunk("high"), chunk("mid")])
            .await
            .unwrap();

        // Candidate scores are [0.9, 0.75, 0.4]; only the first two qualify.
        let results = index.query("query", 10).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "high");
        assert_eq!(results[1].chunk.content, "mid");
        assert!((results[0].score - 0.9).abs() < 1e-3);
        assert!((results[1].score - 0.75).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_top_k_truncation() {
        let index = memory_index(0.0).await;
        index
            .upsert(vec![chunk("high"), chunk("mid"), chunk("low")])
            .await
            .unwrap();

        let results = index.query("query", 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    /// Embedder whose vector width depends on the text, to simulate a
    /// provider drifting dimensions mid-batch.
    struct MixedDimEmbedder;

    #[async_trait]
    impl EmbeddingClient for MixedDimEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| if t == "wide" { vec![1.0; 3] } else { vec![1.0; 2] })
                .collect())
        }

        fn model_name(&self) -> &str {
            "mixed-dim-test-embedder"
        }
    }

    #[tokio::test]
    async fn test_failed_batch_is_not_partially_committed() {
        let index =
            VectorIndex::open(Arc::new(MixedDimEmbedder), "test", None, 0.0).await;

        let result = index
            .upsert(vec![chunk("narrow"), chunk("wide"), chunk("narrow")])
            .await;

        assert!(matches!(result, Err(AppError::ExternalService(_))));
        // The whole batch must be rejected, including records that would
        // have validated on their own.
        assert_eq!(index.len(), 0);
        assert!(!index.is_ready());
    }

    #[tokio::test]
    async fn test_rejected_batch_does_not_fix_dimensions() {
        let index =
            VectorIndex::open(Arc::new(MixedDimEmbedder), "test", None, 0.0).await;

        index
            .upsert(vec![chunk("wide"), chunk("narrow")])
            .await
            .unwrap_err();

        // A later well-formed batch still establishes the dimension.
        index.upsert(vec![chunk("narrow")]).await.unwrap();
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_ingestion_is_not_suppressed() {
        let index = memory_index(0.0).await;
        index.upsert(vec![chunk("high")]).await.unwrap();
        index.upsert(vec![chunk("high")]).await.unwrap();

        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let persist = dir.path().to_string_lossy().to_string();

        {
            let index = VectorIndex::open(
                Arc::new(StaticEmbedder),
                "kb",
                Some(persist.clone()),
                0.5,
            )
            .await;
            index.upsert(vec![chunk("high"), chunk("mid")]).await.unwrap();
        }

        let reopened =
            VectorIndex::open(Arc::new(StaticEmbedder), "kb", Some(persist), 0.5).await;

        assert!(reopened.is_ready());
        assert_eq!(reopened.len(), 2);

        let results = reopened.query("query", 10).await.unwrap();
        assert_eq!(results[0].chunk.content, "high");
    }

    #[tokio::test]
    async fn test_corrupt_index_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let persist = dir.path().to_string_lossy().to_string();
        tokio::fs::write(dir.path().join("kb.json"), "not json at all")
            .await
            .unwrap();

        let index = VectorIndex::open(Arc::new(StaticEmbedder), "kb", Some(persist), 0.5).await;

        assert!(!index.is_ready());
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
