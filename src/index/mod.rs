//! Abstract interface over the external similarity-search service.
//!
//! The primary implementation is `PineconeIndex` in the `pinecone` module;
//! tests substitute in-memory fakes.

pub mod pinecone;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::UpstreamError;

/// One record in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Unique record identifier.
    pub id: String,
    /// Embedding vector, fixed dimension.
    pub values: Vec<f32>,
    /// Attached metadata; carries the chunk text under `text`.
    pub metadata: Value,
}

impl IndexRecord {
    pub fn new(id: impl Into<String>, values: Vec<f32>, text: &str) -> Self {
        Self {
            id: id.into(),
            values,
            metadata: serde_json::json!({ "text": text }),
        }
    }
}

/// Result of a similarity query, ordered descending by score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    /// Similarity score (higher = better).
    pub score: f32,
    pub metadata: Option<Value>,
}

impl QueryMatch {
    /// The stored chunk text. Absent metadata or a missing `text` key reads
    /// as an empty string, not an error.
    pub fn text(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get("text"))
            .and_then(|value| value.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_vector_count: u64,
    pub dimension: u64,
}

/// Abstract trait for the external vector index service.
#[async_trait]
pub trait VectorIndexClient: Send + Sync {
    /// Create the index if it does not exist yet, with the given vector
    /// dimension and cosine similarity. A no-op when the index is present.
    async fn ensure_index(&self, dimension: usize) -> Result<(), UpstreamError>;

    /// Upsert a batch of records.
    async fn upsert(&self, records: &[IndexRecord]) -> Result<(), UpstreamError>;

    /// Query the `top_k` nearest records to the given vector.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, UpstreamError>;

    /// Current index statistics.
    async fn stats(&self) -> Result<IndexStats, UpstreamError>;
}
