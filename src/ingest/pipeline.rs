//! Offline ingestion: embed corpus chunks and populate the vector index.
//!
//! Chunks are processed strictly in order. Individual embedding failures
//! leave a sentinel at that position and never abort the run; the batch
//! only fails when the embedding service is unreachable outright or the
//! index rejects the upsert.

use std::sync::Arc;
use std::time::Duration;

use crate::core::config::EMBEDDING_DIMENSION;
use crate::core::errors::UpstreamError;
use crate::index::{IndexRecord, VectorIndexClient};
use crate::llm::EmbeddingClient;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Pause after this many embedding calls, to respect service quotas.
    pub pause_every: usize,
    pub pause: Duration,
    pub upsert_batch_size: usize,
    pub dimension: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            pause_every: 50,
            pause: Duration::from_secs(1),
            upsert_batch_size: 100,
            dimension: EMBEDDING_DIMENSION,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub total_chunks: usize,
    /// Chunks embedded and upserted into the index.
    pub indexed: usize,
    /// Chunks excluded because their embedding call failed.
    pub skipped: usize,
}

pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndexClient>,
    options: IngestOptions,
}

impl IngestionPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndexClient>,
        options: IngestOptions,
    ) -> Self {
        Self {
            embedder,
            index,
            options,
        }
    }

    /// Embed every chunk, make sure the index exists, and upsert the
    /// successfully embedded records in bounded batches. Record ids are
    /// `chunk_{position}` using each chunk's original position, so ids
    /// stay stable when some chunks are skipped.
    pub async fn ingest(&self, chunks: &[String]) -> Result<IngestReport, UpstreamError> {
        let embeddings = self.embed_all(chunks).await?;

        self.index.ensure_index(self.options.dimension).await?;

        let records: Vec<IndexRecord> = chunks
            .iter()
            .zip(embeddings.into_iter())
            .enumerate()
            .filter(|(_, (_, embedding))| !embedding.is_empty())
            .map(|(i, (chunk, embedding))| {
                IndexRecord::new(format!("chunk_{}", i), embedding, chunk)
            })
            .collect();

        for batch in records.chunks(self.options.upsert_batch_size.max(1)) {
            self.index.upsert(batch).await?;
        }

        let indexed = records.len();
        if indexed < chunks.len() {
            tracing::warn!(
                "skipped {} of {} chunks after embedding failures",
                chunks.len() - indexed,
                chunks.len()
            );
        }

        Ok(IngestReport {
            total_chunks: chunks.len(),
            indexed,
            skipped: chunks.len() - indexed,
        })
    }

    /// Embed chunks in order. A failed call logs and leaves an empty
    /// sentinel vector at that position; only a run in which every call
    /// failed is reported as an error.
    async fn embed_all(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>, UpstreamError> {
        let pause_every = self.options.pause_every.max(1);
        let mut embeddings = Vec::with_capacity(chunks.len());
        let mut last_error = None;

        for (i, chunk) in chunks.iter().enumerate() {
            match self.embedder.embed(chunk).await {
                Ok(vector) => embeddings.push(vector),
                Err(err) => {
                    tracing::warn!("could not embed chunk {}: {}", i, err);
                    embeddings.push(Vec::new());
                    last_error = Some(err);
                }
            }

            if (i + 1) % pause_every == 0 {
                tracing::info!("processed {}/{} chunks", i + 1, chunks.len());
                tokio::time::sleep(self.options.pause).await;
            }
        }

        if !chunks.is_empty() && embeddings.iter().all(|embedding| embedding.is_empty()) {
            if let Some(err) = last_error {
                return Err(err);
            }
        }

        Ok(embeddings)
    }
}
