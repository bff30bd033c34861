//! Offline ingestion CLI. Stages:
//!
//! ```text
//! ingest crawl [start-url]   crawl the support site into aven_data.txt
//! ingest chunk               chunk the raw corpus into chunked_aven_data.txt
//! ingest index               embed the chunks and upsert them into the index
//! ingest all [start-url]     run the three stages in order (default)
//! ```

use std::env;
use std::sync::Arc;

use anyhow::Context;

use aven_support_agent::core::config::AppConfig;
use aven_support_agent::core::logging;
use aven_support_agent::index::pinecone::PineconeIndex;
use aven_support_agent::index::VectorIndexClient;
use aven_support_agent::ingest::corpus;
use aven_support_agent::ingest::crawler::{SiteCrawler, DEFAULT_START_URL};
use aven_support_agent::ingest::{
    chunk_text, IngestOptions, IngestionPipeline, SENTENCES_PER_CHUNK,
};
use aven_support_agent::llm::gemini::GeminiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("configuration error")?;
    logging::init(&config.paths);

    let stage = env::args().nth(1).unwrap_or_else(|| "all".to_string());
    let start_url = env::args().nth(2);

    match stage.as_str() {
        "crawl" => crawl(&config, start_url).await,
        "chunk" => chunk(&config),
        "index" => index(&config).await,
        "all" => {
            crawl(&config, start_url).await?;
            chunk(&config)?;
            index(&config).await
        }
        other => anyhow::bail!(
            "unknown stage `{}` (expected crawl, chunk, index or all)",
            other
        ),
    }
}

async fn crawl(config: &AppConfig, start_url: Option<String>) -> anyhow::Result<()> {
    let start_url = start_url.unwrap_or_else(|| DEFAULT_START_URL.to_string());
    std::fs::create_dir_all(&config.paths.data_dir)
        .with_context(|| format!("creating {}", config.paths.data_dir.display()))?;

    let summary = SiteCrawler::new().crawl(&start_url).await?;

    let out_path = config.paths.data_dir.join(corpus::RAW_CORPUS_FILE);
    std::fs::write(&out_path, &summary.text)
        .with_context(|| format!("writing {}", out_path.display()))?;

    tracing::info!(
        "crawled {} pages into {}",
        summary.pages_scraped,
        out_path.display()
    );
    Ok(())
}

fn chunk(config: &AppConfig) -> anyhow::Result<()> {
    let raw_path = config.paths.data_dir.join(corpus::RAW_CORPUS_FILE);
    let raw = std::fs::read_to_string(&raw_path)
        .with_context(|| format!("reading {}", raw_path.display()))?;

    let chunks = chunk_text(&raw, SENTENCES_PER_CHUNK);
    let out_path = config.paths.data_dir.join(corpus::CHUNKED_CORPUS_FILE);
    corpus::write_chunks(&out_path, &chunks)
        .with_context(|| format!("writing {}", out_path.display()))?;

    tracing::info!("wrote {} chunks to {}", chunks.len(), out_path.display());
    Ok(())
}

async fn index(config: &AppConfig) -> anyhow::Result<()> {
    let chunk_path = config.paths.data_dir.join(corpus::CHUNKED_CORPUS_FILE);
    let chunks = corpus::read_chunks(&chunk_path)
        .with_context(|| format!("reading {}", chunk_path.display()))?;

    let embedder = Arc::new(GeminiClient::new(config));
    let index = Arc::new(PineconeIndex::new(config));
    let pipeline = IngestionPipeline::new(embedder, index.clone(), IngestOptions::default());

    let report = pipeline.ingest(&chunks).await?;
    tracing::info!(
        "indexed {} of {} chunks ({} skipped)",
        report.indexed,
        report.total_chunks,
        report.skipped
    );

    let stats = index.stats().await?;
    tracing::info!(
        "index now holds {} vectors (dimension {})",
        stats.total_vector_count,
        stats.dimension
    );
    Ok(())
}
