pub mod chunker;
pub mod corpus;
pub mod crawler;
pub mod pipeline;

pub use chunker::{chunk_text, SENTENCES_PER_CHUNK};
pub use pipeline::{IngestOptions, IngestReport, IngestionPipeline};
