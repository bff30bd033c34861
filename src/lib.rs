//! Retrieval-augmented support agent for Aven: an HTTP backend that answers
//! customer questions from an indexed document corpus, plus the offline
//! ingestion pipeline that builds the index.

pub mod answer;
pub mod core;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod server;
pub mod state;
pub mod tooling;
