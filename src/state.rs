use std::sync::Arc;

use crate::answer::{AnswerOptions, AnswerPipeline};
use crate::core::config::AppConfig;
use crate::index::pinecone::PineconeIndex;
use crate::llm::gemini::GeminiClient;

/// Global application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub answers: Arc<AnswerPipeline>,
}

impl AppState {
    /// Wires the external-service clients into the answer pipeline.
    ///
    /// No network traffic happens here: the index data host is resolved
    /// lazily on first use, so startup cannot be stalled by an upstream.
    pub fn initialize(config: AppConfig) -> Arc<Self> {
        let gemini = Arc::new(GeminiClient::new(&config));
        let index = Arc::new(PineconeIndex::new(&config));

        let answers = Arc::new(AnswerPipeline::new(
            gemini.clone(),
            index,
            gemini,
            AnswerOptions {
                top_k: config.top_k,
            },
        ));

        Arc::new(AppState { config, answers })
    }
}
