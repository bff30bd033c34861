//! In-memory fakes shared by the handler tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::answer::{AnswerOptions, AnswerPipeline};
use crate::core::config::AppConfig;
use crate::core::errors::UpstreamError;
use crate::index::{IndexRecord, IndexStats, QueryMatch, VectorIndexClient};
use crate::llm::types::{ChatTurn, ModelReply, ToolDecl};
use crate::llm::{EmbeddingClient, GenerationClient};
use crate::state::AppState;

pub struct NullEmbedder;

#[async_trait]
impl EmbeddingClient for NullEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, UpstreamError> {
        Ok(vec![0.0; 4])
    }
}

pub struct NullIndex;

#[async_trait]
impl VectorIndexClient for NullIndex {
    async fn ensure_index(&self, _dimension: usize) -> Result<(), UpstreamError> {
        Ok(())
    }

    async fn upsert(&self, _records: &[IndexRecord]) -> Result<(), UpstreamError> {
        Ok(())
    }

    async fn query(
        &self,
        _vector: &[f32],
        _top_k: usize,
    ) -> Result<Vec<QueryMatch>, UpstreamError> {
        Ok(Vec::new())
    }

    async fn stats(&self) -> Result<IndexStats, UpstreamError> {
        Ok(IndexStats::default())
    }
}

/// Replies with a fixed line, or fails, and keeps every prompt it was shown.
pub struct CountingGenerator {
    pub prompts: Mutex<Vec<String>>,
    reply: String,
    fail: bool,
}

impl CountingGenerator {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            reply: reply.to_string(),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            reply: String::new(),
            fail: true,
        })
    }
}

#[async_trait]
impl GenerationClient for CountingGenerator {
    async fn generate(
        &self,
        turns: &[ChatTurn],
        _tools: Option<&[ToolDecl]>,
    ) -> Result<ModelReply, UpstreamError> {
        let prompt = turns[0].parts[0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        self.prompts.lock().unwrap().push(prompt);
        if self.fail {
            return Err(UpstreamError::Timeout { service: "fake" });
        }
        Ok(ModelReply {
            text: self.reply.clone(),
            tool_call: None,
        })
    }
}

/// Config with only the required credentials set.
pub fn test_config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "GOOGLE_API_KEY" => Some("google-test-key".to_string()),
        "PINECONE_API_KEY" => Some("pinecone-test-key".to_string()),
        _ => None,
    })
    .expect("test config")
}

/// Same, plus voice-assistant credentials.
pub fn test_config_with_voice() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "GOOGLE_API_KEY" => Some("google-test-key".to_string()),
        "PINECONE_API_KEY" => Some("pinecone-test-key".to_string()),
        "VAPI_PUBLIC_KEY" => Some("vapi-public".to_string()),
        "VAPI_ASSISTANT_ID" => Some("vapi-assistant".to_string()),
        _ => None,
    })
    .expect("test config")
}

pub fn state_with(config: AppConfig, generator: Arc<CountingGenerator>) -> Arc<AppState> {
    let answers = Arc::new(AnswerPipeline::new(
        Arc::new(NullEmbedder),
        Arc::new(NullIndex),
        generator,
        AnswerOptions { top_k: 5 },
    ));
    Arc::new(AppState { config, answers })
}

pub fn test_state(generator: Arc<CountingGenerator>) -> Arc<AppState> {
    state_with(test_config(), generator)
}
