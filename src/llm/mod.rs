pub mod gemini;
pub mod types;

use async_trait::async_trait;

use crate::core::errors::UpstreamError;

use self::types::{ChatTurn, ModelReply, ToolDecl};

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// embed a single text into a fixed-dimension vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>, UpstreamError>;
}

#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// run one generation step over the exchange so far, optionally
    /// offering the given tools to the model
    async fn generate(
        &self,
        turns: &[ChatTurn],
        tools: Option<&[ToolDecl]>,
    ) -> Result<ModelReply, UpstreamError>;
}
