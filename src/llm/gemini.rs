use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::AppConfig;
use crate::core::errors::UpstreamError;

use super::types::{ChatTurn, ModelReply, ToolCallRequest, ToolDecl};
use super::{EmbeddingClient, GenerationClient};

const SERVICE: &str = "gemini";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for the Gemini generative-language API. Implements both the
/// embedding and the generation seam against the same credential.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    generation_model: String,
    embedding_model: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.google_api_key.clone(),
            generation_model: config.generation_model.clone(),
            embedding_model: config.embedding_model.clone(),
            timeout: config.request_timeout,
        }
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, UpstreamError> {
        let res = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|err| UpstreamError::from_reqwest(SERVICE, err))?;

        if !res.status().is_success() {
            return Err(UpstreamError::from_response(SERVICE, res).await);
        }

        res.json::<Value>()
            .await
            .map_err(|err| UpstreamError::from_reqwest(SERVICE, err))
    }
}

#[async_trait]
impl EmbeddingClient for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, UpstreamError> {
        let url = format!(
            "{}/models/{}:embedContent?key={}",
            BASE_URL, self.embedding_model, self.api_key
        );
        let body = json!({
            "model": format!("models/{}", self.embedding_model),
            "content": { "parts": [{ "text": text }] },
        });

        let payload = self.post_json(&url, &body).await?;
        parse_embedding(&payload)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(
        &self,
        turns: &[ChatTurn],
        tools: Option<&[ToolDecl]>,
    ) -> Result<ModelReply, UpstreamError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            BASE_URL, self.generation_model, self.api_key
        );
        let body = build_generate_body(turns, tools);

        let payload = self.post_json(&url, &body).await?;
        parse_reply(&payload)
    }
}

fn build_generate_body(turns: &[ChatTurn], tools: Option<&[ToolDecl]>) -> Value {
    let contents: Vec<Value> = turns
        .iter()
        .map(|turn| json!({ "role": turn.role, "parts": turn.parts }))
        .collect();

    let mut body = json!({ "contents": contents });

    if let Some(tools) = tools {
        let declarations: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                })
            })
            .collect();
        body["tools"] = json!([{ "functionDeclarations": declarations }]);
    }

    body
}

/// Extract the embedding vector. A response without a values array, or
/// with a non-numeric entry in it, is malformed; a silently shortened
/// vector must never reach the index.
fn parse_embedding(payload: &Value) -> Result<Vec<f32>, UpstreamError> {
    let values = payload["embedding"]["values"]
        .as_array()
        .ok_or_else(|| UpstreamError::malformed(SERVICE, "embedding values missing"))?;

    values
        .iter()
        .map(|value| {
            value
                .as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| UpstreamError::malformed(SERVICE, "non-numeric embedding value"))
        })
        .collect()
}

/// Pull the text and the first function call, if any, out of the first
/// candidate. A reply with neither is malformed.
fn parse_reply(payload: &Value) -> Result<ModelReply, UpstreamError> {
    let parts = payload["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| UpstreamError::malformed(SERVICE, "no candidate content"))?;

    let mut text = String::new();
    let mut tool_call = None;

    for part in parts {
        if let Some(piece) = part.get("text").and_then(|v| v.as_str()) {
            text.push_str(piece);
        }

        if tool_call.is_none() {
            if let Some(call) = part.get("functionCall") {
                let name = call
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                if !name.is_empty() {
                    let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
                    tool_call = Some(ToolCallRequest { name, args });
                }
            }
        }
    }

    Ok(ModelReply { text, tool_call })
}
