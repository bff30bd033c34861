use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use crate::core::config::AppConfig;
use crate::core::errors::UpstreamError;

use super::{IndexRecord, IndexStats, QueryMatch, VectorIndexClient};

const SERVICE: &str = "pinecone";
const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";
const SERVERLESS_CLOUD: &str = "aws";
const SERVERLESS_REGION: &str = "us-east-1";

/// Client for a single named Pinecone index. Index management goes through
/// the control plane; vector operations go to the index's data-plane host,
/// which is resolved on first use and cached for the process lifetime.
pub struct PineconeIndex {
    client: Client,
    api_key: String,
    index_name: String,
    timeout: Duration,
    host: OnceCell<String>,
}

impl PineconeIndex {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.pinecone_api_key.clone(),
            index_name: config.index_name.clone(),
            timeout: config.request_timeout,
            host: OnceCell::new(),
        }
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .timeout(self.timeout)
    }

    /// Control-plane lookup. `Ok(None)` means the index does not exist.
    async fn describe_index(&self) -> Result<Option<Value>, UpstreamError> {
        let url = format!(
            "{}/indexes/{}",
            CONTROL_PLANE_URL,
            urlencoding::encode(&self.index_name)
        );
        let res = self
            .authed(self.client.get(&url))
            .send()
            .await
            .map_err(|err| UpstreamError::from_reqwest(SERVICE, err))?;

        if res.status().as_u16() == 404 {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(UpstreamError::from_response(SERVICE, res).await);
        }

        res.json::<Value>()
            .await
            .map(Some)
            .map_err(|err| UpstreamError::from_reqwest(SERVICE, err))
    }

    async fn data_host(&self) -> Result<&str, UpstreamError> {
        self.host
            .get_or_try_init(|| async {
                let described = self.describe_index().await?.ok_or_else(|| {
                    UpstreamError::malformed(
                        SERVICE,
                        format!("index {} does not exist", self.index_name),
                    )
                })?;
                let host = described["host"]
                    .as_str()
                    .ok_or_else(|| UpstreamError::malformed(SERVICE, "index host missing"))?;
                Ok(format!("https://{}", host))
            })
            .await
            .map(String::as_str)
    }

    async fn post_data(&self, path: &str, body: &Value) -> Result<Value, UpstreamError> {
        let host = self.data_host().await?;
        let url = format!("{}/{}", host, path);
        let res = self
            .authed(self.client.post(&url))
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
impl VectorIndexClient for PineconeIndex {
    async fn ensure_index(&self, dimension: usize) -> Result<(), UpstreamError> {
        if self.describe_index().await?.is_some() {
            return Ok(());
        }

        tracing::info!("index '{}' not found, creating it", self.index_name);
        let body = json!({
            "name": self.index_name,
            "dimension": dimension,
            "metric": "cosine",
            "spec": {
                "serverless": { "cloud": SERVERLESS_CLOUD, "region": SERVERLESS_REGION }
            },
        });

        let res = self
            .authed(self.client.post(format!("{}/indexes", CONTROL_PLANE_URL)))
            .json(&body)
            .send()
            .await
            .map_err(|err| UpstreamError::from_reqwest(SERVICE, err))?;

        // 409: someone else created it between the describe and the create
        if res.status().as_u16() == 409 {
            return Ok(());
        }
        if !res.status().is_success() {
            return Err(UpstreamError::from_response(SERVICE, res).await);
        }

        Ok(())
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<(), UpstreamError> {
        if records.is_empty() {
            return Ok(());
        }
        let body = json!({ "vectors": records });
        self.post_data("vectors/upsert", &body).await?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, UpstreamError> {
        let body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
        });
        let payload = self.post_data("query", &body).await?;
        Ok(parse_matches(&payload))
    }

    async fn stats(&self) -> Result<IndexStats, UpstreamError> {
        let payload = self.post_data("describe_index_stats", &json!({})).await?;
        Ok(IndexStats {
            total_vector_count: payload["totalVectorCount"].as_u64().unwrap_or(0),
            dimension: payload["dimension"].as_u64().unwrap_or(0),
        })
    }
}

fn parse_matches(payload: &Value) -> Vec<QueryMatch> {
    let Some(matches) = payload["matches"].as_array() else {
        return Vec::new();
    };

    matches
        .iter()
        .map(|entry| QueryMatch {
            id: entry["id"].as_str().unwrap_or("").to_string(),
            score: entry["score"].as_f64().unwrap_or(0.0) as f32,
            metadata: entry.get("metadata").cloned().filter(|v| !v.is_null()),
        })
        .collect()
}
