use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Dimension of the embedding model's output vectors. Fixed by the model
/// (text-embedding-004), not configurable.
pub const EMBEDDING_DIMENSION: usize = 768;

pub const DEFAULT_INDEX_NAME: &str = "aven-support-agent";
const DEFAULT_GENERATION_MODEL: &str = "gemini-1.5-pro-latest";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
const DEFAULT_TOP_K: usize = 5;
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingCredential(&'static str),
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

/// Voice-assistant credentials. Optional at startup; their absence is only
/// surfaced when the config endpoint is called.
#[derive(Debug, Clone, Default)]
pub struct VoiceConfig {
    pub public_key: Option<String>,
    pub assistant_id: Option<String>,
}

impl VoiceConfig {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.public_key.as_deref(), self.assistant_id.as_deref()) {
            (Some(key), Some(id)) => Some((key, id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub google_api_key: String,
    pub pinecone_api_key: String,
    pub index_name: String,
    pub generation_model: String,
    pub embedding_model: String,
    pub top_k: usize,
    pub request_timeout: Duration,
    pub port: u16,
    pub paths: AppPaths,
    pub voice: VoiceConfig,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Load configuration from the process environment. Missing core
    /// credentials fail here, before the server starts accepting traffic.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let google_api_key = require(&get, "GOOGLE_API_KEY")?;
        let pinecone_api_key = require(&get, "PINECONE_API_KEY")?;

        let index_name = non_empty(get("INDEX_NAME")).unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string());
        let generation_model =
            non_empty(get("GENERATION_MODEL")).unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string());
        let embedding_model =
            non_empty(get("EMBEDDING_MODEL")).unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());

        let top_k = get("RETRIEVAL_TOP_K")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_TOP_K)
            .clamp(1, 20);

        let request_timeout = get("REQUEST_TIMEOUT_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
            .clamp(1, 300);

        let port = get("PORT")
            .and_then(|val| val.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let paths = AppPaths {
            data_dir: PathBuf::from(non_empty(get("DATA_DIR")).unwrap_or_else(|| "./data".to_string())),
            log_dir: PathBuf::from(non_empty(get("LOG_DIR")).unwrap_or_else(|| "./logs".to_string())),
        };

        let voice = VoiceConfig {
            public_key: non_empty(get("VAPI_PUBLIC_KEY")),
            assistant_id: non_empty(get("VAPI_ASSISTANT_ID")),
        };

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|val| {
                val.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(|origin| origin.to_string())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            google_api_key,
            pinecone_api_key,
            index_name,
            generation_model,
            embedding_model,
            top_k,
            request_timeout: Duration::from_secs(request_timeout),
            port,
            paths,
            voice,
            cors_allowed_origins,
        })
    }
}

fn require(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<String, ConfigError> {
    non_empty(get(key)).ok_or(ConfigError::MissingCredential(key))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
