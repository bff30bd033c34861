use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

/// Failure of a call to one of the external services (embedding model,
/// generation model, vector index). Carries enough of the cause for the
/// caller to tell transient failures from permanent ones.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} request timed out")]
    Timeout { service: &'static str },
    #[error("{service} rate limited the request")]
    RateLimited { service: &'static str },
    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("{service} network error: {message}")]
    Network {
        service: &'static str,
        message: String,
    },
    #[error("unexpected {service} response: {message}")]
    Malformed {
        service: &'static str,
        message: String,
    },
}

impl UpstreamError {
    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout { service }
        } else {
            UpstreamError::Network {
                service,
                message: err.to_string(),
            }
        }
    }

    /// Convert a non-success HTTP response into an error, consuming the body.
    pub async fn from_response(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        if status == 429 {
            UpstreamError::RateLimited { service }
        } else {
            UpstreamError::Status {
                service,
                status,
                body,
            }
        }
    }

    pub fn malformed(service: &'static str, message: impl Into<String>) -> Self {
        UpstreamError::Malformed {
            service,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Timeout { .. }
            | UpstreamError::RateLimited { .. }
            | UpstreamError::Network { .. } => true,
            UpstreamError::Status { status, .. } => *status >= 500,
            UpstreamError::Malformed { .. } => false,
        }
    }
}
