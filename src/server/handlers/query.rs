use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::state::AppState;

/// What callers see for any answering failure. The upstream detail stays in
/// the logs.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred.";

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
}

/// Answer a support question. The ticket tool is offered to the model, so a
/// question like "my card was declined, file a ticket" can resolve in one
/// round trip.
pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let answer = state
        .answers
        .answer_with_tools(&payload.query)
        .await
        .map_err(|err| {
            tracing::error!("query endpoint failed: {}", err);
            ApiError::internal(INTERNAL_ERROR_MESSAGE)
        })?;

    Ok(Json(QueryResponse { answer }))
}
