use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::state::AppState;
use crate::tooling;

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub email: String,
    pub issue_description: String,
}

#[derive(Debug, Serialize)]
pub struct CreateTicketResponse {
    pub message: String,
}

/// Create a support ticket directly, bypassing the model.
pub async fn create_ticket(
    State(_state): State<Arc<AppState>>,
    Json(payload): Json<CreateTicketRequest>,
) -> Result<Json<CreateTicketResponse>, ApiError> {
    let email = payload.email.trim();
    let issue_description = payload.issue_description.trim();
    if email.is_empty() || issue_description.is_empty() {
        return Err(ApiError::BadRequest(
            "email and issue_description are required".to_string(),
        ));
    }

    let message = tooling::create_ticket(email, issue_description);
    Ok(Json(CreateTicketResponse { message }))
}
