use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::state::AppState;

/// Spoken when answering fails mid-call. The voice platform expects a 200
/// with an assistant message either way, so failures never surface as a
/// non-2xx here.
const VOICE_FAILURE_LINE: &str = "I'm sorry, I'm having trouble answering that right now.";

/// Hand the browser the voice-assistant credentials. Their absence is only
/// an error here, not at startup; deployments without voice never hit it.
pub async fn get_voice_config(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let (public_key, assistant_id) = state
        .config
        .voice
        .credentials()
        .ok_or_else(|| ApiError::Internal("Missing Vapi credentials.".to_string()))?;

    Ok(Json(json!({
        "publicKey": public_key,
        "assistantId": assistant_id,
    })))
}

/// Pull the user's query out of an assistant-request payload. Any other
/// message type, or a payload without a usable last message, yields None.
fn webhook_query(payload: &Value) -> Option<&str> {
    let message = payload.get("message")?;
    if message.get("type").and_then(Value::as_str) != Some("assistant-request") {
        return None;
    }
    message
        .get("messages")?
        .as_array()?
        .last()?
        .get("content")?
        .as_str()
}

/// Voice-assistant webhook. Only assistant-request messages are answered;
/// everything else (status updates, end-of-call reports, malformed bodies)
/// gets an empty object back.
pub async fn vapi_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    let Some(query) = webhook_query(&payload) else {
        return Json(json!({}));
    };

    let content = match state.answers.answer(query).await {
        Ok(answer) => answer,
        Err(err) => {
            tracing::error!("webhook answering failed: {}", err);
            VOICE_FAILURE_LINE.to_string()
        }
    };

    Json(json!({
        "message": { "role": "assistant", "content": content }
    }))
}
