//! Tool capabilities callable by the generation model or directly by a
//! request handler. The only tool today is ticket creation.

use rand::Rng;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::llm::types::{ToolCallRequest, ToolDecl};

pub const TICKET_TOOL_NAME: &str = "create_ticket";

/// Declaration of the ticket tool, offered to the generation model.
pub fn ticket_tool_decl() -> ToolDecl {
    ToolDecl {
        name: TICKET_TOOL_NAME.to_string(),
        description: "Create a support ticket for the customer when their \
                      issue needs follow-up from the support team."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "email": {
                    "type": "string",
                    "description": "Customer email address for follow-up."
                },
                "issue_description": {
                    "type": "string",
                    "description": "Short description of the customer's issue."
                }
            },
            "required": ["email", "issue_description"]
        }),
    }
}

/// Dispatch a model-requested tool call.
pub fn execute_tool(call: &ToolCallRequest) -> Result<String, ApiError> {
    match call.name.as_str() {
        TICKET_TOOL_NAME => {
            let email = call
                .args
                .get("email")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim();
            let issue = call
                .args
                .get("issue_description")
                .or_else(|| call.args.get("description"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim();

            if email.is_empty() {
                return Err(ApiError::BadRequest("Ticket email missing".to_string()));
            }

            Ok(create_ticket(email, issue))
        }
        _ => Err(ApiError::BadRequest(format!("Unknown tool: {}", call.name))),
    }
}

/// Create a support ticket: returns a confirmation carrying a fresh
/// 4-digit ticket id. Nothing is persisted; the log line is the only
/// operator-visible record.
pub fn create_ticket(email: &str, issue_description: &str) -> String {
    let ticket_id: u32 = rand::rng().random_range(1000..=9999);
    tracing::info!(
        "created ticket #{} for {}: {}",
        ticket_id,
        email,
        issue_description
    );
    format!(
        "Your support ticket #{} has been created. Our team will contact you at {} shortly.",
        ticket_id, email
    )
}
