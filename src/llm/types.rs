use serde_json::{json, Value};

/// One turn of a generation exchange. Parts use the generation service's
/// content shape: text, functionCall or functionResponse objects.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: String,
    pub parts: Vec<Value>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![json!({ "text": text.into() })],
        }
    }

    pub fn model_tool_call(call: &ToolCallRequest) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![json!({
                "functionCall": { "name": call.name, "args": call.args }
            })],
        }
    }

    pub fn tool_result(name: &str, output: &str) -> Self {
        Self {
            role: "function".to_string(),
            parts: vec![json!({
                "functionResponse": {
                    "name": name,
                    "response": { "result": output }
                }
            })],
        }
    }
}

/// A tool the model is allowed to call: name, description and a JSON
/// schema object for its parameters.
#[derive(Debug, Clone)]
pub struct ToolDecl {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Structured tool invocation emitted by the model.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub name: String,
    pub args: Value,
}

/// Parsed model reply: concatenated text parts plus the first tool call,
/// if one was requested.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub text: String,
    pub tool_call: Option<ToolCallRequest>,
}
