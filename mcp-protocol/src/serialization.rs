//! The uniform response envelope every tool handler returns:
//! `{success, message?, data, error?, metadata{timestamp, version}}`,
//! carried as a single pretty-printed JSON text block inside an rmcp
//! `CallToolResult`.

use chrono::{DateTime, Utc};
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::Value;
use task_core::error::OrchestratorError;

use crate::error::ErrorPayload;

#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            version: task_core::VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
    pub metadata: Metadata,
}

fn to_call_tool_result(envelope: &Envelope) -> CallToolResult {
    let text = serde_json::to_string_pretty(envelope)
        .unwrap_or_else(|e| format!(r#"{{"success":false,"error":{{"code":"INTERNAL_ERROR","message":"{e}"}}}}"#));
    if envelope.success {
        CallToolResult::success(vec![Content::text(text)])
    } else {
        CallToolResult::error(vec![Content::text(text)])
    }
}

/// Serializes `data` into the envelope's success shape.
pub fn ok<T: Serialize>(data: T) -> CallToolResult {
    ok_with_message(data, None)
}

pub fn ok_with_message<T: Serialize>(data: T, message: Option<String>) -> CallToolResult {
    let envelope = Envelope {
        success: true,
        message,
        data: serde_json::to_value(data).unwrap_or(Value::Null),
        error: None,
        metadata: Metadata::default(),
    };
    to_call_tool_result(&envelope)
}

/// Wraps a domain error in the envelope's failure shape. Domain errors
/// are never propagated as JSON-RPC protocol errors — the closed
/// six-code taxonomy always rides inside `error.code`.
pub fn err(error: &OrchestratorError) -> CallToolResult {
    let envelope = Envelope {
        success: false,
        message: Some(error.to_string()),
        data: Value::Null,
        error: Some(ErrorPayload::from(error)),
        metadata: Metadata::default(),
    };
    to_call_tool_result(&envelope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_round_trips_through_json() {
        let result = ok(serde_json::json!({"id": 1}));
        assert_eq!(result.is_error, Some(false));
    }

    #[test]
    fn err_envelope_marks_is_error() {
        let result = err(&OrchestratorError::not_found_item(1));
        assert_eq!(result.is_error, Some(true));
    }
}
