//! Error handling for the MCP protocol layer.
//!
//! Domain errors never escape as JSON-RPC protocol-level failures: every
//! tool handler reports them inside the uniform response envelope so a
//! client always gets `{success, data|error, metadata}` back, regardless
//! of which of the six closed codes applies.
//! `McpError` (rmcp's `ErrorData`) is reserved for genuine protocol
//! faults — a tool name or parameter shape the framework itself can't
//! parse — which is the only place this layer still surfaces a
//! transport-level error.

use rmcp::ErrorData as McpError;
use task_core::error::{Blocker, OrchestratorError};

/// The envelope's `error` field: a stable code plus a human message and,
/// for `DEPENDENCY_ERROR`, the structured blockers list.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blockers: Option<Vec<Blocker>>,
}

impl From<&OrchestratorError> for ErrorPayload {
    fn from(err: &OrchestratorError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            blockers: err.blockers().map(|b| b.to_vec()),
        }
    }
}

/// Escape hatch for request shapes the tool router itself rejects before
/// a domain call is even attempted (e.g. an `operation` string outside
/// the handler's known set). Kept distinct from [`ErrorPayload`] because
/// it never carries one of the six closed codes — it's a protocol-level
/// `invalid_params`, not a domain outcome.
pub fn invalid_operation(tool: &str, operation: &str) -> McpError {
    McpError::invalid_params(format!("{tool}: unknown operation '{operation}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_closed_code() {
        let err = OrchestratorError::not_found_item(7);
        let payload = ErrorPayload::from(&err);
        assert_eq!(payload.code, "RESOURCE_NOT_FOUND");
        assert!(payload.blockers.is_none());
    }

    #[test]
    fn dependency_payload_carries_blockers() {
        let blocker = Blocker {
            dependency_id: 1,
            blocker_item_id: 2,
            blocker_role: "QUEUE".into(),
            required_role: "TERMINAL".into(),
        };
        let err = OrchestratorError::Dependency(vec![blocker]);
        let payload = ErrorPayload::from(&err);
        assert_eq!(payload.code, "DEPENDENCY_ERROR");
        assert_eq!(payload.blockers.unwrap().len(), 1);
    }
}
