use thiserror::Error;

/// Result type alias for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// A single unsatisfied blocking dependency, surfaced on a `DependencyError`
/// so a tool handler can report exactly what is blocking a transition.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Blocker {
    pub dependency_id: i64,
    pub blocker_item_id: i64,
    pub blocker_role: String,
    pub required_role: String,
}

/// Stable error taxonomy for the orchestration engine. The variant a result
/// carries maps 1:1 onto one of six closed MCP error codes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    /// Parameter shape/value violates a tool schema or domain invariant:
    /// depth overflow, unknown trigger, missing required note on a gated
    /// transition.
    #[error("validation error: {0}")]
    Validation(String),

    /// An entity id did not resolve.
    #[error("not found: {0}")]
    NotFound(String),

    /// Optimistic-concurrency failure, duplicate unique key, or a
    /// dependency insert that would close a blocking cycle.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Transition refused because blocking dependencies are unsatisfied.
    #[error("dependency error: {} blocker(s) unsatisfied", .0.len())]
    Dependency(Vec<Blocker>),

    /// SQLite-level failure. Transient failures (e.g. busy-timeout
    /// exhaustion) are retryable by the client.
    #[error("database error: {0}")]
    Database(String),

    /// Catch-all for anything else, always logged with a correlation id.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    pub fn not_found_item(id: i64) -> Self {
        Self::NotFound(format!("work item {id} not found"))
    }

    pub fn depth_overflow(attempted_depth: i32) -> Self {
        Self::Validation(format!(
            "depth {attempted_depth} exceeds maximum of {}",
            crate::models::WorkItem::MAX_DEPTH
        ))
    }

    pub fn unknown_trigger(valid: &[&str]) -> Self {
        Self::Validation(format!(
            "unknown trigger, expected one of: {}",
            valid.join(", ")
        ))
    }

    pub fn already_terminal() -> Self {
        Self::Validation("item is already terminal".to_string())
    }

    pub fn must_resume_first() -> Self {
        Self::Validation("item is blocked, resume before starting or completing".to_string())
    }

    pub fn resume_on_non_blocked() -> Self {
        Self::Validation("resume is only valid on a blocked item".to_string())
    }

    pub fn resume_without_previous_role() -> Self {
        Self::Internal("blocked item has no recorded previous role".to_string())
    }

    pub fn cyclic_dependency() -> Self {
        Self::Conflict("dependency would close a blocking cycle".to_string())
    }

    pub fn missing_notes(keys: Vec<String>) -> Self {
        Self::Validation(format!("missing required notes: {}", keys.join(", ")))
    }

    /// The stable MCP error code for this variant, one of the closed six-code set.
    pub fn code(&self) -> &'static str {
        match self {
            OrchestratorError::Validation(_) => "VALIDATION_ERROR",
            OrchestratorError::NotFound(_) => "RESOURCE_NOT_FOUND",
            OrchestratorError::Conflict(_) => "CONFLICT_ERROR",
            OrchestratorError::Dependency(_) => "DEPENDENCY_ERROR",
            OrchestratorError::Database(_) => "DATABASE_ERROR",
            OrchestratorError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, OrchestratorError::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, OrchestratorError::Validation(_))
    }

    pub fn is_database(&self) -> bool {
        matches!(self, OrchestratorError::Database(_))
    }

    pub fn blockers(&self) -> Option<&[Blocker]> {
        match self {
            OrchestratorError::Dependency(blockers) => Some(blockers),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_closed_set() {
        assert_eq!(OrchestratorError::not_found_item(1).code(), "RESOURCE_NOT_FOUND");
        assert_eq!(OrchestratorError::already_terminal().code(), "VALIDATION_ERROR");
        assert_eq!(OrchestratorError::cyclic_dependency().code(), "CONFLICT_ERROR");
        assert_eq!(
            OrchestratorError::Dependency(vec![]).code(),
            "DEPENDENCY_ERROR"
        );
        assert_eq!(
            OrchestratorError::Database("busy".into()).code(),
            "DATABASE_ERROR"
        );
        assert_eq!(OrchestratorError::Internal("oops".into()).code(), "INTERNAL_ERROR");
    }

    #[test]
    fn dependency_error_carries_blockers() {
        let blocker = Blocker {
            dependency_id: 1,
            blocker_item_id: 2,
            blocker_role: "QUEUE".into(),
            required_role: "TERMINAL".into(),
        };
        let err = OrchestratorError::Dependency(vec![blocker.clone()]);
        assert_eq!(err.blockers(), Some(&[blocker][..]));
    }
}
