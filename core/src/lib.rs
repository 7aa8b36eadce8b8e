//! Domain core for the task-orchestration MCP server.
//!
//! No I/O happens in this crate beyond `async-trait` signatures the
//! `database` crate implements. Everything here is pure Rust plus the
//! three-phase transition algorithm, which only talks to the store
//! through the [`repository`] traits.
//!
//! - [`models`] — work items, notes, dependencies, role transitions, note
//!   schema entries.
//! - [`error`] — the closed `OrchestratorError` taxonomy.
//! - [`repository`] — persistence traits, implemented by `database` and
//!   `mocks`.
//! - [`schema`] — the note schema service (tag -> ordered note contracts).
//! - [`transition`] — resolve/validate/apply, the orchestration core.
//! - [`cascade`] — cascade detection/application and completion cleanup.
//! - [`workflow_config`] — `completion_cleanup`/`auto_cascade` policy.
//! - [`validation`] — pure invariant checks for create/update payloads.

pub mod cascade;
pub mod error;
pub mod models;
pub mod repository;
pub mod schema;
pub mod transition;
pub mod validation;
pub mod workflow_config;

pub use cascade::CascadeEvent;
pub use error::{Blocker, OrchestratorError, Result};
pub use models::{
    Dependency, DependencyType, NewDependency, NewWorkItem, Note, NoteRole, NoteSchema,
    NoteSchemaEntry, NoteUpsert, Priority, Role, RoleTransitionRecord, Trigger, UpdateWorkItem,
    WorkItem, WorkItemFilter,
};
pub use repository::{
    DependencyRepository, NoteRepository, OverviewNode, Repositories, RoleCounts,
    RoleTransitionRepository, WorkItemRepository,
};
pub use schema::NoteSchemaService;
pub use transition::{ExpectedNote, Resolution, StatusLabelAction, TransitionOutcome, ValidationOutcome};
pub use validation::{DependencyValidator, NoteValidator, WorkItemValidator};
pub use workflow_config::{AutoCascadeConfig, CompletionCleanupConfig, WorkflowConfig};

/// Current version of the core crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
