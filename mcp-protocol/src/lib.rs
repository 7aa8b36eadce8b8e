//! MCP protocol layer for the task-orchestration server.
//!
//! Bridges `task_core`'s domain traits to the Model Context Protocol over
//! stdio, via the [`rmcp`] crate's `#[tool_router]` macro. Every tool call
//! returns the uniform response envelope documented in
//! [`serialization`]; JSON-RPC/transport-level errors (reserved for
//! genuinely malformed requests) are documented in [`error`].
//!
//! - [`error`] — the envelope's `error` field shape, plus the escape
//!   hatch for unrecognized tool operations.
//! - [`serialization`] — the `{success, data, error, metadata}` envelope
//!   builders every tool handler returns through.
//! - [`tools`] — [`tools::WorkOrchestratorHandler`], the 13-tool
//!   `#[tool_router]` implementation.

pub mod error;
pub mod serialization;
pub mod tools;

pub use error::ErrorPayload;
pub use serialization::{err, ok, ok_with_message, Envelope, Metadata};
pub use tools::WorkOrchestratorHandler;
