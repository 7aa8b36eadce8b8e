//! Process wiring for the task-orchestration MCP server: environment
//! configuration, telemetry setup, and assembly of the
//! [`mcp_protocol::WorkOrchestratorHandler`] that `main` serves over
//! stdio.

pub mod config;
pub mod setup;
pub mod telemetry;

pub use config::ServerConfig;
pub use setup::build_handler;
pub use telemetry::init_telemetry;
