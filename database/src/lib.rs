//! SQLite persistence for the task-orchestration core.
//!
//! Offers a single [`SqliteStore`] that implements all four repository
//! traits from `task_core::repository`, WAL-mode connection setup, and
//! the two schema bring-up paths ([`SqliteStore::migrate`] for
//! versioned migrations, [`SqliteStore::bootstrap`] for a plain
//! `CREATE TABLE IF NOT EXISTS` path) selected by the `USE_FLYWAY`
//! environment variable at the server layer.
//!
//! ```no_run
//! use database::SqliteStore;
//!
//! # async fn run() -> task_core::error::Result<()> {
//! let store = SqliteStore::connect(":memory:").await?;
//! store.bootstrap().await?;
//! let repos = store.repositories();
//! # Ok(())
//! # }
//! ```

mod common;
mod sqlite;

pub use sqlite::SqliteStore;

pub use task_core::error::{OrchestratorError, Result};
