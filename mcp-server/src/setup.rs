//! Wires the process together: connects the store, brings the schema
//! up, loads workflow policy, and builds the
//! [`mcp_protocol::WorkOrchestratorHandler`] `main` serves over stdio.

use anyhow::{Context, Result};
use database::SqliteStore;
use mcp_protocol::WorkOrchestratorHandler;
use task_core::NoteSchemaService;

use crate::config::{load_workflow_settings, ServerConfig};

/// Connects to the configured database, brings the schema up (migrated
/// or bootstrapped per `USE_FLYWAY`), loads `.taskorchestrator/config.yaml`,
/// and returns a ready-to-serve handler.
pub async fn build_handler(config: &ServerConfig) -> Result<WorkOrchestratorHandler> {
    let store = SqliteStore::connect_with_options(
        &config.database_path,
        config.database_max_connections,
        config.database_show_sql,
    )
    .await
    .context("failed to connect to the database")?;

    if config.use_flyway {
        store.migrate().await.context("migration failed")?;
    } else {
        store.bootstrap().await.context("schema bootstrap failed")?;
    }

    let workflow_path = config.workflow_config_path();
    let settings = load_workflow_settings(&workflow_path)
        .with_context(|| format!("failed to load {}", workflow_path.display()))?;

    let schema = NoteSchemaService::new(settings.note_schemas);
    let repos = store.repositories();

    Ok(WorkOrchestratorHandler::new(repos, schema, settings.workflow))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_memory_config() -> ServerConfig {
        ServerConfig {
            database_path: ":memory:".to_string(),
            use_flyway: false,
            agent_config_dir: Some("/nonexistent".to_string()),
            log_level: "info".to_string(),
            database_max_connections: 1,
            database_show_sql: false,
        }
    }

    #[tokio::test]
    async fn builds_handler_against_a_fresh_in_memory_database() {
        let config = in_memory_config();
        let handler = build_handler(&config).await;
        assert!(handler.is_ok());
    }
}
