//! Tracing setup. stdio is the transport: every JSON-RPC frame goes over
//! stdout, so logs are written to stderr exclusively — a stray `println!`
//! here would corrupt the protocol stream.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::ServerConfig;

/// Installs the global subscriber. `RUST_LOG` overrides `log_level` when
/// present.
pub fn init_telemetry(config: &ServerConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log level configuration")?;

    let fmt_layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::info!(log_level = %config.log_level, "telemetry initialized");
    Ok(())
}

pub fn log_startup_info(config: &ServerConfig, workflow_config_path: &std::path::Path) {
    tracing::info!(
        database_path = %config.database_path,
        use_flyway = config.use_flyway,
        max_connections = config.database_max_connections,
        show_sql = config.database_show_sql,
        workflow_config = %workflow_config_path.display(),
        "task-orchestrator starting up"
    );
}

/// Create a span for database operations.
#[macro_export]
macro_rules! db_span {
    ($operation:expr) => {
        tracing::info_span!("database_operation", operation = $operation)
    };
}

/// Create a span for MCP tool invocations.
#[macro_export]
macro_rules! mcp_span {
    ($tool:expr) => {
        tracing::info_span!("mcp_tool", tool = $tool)
    };
}

/// Logs an error and its full `anyhow` cause chain.
pub fn report_error(error: &anyhow::Error, context: &str) {
    tracing::error!(error = %error, context = context, "operation failed");
    let mut current = error.source();
    let mut depth = 1;
    while let Some(err) = current {
        tracing::error!(error = %err, depth, "error cause");
        current = err.source();
        depth += 1;
    }
}

#[allow(dead_code)]
pub struct PerformanceTimer {
    start: std::time::Instant,
    operation: String,
}

impl PerformanceTimer {
    #[allow(dead_code)]
    pub fn new(operation: impl Into<String>) -> Self {
        let operation = operation.into();
        tracing::debug!(operation = %operation, "starting performance timer");
        Self {
            start: std::time::Instant::now(),
            operation,
        }
    }

    #[allow(dead_code)]
    pub fn finish(self) {
        let duration = self.start.elapsed();
        tracing::info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "operation completed"
        );
        if duration.as_millis() > 1000 {
            tracing::warn!(operation = %self.operation, duration_ms = duration.as_millis(), "slow operation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn performance_timer_does_not_panic() {
        let timer = PerformanceTimer::new("test_operation");
        std::thread::sleep(Duration::from_millis(5));
        timer.finish();
    }
}
