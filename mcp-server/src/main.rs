//! `task-orchestrator`: an MCP server exposing a work-item orchestration
//! engine over stdio JSON-RPC.
//!
//! Configuration is environment-only (`DATABASE_PATH`, `USE_FLYWAY`,
//! `AGENT_CONFIG_DIR`, `LOG_LEVEL`, `DATABASE_MAX_CONNECTIONS`,
//! `DATABASE_SHOW_SQL`) — there is no CLI surface beyond `--help`/
//! `--version`, since every deployment of this server is driven by an
//! MCP client that launches it as a subprocess.
//!
//! Exit code 0 on clean shutdown (stdin closed by the client, or a
//! SIGTERM/SIGINT drained within the shutdown deadline); exit code 1 on
//! a fatal startup failure (bad config, unreachable database, broken
//! workflow config file).

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mcp_server::setup::build_handler;
use mcp_server::telemetry::{init_telemetry, log_startup_info, report_error};
use mcp_server::ServerConfig;
use rmcp::ServiceExt;
use tracing::{info, warn};

/// Time given to an in-flight stdio request to finish after a
/// SIGTERM/SIGINT before the process exits anyway.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "task-orchestrator")]
#[command(about = "MCP work-item orchestration server (stdio transport)")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let _ = Cli::parse();

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            // Telemetry may not be initialized yet if the failure happened
            // before `init_telemetry`; stderr is always safe.
            eprintln!("task-orchestrator: fatal startup error: {err:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = ServerConfig::from_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    init_telemetry(&config).context("failed to initialize telemetry")?;
    log_startup_info(&config, &config.workflow_config_path());

    let handler = build_handler(&config)
        .await
        .context("failed to initialize work-item orchestrator")?;

    info!("serving MCP requests over stdio");
    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let service = handler
        .serve(transport)
        .await
        .context("failed to start stdio transport")?;

    let mut serve_task = tokio::spawn(service.waiting());

    tokio::select! {
        result = &mut serve_task => {
            match result {
                Ok(Ok(_)) => {
                    info!("stdio transport closed, shutting down cleanly");
                    Ok(())
                }
                Ok(Err(err)) => {
                    let err = anyhow::Error::from(err);
                    report_error(&err, "stdio transport");
                    Err(err)
                }
                Err(join_err) => Err(anyhow::anyhow!("server task panicked: {join_err}")),
            }
        }
        _ = shutdown_signal() => {
            info!(deadline_secs = SHUTDOWN_DEADLINE.as_secs(), "shutdown signal received, draining in-flight requests");
            match tokio::time::timeout(SHUTDOWN_DEADLINE, &mut serve_task).await {
                Ok(_) => info!("drained cleanly before deadline"),
                Err(_) => {
                    warn!("shutdown deadline elapsed, aborting in-flight requests");
                    serve_task.abort();
                }
            }
            Ok(())
        }
    }
}

/// Resolves on SIGTERM or SIGINT (Ctrl+C). On platforms without Unix
/// signal support this only watches Ctrl+C.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(sig) => sig,
            Err(err) => {
                warn!(error = %err, "failed to register SIGTERM handler, falling back to Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
