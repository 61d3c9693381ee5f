// src/main.rs

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use vanguard_rs_orchestrator::api::{self, AppState};
use vanguard_rs_orchestrator::bootstrap::build_orchestrator;
use vanguard_rs_orchestrator::config::Config;
use vanguard_rs_orchestrator::core::scanner::availability::check_scanners;
use vanguard_rs_orchestrator::logging::initialize_logging;

mod app;
mod console;
mod ui;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(
    name = "vanguard-rs-orchestrator",
    version,
    about = "Scan job orchestration for external security tools"
)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(long, global = true, env = "VANGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Keep job records in memory instead of on disk.
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        /// Listen address, overrides `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Interactive terminal console (default).
    Console,
    /// Report which external scanners are installed.
    Scanners {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).wrap_err("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Console) {
        Command::Serve { bind } => {
            initialize_logging(true)?;
            serve(config, cli.ephemeral, bind).await
        }
        Command::Console => {
            let log_path = initialize_logging(false)?;
            let orchestrator = build_orchestrator(&config, cli.ephemeral).await?;
            console::run(orchestrator, log_path).await
        }
        Command::Scanners { json } => {
            initialize_logging(false)?;
            print_scanners(&config, json).await
        }
    }
}

async fn serve(config: Config, ephemeral: bool, bind: Option<String>) -> Result<()> {
    let orchestrator = build_orchestrator(&config, ephemeral).await?;
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = TcpListener::bind(&bind)
        .await
        .wrap_err_with(|| format!("cannot bind {bind}"))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let state = AppState {
        orchestrator: orchestrator.clone(),
        scanners: Arc::new(config.scanners.clone()),
    };
    api::serve(listener, state, shutdown).await?;

    if !orchestrator.shutdown(SHUTDOWN_GRACE).await {
        error!("Scan jobs did not finish within the shutdown grace period.");
    }
    info!("Server stopped.");
    Ok(())
}

/// Cancels `shutdown` on Ctrl+C or SIGTERM.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler.");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!(error = %e, "Failed to install SIGTERM handler."),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down."),
        _ = terminate => info!("Received SIGTERM, shutting down."),
    }
    shutdown.cancel();
}

async fn print_scanners(config: &Config, json: bool) -> Result<()> {
    let report = check_scanners(&config.scanners).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    for tool in &report {
        let status = if tool.available { "ok" } else { "MISSING" };
        let detail = tool.version.as_deref().or(tool.error.as_deref()).unwrap_or("");
        println!("{:<10} {:<8} {:<24} {}", tool.tool, status, tool.program, detail);
    }
    Ok(())
}
