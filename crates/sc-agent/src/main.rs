//! Collector Sidecar Agent
//!
//! Registers the node with the coordination server and keeps the locally
//! supervised log collectors in line with the server's assignments.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use sc_agent::api::HttpTransport;
use sc_agent::daemon::Daemon;
use sc_agent::logging::{self, LogSettings};
use sc_agent::render::FileRenderer;
use sc_agent::services::start_periodicals;
use sc_agent::AgentState;
use sc_core::config::{self, Platform, SidecarConfig};
use sc_core::node_id::resolve_node_id;
use sc_core::traits::Supervisor;

#[derive(Parser)]
#[command(name = "sc-agent")]
#[command(about = "Collector sidecar - keeps local log collectors in sync with the server")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    debug: bool,

    /// Validate the configuration, print it and exit
    #[arg(long)]
    check_config: bool,
}

fn load_configuration(path: Option<&PathBuf>) -> Result<SidecarConfig> {
    if let Some(path) = path {
        return config::load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path));
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        config::load_config(&default_path)
            .with_context(|| format!("Failed to load config from {:?}", default_path))
    } else {
        SidecarConfig::defaults(Platform::current()).context("Failed to build default config")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_configuration(args.config.as_ref())?;

    if args.check_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    // Initialize logging
    let log_level = if args.debug { "debug" } else { &args.log_level };
    logging::init(&LogSettings::from_config(&config, log_level));

    tracing::info!("Collector sidecar starting...");

    let node_id = resolve_node_id(&config.node_id, &config.cache_path)
        .context("Failed to resolve node id")?;
    tracing::info!("Node: {} ({})", config.node_name(), node_id);
    tracing::info!("Server: {}", config.server_url);

    let transport = Arc::new(
        HttpTransport::new(&config, node_id.clone()).context("Failed to create HTTP client")?,
    );
    let supervisor = Arc::new(Daemon::new(&config));
    let renderer = Arc::new(FileRenderer::new(&config));
    let state = AgentState::new(config, node_id);

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();

    // Setup signal handlers
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        cancel_clone.cancel();
    });

    let loops = start_periodicals(
        &state,
        transport,
        supervisor.clone(),
        renderer,
        cancel.clone(),
    );

    for result in futures::future::join_all(loops).await {
        if let Err(e) = result {
            tracing::error!("Loop task failed: {}", e);
        }
    }

    supervisor.stop_all().await;
    tracing::info!("Sidecar shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
