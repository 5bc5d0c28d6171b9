//! parley relay daemon
//!
//! Accepts chat clients over TCP, asks each for a display name, replays the
//! chat history and relays every line to everybody in the room.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default address (0.0.0.0:8091)
//! parleyd
//!
//! # Listen somewhere else
//! parleyd --bind 127.0.0.1:9000
//! PARLEY_BIND=127.0.0.1:9000 parleyd
//!
//! # Use an explicit config file
//! parleyd --config ./parley.toml
//!
//! # Enable debug logging
//! RUST_LOG=parleyd=debug parleyd
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: stop accepting and exit

use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use parleyd::config::{Config, BIND_ENV_VAR};
use parleyd::room::spawn_room;
use parleyd::server::ChatServer;

/// Log directives used when `RUST_LOG` is unset or unusable.
const DEFAULT_LOG_DIRECTIVES: &str = "parleyd=info,parley_core=info,parley_protocol=info";

/// parley relay daemon - line-oriented TCP chat
#[derive(Parser, Debug)]
#[command(name = "parleyd", version, about)]
struct Args {
    /// Address to listen on (overrides config file and PARLEY_BIND)
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<String>,

    /// Config file (default: $XDG_CONFIG_HOME/parley/config.toml if present)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Resolves the effective configuration from file, environment and flags.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    if let Ok(bind) = env::var(BIND_ENV_VAR) {
        config = config
            .with_bind(&bind)
            .with_context(|| format!("Invalid {BIND_ENV_VAR}"))?;
    }

    if let Some(bind) = &args.bind {
        config = config.with_bind(bind).context("Invalid --bind")?;
    }

    Ok(config)
}

/// Builds the log filter, preferring an explicit `RUST_LOG` over the defaults.
fn build_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVES))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let rust_log = env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(rust_log.as_deref()))
        .init();

    let config = load_config(&args).context("Failed to load configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        bind = %config.bind,
        "parley relay starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let room = spawn_room();

    let server = ChatServer::bind(&config, room, cancel_token)
        .await
        .context("Failed to start server")?;

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("parley relay stopped");
    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
