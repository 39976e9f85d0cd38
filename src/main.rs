#![forbid(unsafe_code)]

//! `zxtouch-ipcd` — reference daemon host for the zxtouch command channel.
//!
//! Bootstraps configuration and logging, binds the endpoint, and serves
//! commands until SIGINT/SIGTERM. The built-in action handler only records
//! each command in the log; device builds link their own handler.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use zxtouch_ipc::ipc::server::Dispatcher;
use zxtouch_ipc::models::endpoint::EndpointName;
use zxtouch_ipc::protocol::handler::ActionHandler;
use zxtouch_ipc::{AppError, GlobalConfig, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "zxtouch-ipcd", about = "zxtouch command channel daemon", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the endpoint name from the configuration.
    #[arg(long)]
    endpoint: Option<String>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

/// Handler that logs each command and reports success.
struct LoggingHandler;

impl ActionHandler for LoggingHandler {
    fn handle_home(&self) -> Result<()> {
        info!("home action requested");
        Ok(())
    }

    fn handle_task(&self, payload: &[u8]) -> Result<Option<Vec<u8>>> {
        let task = String::from_utf8_lossy(payload);
        info!(%task, "task requested");
        Ok(None)
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("zxtouch-ipcd bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = match args.config {
        Some(ref path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };
    if let Some(endpoint) = args.endpoint {
        config.endpoint_name = EndpointName::new(endpoint)?;
    }
    info!(endpoint = %config.endpoint_name, "configuration loaded");

    // ── Bind endpoint (fail fast on a duplicate instance) ──
    let dispatcher = Dispatcher::from_config(&config, Arc::new(LoggingHandler))?;

    let ct = CancellationToken::new();
    let handle = dispatcher.spawn(ct.clone());

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    match handle.await {
        Ok(result) => result?,
        Err(err) => error!(%err, "dispatcher task failed"),
    }
    info!("zxtouch-ipcd shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                if let Err(err) = ctrl_c.await {
                    tracing::error!(%err, "ctrl-c signal handler failed");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
