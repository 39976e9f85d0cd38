#![forbid(unsafe_code)]

//! `zxtouch-ipc-ctl` — local CLI companion for `zxtouch-ipcd`.
//!
//! Connects to the daemon endpoint, sends one command, and prints the reply.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use zxtouch_ipc::ipc::client::ClientStub;
use zxtouch_ipc::models::command::Command as WireCommand;
use zxtouch_ipc::models::endpoint::EndpointName;
use zxtouch_ipc::models::reply::Reply;
use zxtouch_ipc::{AppError, GlobalConfig, Result};

#[derive(Debug, Parser)]
#[command(
    name = "zxtouch-ipc-ctl",
    about = "Local CLI for the zxtouch command daemon",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Endpoint name (must match the daemon's `endpoint_name`).
    #[arg(long)]
    endpoint: Option<String>,

    /// Reply timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Press the Home button.
    Home,

    /// Run a daemon-interpreted task.
    Task {
        /// Task text, sent without the wire prefix.
        payload: String,
    },

    /// Send raw bytes exactly as given.
    Raw {
        /// Message text.
        message: String,
    },
}

impl Command {
    fn to_wire(&self) -> WireCommand {
        match self {
            Self::Home => WireCommand::Home,
            Self::Task { payload } => WireCommand::task(payload.clone().into_bytes()),
            Self::Raw { message } => WireCommand::Unknown {
                raw: message.clone().into_bytes().into(),
            },
        }
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();

    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match send(&config, &args.command.to_wire()) {
        Ok(Reply::Ack) => {
            println!("OK");
            ExitCode::SUCCESS
        }
        Ok(Reply::Data { data }) => {
            println!("{}", String::from_utf8_lossy(&data));
            ExitCode::SUCCESS
        }
        Ok(Reply::Error { code, message }) => {
            eprintln!("Error: {}: {message}", code.as_str());
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("Failed to reach daemon: {err}");
            eprintln!(
                "Is zxtouch-ipcd running with endpoint_name '{}'?",
                config.endpoint_name
            );
            ExitCode::FAILURE
        }
    }
}

fn resolve_config(args: &Cli) -> Result<GlobalConfig> {
    let mut config = match args.config {
        Some(ref path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };
    if let Some(ref endpoint) = args.endpoint {
        config.endpoint_name = EndpointName::new(endpoint.clone())?;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.request_timeout_ms = timeout_ms;
    }
    config.validate()?;
    Ok(config)
}

/// Connect, send one command, and return the decoded reply.
fn send(config: &GlobalConfig, command: &WireCommand) -> Result<Reply> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Io(format!("failed to build tokio runtime: {err}")))?;

    runtime.block_on(async {
        let mut client = ClientStub::from_config(config);
        let reply = client.send_command(command).await;
        client.close();
        reply
    })
}
