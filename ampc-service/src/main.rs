//! ampc service binary
//!
//! Two roles behind one executable:
//! - `ampc worker <operation>`: one-shot control-plane operations against an
//!   amphora agent
//! - `ampc agent`: the amphora agent API server

use ampc_agent::AgentServer;
use ampc_core::constants::DEFAULT_AGENT_PORT;
use ampc_core::Config;
use ampc_worker::{ControllerWorker, Endpoints};
use anyhow::Result;
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ampc")]
#[command(about = "Amphora control plane")]
struct Args {
    /// Config file path (JSON or YAML); conventional paths are probed when
    /// omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run a control-plane operation against an amphora agent
    Worker {
        #[command(subcommand)]
        operation: WorkerOperation,
    },

    /// Run the amphora agent API server
    Agent {
        /// Bind host override
        #[arg(long)]
        host: Option<String>,

        /// Bind port override
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(clap::Subcommand, Debug)]
enum WorkerOperation {
    /// Fetch the agent's version info
    GetAgentInfo {
        #[arg(long)]
        host: String,

        #[arg(long, default_value_t = DEFAULT_AGENT_PORT)]
        port: u16,
    },

    /// Run the agent's self-test
    Diagnostics {
        #[arg(long)]
        host: String,

        #[arg(long, default_value_t = DEFAULT_AGENT_PORT)]
        port: u16,
    },

    /// Remove a listener from the agent
    DeleteListener {
        #[arg(long)]
        host: String,

        #[arg(long, default_value_t = DEFAULT_AGENT_PORT)]
        port: u16,

        #[arg(long)]
        listener_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().compact())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    match args.command {
        Commands::Agent { host, port } => {
            if let Some(host) = host {
                config.agent_server.bind_host = host;
            }
            if let Some(port) = port {
                config.agent_server.bind_port = port;
            }
            AgentServer::new(&config.agent_server).serve().await?;
        }
        Commands::Worker { operation } => {
            info!(host = %config.host, "Starting controller worker");
            let endpoints = Endpoints::new(ControllerWorker::new(&config)?);

            let (name, params) = match operation {
                WorkerOperation::GetAgentInfo { host, port } => {
                    ("get_agent_info", json!({"host": host, "port": port}))
                }
                WorkerOperation::Diagnostics { host, port } => {
                    ("get_agent_diagnostics", json!({"host": host, "port": port}))
                }
                WorkerOperation::DeleteListener {
                    host,
                    port,
                    listener_id,
                } => (
                    "delete_listener",
                    json!({"host": host, "port": port, "listener_id": listener_id}),
                ),
            };

            let result = endpoints.handle(name, params).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
