//! SlackPort - Slack webhook and Web API adapter
//!
//! Serves Slack webhooks for a platform-agnostic message bus and renders
//! canonical messages into Slack Web API requests.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use slackport::{
    config::SlackPortConfig,
    gateway::{Gateway, GatewayBuilder},
    message::Message,
    slack,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "slackport")]
#[command(author = "A3S Lab Team")]
#[command(version)]
#[command(about = "Slack webhook and Web API adapter")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SLACKPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook gateway
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Render a canonical message JSON file into a chat.postMessage body
    Render {
        /// Message file (`-` for stdin)
        file: PathBuf,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    let config = match &cli.config {
        Some(path) => SlackPortConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SlackPortConfig::default(),
    };

    match cli.command {
        Commands::Serve { host, port } => {
            run_gateway(config, host, port).await?;
        }
        Commands::Render { file } => {
            render(&file)?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("slackport={},tower_http={}", log_level, log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_gateway(config: SlackPortConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut builder = GatewayBuilder::new().config(config);
    if let Some(host) = host {
        builder = builder.host(host);
    }
    if let Some(port) = port {
        builder = builder.port(port);
    }
    let gateway: Arc<Gateway> = Arc::new(builder.build()?);

    // No downstream consumer is attached in standalone mode: log what would
    // have been handed to the bus.
    if let Some(mut bus) = gateway.take_bus().await {
        tokio::spawn(async move {
            while let Some(message) = bus.recv().await {
                match serde_json::to_string(&message) {
                    Ok(json) => tracing::info!(kind = %message.kind, message = %json, "Inbound message"),
                    Err(e) => tracing::warn!("Failed to encode inbound message: {}", e),
                }
            }
        });
    }

    let handle = gateway.start().await?;
    tracing::info!(
        "SlackPort is listening on {}. Press Ctrl+C to stop.",
        handle.local_addr()
    );

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    handle.shutdown().await?;

    Ok(())
}

fn render(file: &Path) -> Result<()> {
    let content = if file.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?
    };
    let message: Message = serde_json::from_str(&content).context("Invalid message JSON")?;

    match slack::body(&message) {
        Some(body) => println!("{}", serde_json::to_string_pretty(&body)?),
        None => {
            eprintln!("Nothing to send for a '{}' message", message.kind);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn show_config(config: Option<&SlackPortConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    println!("{}", config.to_toml()?);
    Ok(())
}
