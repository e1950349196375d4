use anyhow::Result;
use clap::{Parser, Subcommand};
use gemini_relay::client;
use gemini_relay::config::Config;
use gemini_relay::gateway::{self, AppState};
use gemini_relay::providers::GeminiInvoker;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gemini-relay", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay gateway.
    Serve {
        /// Listening port (overrides PORT and the config file).
        #[arg(long)]
        port: Option<u16>,
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Send one message (and optionally a file) to a running relay.
    Ask {
        /// The message to send.
        message: Option<String>,
        /// A .txt or .pdf file to upload alongside the message.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Relay base URL.
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        url: String,
        /// Render the finished reply's markup instead of raw streaming.
        #[arg(long)]
        rendered: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Serve { port, config } => {
            let mut config = Config::load(config.as_deref())?;
            if let Some(port) = port {
                config.port = port;
            }
            let invoker = GeminiInvoker::new(&config)?;
            let state = AppState {
                invoker: Arc::new(invoker),
                spool_dir: PathBuf::from(&config.spool_dir),
            };
            gateway::serve(config.port, state).await
        }
        Command::Ask {
            message,
            file,
            url,
            rendered,
        } => client::run_ask(&url, message, file, rendered).await,
    }
}
