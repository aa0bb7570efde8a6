//! Prompt Relay RPC Server - JSON-RPC tool surface over the prompt API.
//!
//! This binary wires the prompt-relay library to a JSON-RPC 2.0 endpoint so
//! tool-calling clients can list, fetch, create, relabel and compile prompts.

mod error;
mod handlers;
mod server;
mod wrapper;

use anyhow::Result;
use clap::Parser;
use prompt_relay::{CacheDefaults, CacheRegistry, ClientConfig, PromptClient, PromptService};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "prompt-relay-rpc")]
#[command(about = "JSON-RPC tool server for a prompt-management API")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Upstream public key
    #[arg(long, env = "LANGFUSE_PUBLIC_KEY", hide_env_values = true)]
    public_key: String,

    /// Upstream secret key
    #[arg(long, env = "LANGFUSE_SECRET_KEY", hide_env_values = true)]
    secret_key: String,

    /// Upstream base URL
    #[arg(long, env = "LANGFUSE_BASEURL")]
    base_url: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long, env = "LANGFUSE_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Retries after the first attempt
    #[arg(long, env = "LANGFUSE_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Seconds between background sweeps of expired cache entries
    #[arg(long, default_value_t = CacheDefaults::SWEEP_INTERVAL.as_secs())]
    sweep_interval_secs: u64,
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.public_key, &self.secret_key);
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config = config.with_request_timeout(Duration::from_millis(timeout_ms));
        }
        if let Some(max_retries) = self.max_retries {
            config = config.with_max_retries(max_retries);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting Prompt Relay RPC Server");

    let config = args.client_config();
    info!("Upstream: {:?}", config);
    let client = PromptClient::new(config)?;

    let registry = CacheRegistry::with_sweeper(Duration::from_secs(args.sweep_interval_secs));
    let service = PromptService::new(Arc::new(client), registry.clone())?;

    let addr = server::start_server(service, &args.host, args.port).await?;

    // Parent processes read the port from stdout
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");
    registry.shutdown();

    Ok(())
}
