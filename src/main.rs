//! # Food Gateway - Main Entry Point
//!
//! Loads the configuration (`GATEWAY_CONFIG_PATH`, default `config/gateway.yaml`,
//! then environment overrides), installs logging and serves until SIGINT or SIGTERM.

use anyhow::Context;
use tracing::info;

use food_gateway::core::config::DEFAULT_CONFIG_PATH;
use food_gateway::gateway::shutdown_signal;
use food_gateway::observability::init_logging;
use food_gateway::{GatewayConfig, GatewayServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("GATEWAY_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = GatewayConfig::load(&config_path)
        .await
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    init_logging(&config.logging).context("Failed to initialize logging")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path,
        "Starting food gateway"
    );

    let server = GatewayServer::new(config).context("Failed to build gateway")?;
    server.run(shutdown_signal()).await?;

    info!("Food gateway shutdown complete");
    Ok(())
}
