//! # Forwarding Gateway
//!
//! Entry point for one gateway instance.
//!
//! Configuration comes from the environment (`PORT`, `BIND_HOST`, `WS_PATH`,
//! `CERT_PATH`, `KEY_PATH`, `TLS_DISABLED`, `HOSTNAME`, `REDIS_URL`,
//! `OUTBOUND_CAPACITY`); log verbosity from `RUST_LOG`.

use anyhow::{Context, Result};
use fwd_gateway::GatewayConfig;
use gateway_runtime::GatewayRuntime;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = GatewayConfig::from_env().context("Failed to load gateway configuration")?;

    let runtime = GatewayRuntime::start(config)
        .await
        .context("Failed to start gateway runtime")?;

    info!("Gateway is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;

    Ok(())
}
