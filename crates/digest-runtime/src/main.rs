//! # Alarm Digest Service
//!
//! Single-node entry point: the pipeline runs over the in-process broker
//! until Ctrl+C or a fatal task error.
//!
//! ## Environment
//!
//! - `AD_CONFIG_FILE`: properties file (default `config.properties`)
//! - `AD_<FIELD>`: per-field overrides, e.g. `AD_SHARD_COUNT`
//! - `AD_LOG_LEVEL` / `RUST_LOG`, `AD_JSON_LOGS`: logging

use std::sync::Arc;

use anyhow::{Context, Result};
use digest_runtime::{init_logging, load_config, DigestRuntime, LoggingConfig};
use shared_bus::InMemoryBroker;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging(&LoggingConfig::from_env()).context("Failed to initialize logging")?;

    // Load configuration
    let config = load_config().context("Invalid configuration")?;
    info!(?config, "Configuration loaded");

    let broker = Arc::new(InMemoryBroker::new());
    info!("Connected to in-memory broker");

    let runtime = DigestRuntime::start(config, broker.clone())
        .await
        .context("Failed to start digest runtime")?;

    info!("Digest service is running. Press Ctrl+C to stop.");
    let result = runtime
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    broker.close();
    info!("Broker connection closed");

    result.context("Digest runtime stopped with an error")
}
