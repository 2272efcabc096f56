//! SecOps API - Main Entry Point

use anyhow::{anyhow, Context};
use api::{init_logging, run_server, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    init_logging(&settings.logging).map_err(|e| anyhow!("failed to initialize logging: {}", e))?;

    info!("=== SecOps API v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Store: {}", settings.database.url);

    run_server(settings).await
}
