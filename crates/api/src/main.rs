//! Sentiment Query API - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, Settings};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_logging(&settings.logging);

    info!("=== Sentiment Query API v{} ===", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run_server(settings).await {
        error!("Server failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}
