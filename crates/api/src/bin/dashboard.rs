//! Sentiment Dashboard - reads the query log and renders aggregate views

use anyhow::Context;
use api::{dashboard::run_dashboard, init_logging, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_logging(&settings.logging);

    info!("=== Sentiment Dashboard v{} ===", env!("CARGO_PKG_VERSION"));
    run_dashboard(settings).await
}
