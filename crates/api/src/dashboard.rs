//! Dashboard process
//!
//! Periodically reads the query log (read-only) and prints a text dashboard,
//! optionally refreshing a CSV export alongside.

use analytics::{render_text, AnalyticsReader, DashboardConfig};
use anyhow::Context;
use std::fs::File;
use std::future::Future;
use std::io::BufWriter;
use std::time::Duration;
use storage::Repository;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::Settings;

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

/// Render one frame and write the CSV export if configured
pub async fn refresh(reader: &AnalyticsReader) -> anyhow::Result<String> {
    let config = reader.config();
    let snapshot = reader
        .snapshot(config.range)
        .await
        .context("reading query log")?;

    if let Some(path) = &config.csv_path {
        let file = File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        let rows = reader
            .export_csv(config.range, BufWriter::new(file))
            .await
            .context("exporting CSV")?;
        debug!("Exported {} rows to {}", rows, path.display());
    }

    Ok(render_text(&snapshot))
}

/// Run the dashboard loop until Ctrl-C (or after one frame with `once`)
pub async fn run_dashboard(settings: Settings) -> anyhow::Result<()> {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    run_dashboard_until(settings, ctrl_c).await
}

/// Run the dashboard loop until `shutdown` completes
pub async fn run_dashboard_until(
    settings: Settings,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    let config: DashboardConfig = settings.dashboard.clone();
    info!(
        "Starting dashboard: range={}, refresh={}s",
        config.range, config.refresh_secs
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(config.refresh_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut reader: Option<AnalyticsReader> = None;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Dashboard stopping");
                break;
            }
            _ = ticker.tick() => {}
        }

        if reader.is_none() {
            match Repository::connect_read_only(&settings.database).await {
                Ok(repository) => reader = Some(AnalyticsReader::new(repository, config.clone())),
                Err(e) if config.once => return Err(e).context("connecting to database"),
                Err(e) => {
                    warn!("Database not available yet: {}", e);
                    continue;
                }
            }
        }

        let Some(active) = reader.as_ref() else {
            continue;
        };

        match refresh(active).await {
            Ok(frame) => {
                if !config.once {
                    print!("{}", CLEAR_SCREEN);
                }
                println!("{}", frame);
            }
            Err(e) if config.once => return Err(e),
            Err(e) => error!("Dashboard refresh failed: {:#}", e),
        }

        if config.once {
            break;
        }
    }

    Ok(())
}
