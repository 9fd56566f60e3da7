//! Query Log Analytics
//!
//! Read-only views over the query log: KPIs, label distribution, score
//! histogram, trend series and recent rows, plus CSV export and a plain-text
//! dashboard renderer.

mod export;
mod reader;
mod render;

pub use export::write_csv;
pub use reader::{
    AnalyticsReader, DashboardConfig, DashboardSnapshot, HistogramBucket, LabelCount, Summary,
    TimeRange, TrendPoint,
};
pub use render::render_text;

use thiserror::Error;

/// Label values written by the query service
pub const POSITIVE: &str = "POSITIVE";
pub const NEGATIVE: &str = "NEGATIVE";

/// Analytics errors
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),
    #[error("Export error: {0}")]
    Export(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unknown time range: {0}")]
    UnknownRange(String),
}
