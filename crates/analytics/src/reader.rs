//! Analytics Reader

use crate::{AnalyticsError, NEGATIVE, POSITIVE};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use storage::{QueryLogEntry, Repository};
use tracing::debug;

/// Time window applied to every view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    AllTime,
    LastHour,
    Last24Hours,
    Last7Days,
}

impl TimeRange {
    /// Earliest timestamp included, `None` for no bound
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::AllTime => None,
            TimeRange::LastHour => Some(now - Duration::hours(1)),
            TimeRange::Last24Hours => Some(now - Duration::hours(24)),
            TimeRange::Last7Days => Some(now - Duration::days(7)),
        }
    }

    /// Human readable name
    pub fn title(&self) -> &'static str {
        match self {
            TimeRange::AllTime => "All Time",
            TimeRange::LastHour => "Last Hour",
            TimeRange::Last24Hours => "Last 24 Hours",
            TimeRange::Last7Days => "Last 7 Days",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for TimeRange {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "all" | "all_time" => Ok(TimeRange::AllTime),
            "hour" | "last_hour" | "1h" => Ok(TimeRange::LastHour),
            "day" | "last_24_hours" | "24h" => Ok(TimeRange::Last24Hours),
            "week" | "last_7_days" | "7d" => Ok(TimeRange::Last7Days),
            _ => Err(AnalyticsError::UnknownRange(s.to_string())),
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Time window shown
    pub range: TimeRange,
    /// Seconds between refreshes
    pub refresh_secs: u64,
    /// Number of histogram buckets over [0, 1]
    pub histogram_bins: u32,
    /// Rows shown in the recent log table
    pub recent_limit: i64,
    /// Maximum rows loaded for trend and export
    pub load_limit: i64,
    /// Write a CSV export here on every refresh
    pub csv_path: Option<PathBuf>,
    /// Render a single frame and exit
    pub once: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            range: TimeRange::AllTime,
            refresh_secs: 5,
            histogram_bins: 20,
            recent_limit: 20,
            load_limit: 5000,
            csv_path: None,
            once: false,
        }
    }
}

/// Headline numbers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: i64,
    pub positive: i64,
    pub negative: i64,
    /// Mean confidence, 0 when there are no rows
    pub average_score: f64,
}

/// Rows per label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
    /// Fraction of all rows in range
    pub share: f64,
}

/// One histogram bucket `[lower, upper)`, the last one closed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    pub lower: f64,
    pub upper: f64,
    pub counts: BTreeMap<String, i64>,
}

impl HistogramBucket {
    /// Rows in this bucket across labels
    pub fn total(&self) -> i64 {
        self.counts.values().sum()
    }
}

/// One point of the sentiment trend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub score: f64,
}

impl From<&QueryLogEntry> for TrendPoint {
    fn from(entry: &QueryLogEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            label: entry.label.clone(),
            score: entry.score,
        }
    }
}

/// Everything one dashboard frame shows
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub range: TimeRange,
    pub generated_at: DateTime<Utc>,
    pub summary: Summary,
    pub distribution: Vec<LabelCount>,
    pub histogram: Vec<HistogramBucket>,
    pub trend: Vec<TrendPoint>,
    pub recent: Vec<QueryLogEntry>,
}

impl DashboardSnapshot {
    /// No rows in range
    pub fn is_empty(&self) -> bool {
        self.summary.total == 0
    }
}

/// Read-only queries over the query log
pub struct AnalyticsReader {
    repository: Repository,
    config: DashboardConfig,
}

impl AnalyticsReader {
    /// Create a reader over `repository`
    pub fn new(repository: Repository, config: DashboardConfig) -> Self {
        Self { repository, config }
    }

    /// Configuration in use
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Totals per label and mean confidence
    pub async fn summary(&self, range: TimeRange) -> Result<Summary, AnalyticsError> {
        self.summary_since(range.cutoff(Utc::now())).await
    }

    /// Row count for every label present in range
    pub async fn label_distribution(
        &self,
        range: TimeRange,
    ) -> Result<Vec<LabelCount>, AnalyticsError> {
        self.distribution_since(range.cutoff(Utc::now())).await
    }

    /// Equal-width confidence buckets over [0, 1] with per-label counts
    pub async fn score_histogram(
        &self,
        range: TimeRange,
    ) -> Result<Vec<HistogramBucket>, AnalyticsError> {
        self.histogram_since(range.cutoff(Utc::now())).await
    }

    /// Scores over time, oldest first
    pub async fn trend(&self, range: TimeRange) -> Result<Vec<TrendPoint>, AnalyticsError> {
        self.trend_since(range.cutoff(Utc::now())).await
    }

    /// Latest rows, newest first
    pub async fn recent_logs(
        &self,
        range: TimeRange,
    ) -> Result<Vec<QueryLogEntry>, AnalyticsError> {
        self.recent_since(range.cutoff(Utc::now())).await
    }

    /// All views for one dashboard frame
    pub async fn snapshot(&self, range: TimeRange) -> Result<DashboardSnapshot, AnalyticsError> {
        self.snapshot_at(range, Utc::now()).await
    }

    /// All views for one frame, every view cut off relative to `now`
    pub async fn snapshot_at(
        &self,
        range: TimeRange,
        now: DateTime<Utc>,
    ) -> Result<DashboardSnapshot, AnalyticsError> {
        let since = range.cutoff(now);
        let snapshot = DashboardSnapshot {
            range,
            generated_at: now,
            summary: self.summary_since(since).await?,
            distribution: self.distribution_since(since).await?,
            histogram: self.histogram_since(since).await?,
            trend: self.trend_since(since).await?,
            recent: self.recent_since(since).await?,
        };
        debug!("Snapshot for {}: {} rows", range, snapshot.summary.total);
        Ok(snapshot)
    }

    async fn summary_since(&self, since: Option<DateTime<Utc>>) -> Result<Summary, AnalyticsError> {
        let counts = self.repository.label_counts(since).await?;
        let average = self.repository.average_score(since).await?;

        let count_of = |label: &str| {
            counts
                .iter()
                .find(|(l, _)| l == label)
                .map(|(_, c)| *c)
                .unwrap_or(0)
        };

        Ok(Summary {
            total: counts.iter().map(|(_, c)| c).sum(),
            positive: count_of(POSITIVE),
            negative: count_of(NEGATIVE),
            average_score: average.unwrap_or(0.0),
        })
    }

    async fn distribution_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<LabelCount>, AnalyticsError> {
        let counts = self.repository.label_counts(since).await?;
        let total: i64 = counts.iter().map(|(_, c)| c).sum();

        Ok(counts
            .into_iter()
            .map(|(label, count)| LabelCount {
                share: if total > 0 { count as f64 / total as f64 } else { 0.0 },
                label,
                count,
            })
            .collect())
    }

    async fn histogram_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<HistogramBucket>, AnalyticsError> {
        let bins = self.config.histogram_bins.max(1);
        let width = 1.0 / f64::from(bins);
        let mut buckets: Vec<HistogramBucket> = (0..bins)
            .map(|i| HistogramBucket {
                lower: f64::from(i) * width,
                upper: f64::from(i + 1) * width,
                counts: BTreeMap::new(),
            })
            .collect();

        for row in self.repository.score_buckets(since, bins).await? {
            let ix = row.bucket.clamp(0, i64::from(bins) - 1) as usize;
            *buckets[ix].counts.entry(row.label).or_insert(0) += row.count;
        }

        Ok(buckets)
    }

    async fn trend_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<TrendPoint>, AnalyticsError> {
        let rows = self
            .repository
            .fetch_chronological(since, self.config.load_limit)
            .await?;
        Ok(rows.iter().map(TrendPoint::from).collect())
    }

    async fn recent_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<QueryLogEntry>, AnalyticsError> {
        Ok(self
            .repository
            .fetch_recent(since, self.config.recent_limit)
            .await?)
    }

    /// Write rows in range (up to the load limit) as CSV
    pub async fn export_csv<W: std::io::Write>(
        &self,
        range: TimeRange,
        writer: W,
    ) -> Result<usize, AnalyticsError> {
        let rows = self
            .repository
            .fetch_recent(range.cutoff(Utc::now()), self.config.load_limit)
            .await?;
        crate::export::write_csv(&rows, writer)
    }
}
