//! Plain-text dashboard rendering

use crate::reader::DashboardSnapshot;
use std::fmt::Write;

const BAR_WIDTH: usize = 40;
const TEXT_WIDTH: usize = 60;
const TREND_POINTS: usize = 15;

/// Render one dashboard frame
pub fn render_text(snapshot: &DashboardSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Sentiment Analysis Dashboard | {} | generated {}",
        snapshot.range,
        snapshot.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "{}", "=".repeat(78));

    if snapshot.is_empty() {
        let _ = writeln!(out, "No data available for the selected time range.");
        return out;
    }

    let summary = &snapshot.summary;
    let _ = writeln!(
        out,
        "Total Queries: {}   Positive: {}   Negative: {}   Avg Confidence: {:.2}",
        summary.total, summary.positive, summary.negative, summary.average_score
    );

    let _ = writeln!(out, "\nSentiment Distribution");
    for entry in &snapshot.distribution {
        let _ = writeln!(
            out,
            "  {:<9} {:<width$} {:>5.1}% ({})",
            entry.label,
            bar(entry.share),
            entry.share * 100.0,
            entry.count,
            width = BAR_WIDTH
        );
    }

    let _ = writeln!(out, "\nConfidence Score Distribution");
    let peak = snapshot
        .histogram
        .iter()
        .map(|b| b.total())
        .max()
        .unwrap_or(0)
        .max(1);
    for bucket in snapshot.histogram.iter().filter(|b| b.total() > 0) {
        let detail = bucket
            .counts
            .iter()
            .map(|(label, count)| format!("{} {}", label, count))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "  {:.2}-{:.2} {:<width$} {} ({})",
            bucket.lower,
            bucket.upper,
            bar(bucket.total() as f64 / peak as f64),
            bucket.total(),
            detail,
            width = BAR_WIDTH
        );
    }

    let _ = writeln!(out, "\nSentiment Trend (latest {})", TREND_POINTS);
    let skip = snapshot.trend.len().saturating_sub(TREND_POINTS);
    for point in snapshot.trend.iter().skip(skip) {
        let _ = writeln!(
            out,
            "  {}  {:<9} {:.4}",
            point.timestamp.format("%Y-%m-%d %H:%M:%S"),
            point.label,
            point.score
        );
    }

    let _ = writeln!(out, "\nRecent Query Logs");
    for entry in &snapshot.recent {
        let _ = writeln!(
            out,
            "  #{:<6} {}  {:<9} {:.4}  {}",
            entry.id,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.label,
            entry.score,
            truncate(&entry.input_text, TEXT_WIDTH)
        );
    }

    out
}

fn bar(fraction: f64) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(filled)
}

fn truncate(text: &str, max: usize) -> String {
    let single_line = text.replace(['\n', '\r'], " ");
    if single_line.chars().count() <= max {
        return single_line;
    }
    let mut cut: String = single_line.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
