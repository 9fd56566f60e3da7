//! CSV Export

use crate::AnalyticsError;
use storage::QueryLogEntry;

/// Write `rows` as CSV with a header line, returning the number of rows written
pub fn write_csv<W: std::io::Write>(
    rows: &[QueryLogEntry],
    writer: W,
) -> Result<usize, AnalyticsError> {
    let mut csv = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        csv.write_record(["id", "timestamp", "input_text", "model_label", "model_score"])?;
    }
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_csv_header_and_quoting() {
        let rows = vec![QueryLogEntry {
            id: 7,
            timestamp: Utc.with_ymd_and_hms(2025, 11, 3, 12, 0, 0).unwrap(),
            input_text: "Great, \"really\" great".to_string(),
            label: "POSITIVE".to_string(),
            score: 0.99,
        }];

        let mut out = Vec::new();
        assert_eq!(write_csv(&rows, &mut out).unwrap(), 1);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("id,timestamp,input_text,model_label,model_score"));
        assert_eq!(
            lines.next(),
            Some("7,2025-11-03T12:00:00Z,\"Great, \"\"really\"\" great\",POSITIVE,0.99")
        );
    }

    #[test]
    fn test_empty_export_has_header() {
        let mut out = Vec::new();
        assert_eq!(write_csv(&[], &mut out).unwrap(), 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id,timestamp,input_text,model_label,model_score\n"
        );
    }
}
