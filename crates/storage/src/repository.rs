//! Repository Implementation

use crate::StorageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: [&str; 2] = [
    r#"CREATE TABLE IF NOT EXISTS query_logs (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp   TEXT    NOT NULL,
        input_text  TEXT    NOT NULL,
        model_label TEXT    NOT NULL,
        model_score REAL    NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_query_logs_timestamp ON query_logs (timestamp)",
];

const ENTRY_COLUMNS: &str = "id, timestamp, input_text, model_label, model_score";

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection string
    pub url: String,
    /// Pool size
    pub max_connections: u32,
    /// Seconds to wait for a free connection
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://sentiment.db".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 5,
        }
    }
}

/// One row of the query log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueryLogEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub input_text: String,
    #[sqlx(rename = "model_label")]
    #[serde(rename = "model_label")]
    pub label: String,
    #[sqlx(rename = "model_score")]
    #[serde(rename = "model_score")]
    pub score: f64,
}

/// A classification outcome to append to the log
#[derive(Debug, Clone)]
pub struct NewQueryLog {
    pub input_text: String,
    pub label: String,
    pub score: f64,
}

impl NewQueryLog {
    fn check(&self) -> Result<(), StorageError> {
        if self.input_text.is_empty() {
            return Err(StorageError::InvalidRecord("empty input_text".to_string()));
        }
        if self.label.is_empty() {
            return Err(StorageError::InvalidRecord("empty label".to_string()));
        }
        if !(0.0..=1.0).contains(&self.score) {
            return Err(StorageError::InvalidRecord(format!(
                "score {} outside [0, 1]",
                self.score
            )));
        }
        Ok(())
    }
}

/// Count of rows in one histogram bucket for one label
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ScoreBucketRow {
    pub bucket: i64,
    #[sqlx(rename = "model_label")]
    pub label: String,
    pub count: i64,
}

/// Repository for the query log table
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Connect a read-write pool, creating the database file if missing
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StorageError> {
        info!("Connecting to database: {}", redact(&config.url));
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Connect a read-only pool (used by the analytics reader)
    pub async fn connect_read_only(config: &DatabaseConfig) -> Result<Self, StorageError> {
        info!("Connecting read-only to database: {}", redact(&config.url));
        let options = SqliteConnectOptions::from_str(&config.url)?.read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Single-connection in-memory database with the schema applied
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // One connection that never expires, or the database vanishes
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.init_schema().await?;
        Ok(repo)
    }

    /// Create the table and index if they do not exist
    pub async fn init_schema(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Schema ready: query_logs");
        Ok(())
    }

    /// Append one row, timestamped now
    pub async fn insert_log(&self, log: NewQueryLog) -> Result<QueryLogEntry, StorageError> {
        self.import_log(log, Utc::now()).await
    }

    /// Append one row with an explicit timestamp (backfills and fixtures)
    pub async fn import_log(
        &self,
        log: NewQueryLog,
        timestamp: DateTime<Utc>,
    ) -> Result<QueryLogEntry, StorageError> {
        log.check()?;

        let result = sqlx::query(
            "INSERT INTO query_logs (timestamp, input_text, model_label, model_score) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(timestamp)
        .bind(&log.input_text)
        .bind(&log.label)
        .bind(log.score)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Inserted query log with ID {}", id);

        Ok(QueryLogEntry {
            id,
            timestamp,
            input_text: log.input_text,
            label: log.label,
            score: log.score,
        })
    }

    /// Fetch one row by ID
    pub async fn get(&self, id: i64) -> Result<QueryLogEntry, StorageError> {
        let sql = format!("SELECT {} FROM query_logs WHERE id = ?", ENTRY_COLUMNS);
        sqlx::query_as::<_, QueryLogEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound)
    }

    /// Number of rows at or after `since`
    pub async fn count(&self, since: Option<DateTime<Utc>>) -> Result<i64, StorageError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM query_logs");
        push_since(&mut qb, since);
        Ok(qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?)
    }

    /// Most recent rows first
    pub async fn fetch_recent(
        &self,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<QueryLogEntry>, StorageError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM query_logs", ENTRY_COLUMNS));
        push_since(&mut qb, since);
        qb.push(" ORDER BY timestamp DESC, id DESC LIMIT ");
        qb.push_bind(limit.max(0));
        Ok(qb.build_query_as::<QueryLogEntry>().fetch_all(&self.pool).await?)
    }

    /// The latest `limit` rows, oldest first
    pub async fn fetch_chronological(
        &self,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<QueryLogEntry>, StorageError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {cols} FROM (SELECT {cols} FROM query_logs",
            cols = ENTRY_COLUMNS
        ));
        push_since(&mut qb, since);
        qb.push(" ORDER BY timestamp DESC, id DESC LIMIT ");
        qb.push_bind(limit.max(0));
        qb.push(") ORDER BY timestamp ASC, id ASC");
        Ok(qb.build_query_as::<QueryLogEntry>().fetch_all(&self.pool).await?)
    }

    /// Row counts grouped by label
    pub async fn label_counts(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<(String, i64)>, StorageError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT model_label, COUNT(*) FROM query_logs");
        push_since(&mut qb, since);
        qb.push(" GROUP BY model_label ORDER BY model_label");
        Ok(qb.build_query_as::<(String, i64)>().fetch_all(&self.pool).await?)
    }

    /// Row counts per (score bucket, label) over `bins` equal-width buckets of [0, 1]
    pub async fn score_buckets(
        &self,
        since: Option<DateTime<Utc>>,
        bins: u32,
    ) -> Result<Vec<ScoreBucketRow>, StorageError> {
        let bins = i64::from(bins.max(1));
        // Rounding keeps boundary scores such as 0.29 * 100 out of the bucket below
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT MIN(CAST(ROUND(model_score * ");
        qb.push_bind(bins);
        // A score of exactly 1.0 belongs to the last bucket
        qb.push(", 9) AS INTEGER), ");
        qb.push_bind(bins - 1);
        qb.push(") AS bucket, model_label, COUNT(*) AS count FROM query_logs");
        push_since(&mut qb, since);
        qb.push(" GROUP BY bucket, model_label ORDER BY bucket, model_label");
        Ok(qb.build_query_as::<ScoreBucketRow>().fetch_all(&self.pool).await?)
    }

    /// Mean score, `None` when there are no rows
    pub async fn average_score(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Option<f64>, StorageError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT AVG(model_score) FROM query_logs");
        push_since(&mut qb, since);
        Ok(qb
            .build_query_scalar::<Option<f64>>()
            .fetch_one(&self.pool)
            .await?)
    }

    /// Check the database answers
    pub async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close all pooled connections
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connections closed");
    }
}

fn push_since(qb: &mut QueryBuilder<'_, Sqlite>, since: Option<DateTime<Utc>>) {
    if let Some(cutoff) = since {
        qb.push(" WHERE timestamp >= ");
        qb.push_bind(cutoff);
    }
}

/// Strip credentials from a connection string before logging it
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            format!("{}://***{}", &url[..scheme], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn log(text: &str, label: &str, score: f64) -> NewQueryLog {
        NewQueryLog {
            input_text: text.to_string(),
            label: label.to_string(),
            score,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = Repository::in_memory().await.unwrap();

        let entry = repo
            .insert_log(log("Hey this project is pretty cool!", "POSITIVE", 0.9998))
            .await
            .unwrap();
        assert_eq!(entry.id, 1);

        let stored = repo.get(entry.id).await.unwrap();
        assert_eq!(stored.input_text, "Hey this project is pretty cool!");
        assert_eq!(stored.label, "POSITIVE");
        assert!((stored.score - 0.9998).abs() < 1e-12);
        assert_eq!(stored.timestamp, entry.timestamp);
    }

    #[tokio::test]
    async fn test_ids_are_monotonic_and_rows_not_deduplicated() {
        let repo = Repository::in_memory().await.unwrap();
        let first = repo.insert_log(log("same", "POSITIVE", 0.6)).await.unwrap();
        let second = repo.insert_log(log("same", "POSITIVE", 0.6)).await.unwrap();
        assert!(second.id > first.id);
        assert_eq!(repo.count(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let repo = Repository::in_memory().await.unwrap();
        assert!(matches!(repo.get(42).await, Err(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn test_rejects_invalid_record() {
        let repo = Repository::in_memory().await.unwrap();
        assert!(matches!(
            repo.insert_log(log("text", "POSITIVE", 1.5)).await,
            Err(StorageError::InvalidRecord(_))
        ));
        assert!(matches!(
            repo.insert_log(log("", "POSITIVE", 0.5)).await,
            Err(StorageError::InvalidRecord(_))
        ));
        assert_eq!(repo.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_table_queries() {
        let repo = Repository::in_memory().await.unwrap();
        assert_eq!(repo.count(None).await.unwrap(), 0);
        assert!(repo.fetch_recent(None, 10).await.unwrap().is_empty());
        assert!(repo.label_counts(None).await.unwrap().is_empty());
        assert!(repo.score_buckets(None, 20).await.unwrap().is_empty());
        assert_eq!(repo.average_score(None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_label_counts() {
        let repo = Repository::in_memory().await.unwrap();
        for _ in 0..3 {
            repo.insert_log(log("good", "POSITIVE", 0.9)).await.unwrap();
        }
        for _ in 0..2 {
            repo.insert_log(log("bad", "NEGATIVE", 0.8)).await.unwrap();
        }

        let counts = repo.label_counts(None).await.unwrap();
        assert_eq!(
            counts,
            vec![("NEGATIVE".to_string(), 2), ("POSITIVE".to_string(), 3)]
        );
    }

    #[tokio::test]
    async fn test_score_buckets_edges() {
        let repo = Repository::in_memory().await.unwrap();
        repo.insert_log(log("a", "POSITIVE", 1.0)).await.unwrap();
        repo.insert_log(log("b", "POSITIVE", 0.0)).await.unwrap();
        repo.insert_log(log("c", "NEGATIVE", 0.55)).await.unwrap();

        let buckets = repo.score_buckets(None, 20).await.unwrap();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].bucket, 0);
        assert_eq!(buckets[1].bucket, 11);
        assert_eq!(buckets[1].label, "NEGATIVE");
        assert_eq!(buckets[2].bucket, 19);
    }

    #[tokio::test]
    async fn test_score_buckets_boundary_scores() {
        let repo = Repository::in_memory().await.unwrap();
        repo.insert_log(log("a", "POSITIVE", 0.29)).await.unwrap();
        repo.insert_log(log("b", "POSITIVE", 0.57)).await.unwrap();
        repo.insert_log(log("c", "NEGATIVE", 0.289)).await.unwrap();

        let buckets = repo.score_buckets(None, 100).await.unwrap();
        let found: Vec<(i64, &str)> = buckets
            .iter()
            .map(|b| (b.bucket, b.label.as_str()))
            .collect();
        assert_eq!(found, vec![(28, "NEGATIVE"), (29, "POSITIVE"), (57, "POSITIVE")]);
    }

    #[tokio::test]
    async fn test_time_filter_and_ordering() {
        let repo = Repository::in_memory().await.unwrap();
        let now = Utc::now();
        repo.import_log(log("old", "NEGATIVE", 0.7), now - ChronoDuration::days(3))
            .await
            .unwrap();
        repo.import_log(log("recent", "POSITIVE", 0.9), now - ChronoDuration::minutes(5))
            .await
            .unwrap();
        repo.import_log(log("newest", "POSITIVE", 0.95), now).await.unwrap();

        let cutoff = Some(now - ChronoDuration::hours(1));
        assert_eq!(repo.count(cutoff).await.unwrap(), 2);
        assert_eq!(repo.count(None).await.unwrap(), 3);

        let recent = repo.fetch_recent(None, 2).await.unwrap();
        assert_eq!(recent[0].input_text, "newest");
        assert_eq!(recent[1].input_text, "recent");

        let chrono_rows = repo.fetch_chronological(None, 2).await.unwrap();
        assert_eq!(chrono_rows[0].input_text, "recent");
        assert_eq!(chrono_rows[1].input_text, "newest");

        let avg = repo.average_score(cutoff).await.unwrap().unwrap();
        assert!((avg - 0.925).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let repo = Repository::in_memory().await.unwrap();
        repo.insert_log(log("kept", "POSITIVE", 0.9)).await.unwrap();
        repo.init_schema().await.unwrap();
        assert_eq!(repo.count(None).await.unwrap(), 1);
        repo.ping().await.unwrap();
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("postgres://user:pw@host/db"), "postgres://***@host/db");
        assert_eq!(redact("sqlite://sentiment.db"), "sqlite://sentiment.db");
    }
}
