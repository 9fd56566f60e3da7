//! Storage Layer
//!
//! SQLite persistence for the append-only `query_logs` table, with the
//! repository pattern.

mod repository;

pub use repository::{DatabaseConfig, NewQueryLog, QueryLogEntry, Repository, ScoreBucketRow};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Record not found")]
    NotFound,
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}
