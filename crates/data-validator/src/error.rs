//! Validation Error Types

use thiserror::Error;

/// Errors during query validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Text is empty or whitespace only
    #[error("text must not be empty")]
    Empty,

    /// Text exceeds the configured maximum length
    #[error("text is {actual} characters long, maximum is {max}")]
    TooLong { max: usize, actual: usize },

    /// Body is JSON but not a valid query (missing or mistyped field)
    #[error("Invalid request body: {0}")]
    InvalidFormat(String),
}
