//! Query Text Validator

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum text length in characters, counted after trimming
    pub max_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { max_length: 5000 }
    }
}

/// Validator for query payload text
#[derive(Debug, Clone)]
pub struct QueryValidator {
    config: ValidationConfig,
}

impl QueryValidator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate `text`, returning the trimmed form that is classified and stored
    pub fn validate(&self, text: &str) -> Result<String, ValidationError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("Rejected empty query text");
            return Err(ValidationError::Empty);
        }

        let length = trimmed.chars().count();
        if length > self.config.max_length {
            debug!("Rejected query text of {} characters", length);
            return Err(ValidationError::TooLong {
                max: self.config.max_length,
                actual: length,
            });
        }

        Ok(trimmed.to_string())
    }

    /// Configured maximum length
    pub fn max_length(&self) -> usize {
        self.config.max_length
    }
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
