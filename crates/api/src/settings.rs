//! Layered configuration
//!
//! Defaults, then `config/default.toml` (or `$SENTIMENT_CONFIG`), then
//! `SENTIMENT__SECTION__KEY` environment variables, then `DATABASE_URL`.

use analytics::DashboardConfig;
use config::{Config, ConfigError, Environment, File};
use data_validator::ValidationConfig;
use inference_engine::InferenceConfig;
use serde::{Deserialize, Serialize};
use storage::DatabaseConfig;

use crate::rate_limit::RateLimitConfig;

const DEFAULT_CONFIG_FILE: &str = "config/default";

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// `host:port` to bind
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub validation: ValidationConfig,
    pub inference: InferenceConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub dashboard: DashboardConfig,
}

impl Settings {
    /// Load from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("SENTIMENT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load with `path` as the (optional) config file
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let mut settings: Settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("SENTIMENT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            settings.database.url = url;
        }
        Ok(settings)
    }
}
