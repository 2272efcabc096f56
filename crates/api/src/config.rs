//! Server Settings
//!
//! Layered with the `config` crate:
//! 1. built-in defaults
//! 2. `{config_dir}/default.*` then `{config_dir}/{RUN_MODE}.*` (both optional)
//! 3. `SECOPS__SECTION__KEY` environment variables
//! 4. `DATABASE_URL`, overriding `database.url`

use ::config::{Config, ConfigError, Environment, File};
use data_validator::ValidationConfig;
use serde::Deserialize;

use crate::rate_limit::RateLimitConfig;

/// Default store location
pub const DEFAULT_DATABASE_URL: &str = "sqlite://secops.db?mode=rwc";

/// Environment variable prefix
const ENV_PREFIX: &str = "SECOPS";

/// Top-level settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    /// `host:port` string for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// `sqlite:` URL, or `memory://` for the in-memory store
    pub url: String,
    pub max_connections: u32,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// Single-line output
    Compact,
    /// JSON lines, for log aggregation
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter used when `RUST_LOG` is not set
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Settings {
    /// Load settings from `SECOPS_CONFIG_DIR` (default `config`) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("SECOPS_CONFIG_DIR").unwrap_or_else(|_| "config".into());
        Self::load_from(&config_dir)
    }

    /// Load settings with files taken from `config_dir`
    pub fn load_from(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.url", DEFAULT_DATABASE_URL)?
            .set_default("database.max_connections", 5)?
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        if let Ok(database_url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", database_url)?;
        }

        builder.build()?.try_deserialize()
    }
}
