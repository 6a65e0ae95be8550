//! Configuration management for poidata
//!
//! Configuration comes from environment variables or a TOML file. The binary
//! may load a `.env` file first.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::apify::{ClientConfig, DEFAULT_BASE_URL};
use crate::storage::PostgresConfig;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Remote scrape task API
    pub apify: ApifyConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote scrape task settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApifyConfig {
    /// API token
    pub api_key: String,

    /// Task id of the Google Maps extractor
    pub extractor_task_id: String,

    /// Task id of the Google Maps scraper
    pub scraper_task_id: String,

    /// API root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Initial poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub postgres_url: String,

    /// Maximum pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub bind_address: SocketAddr,

    /// Allow any origin
    pub enable_cors: bool,

    /// Trace every request
    pub enable_request_logging: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_pool_size() -> usize {
    10
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];

/// Parse an optional environment variable; a set but malformed value is an error
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Invalid {key}: {raw}")),
        Err(_) => Ok(None),
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl LoggingConfig {
    /// Apply command-line flags on top of the configured values
    ///
    /// `verbose` forces the `debug` level; `format` replaces the configured one.
    #[must_use]
    pub fn with_overrides(mut self, verbose: bool, format: Option<&str>) -> Self {
        if verbose {
            self.level = String::from("debug");
        }
        if let Some(format) = format {
            self.format = format.to_string();
        }
        self
    }

    /// Directives for the subscriber's `EnvFilter`
    ///
    /// Crate events follow the configured level. Dependencies log at `info`
    /// when the crate is at `debug` or `trace`, and at `warn` otherwise.
    pub fn filter_directives(&self) -> String {
        let level = self.level.trim().to_ascii_lowercase();
        let others = if level == "debug" || level == "trace" {
            "info"
        } else {
            "warn"
        };
        format!("poidata={level},{others}")
    }

    pub fn is_json(&self) -> bool {
        self.format.trim().eq_ignore_ascii_case("json")
    }

    /// Reject unknown levels and formats
    pub fn validate(&self) -> Result<()> {
        let level = self.level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            anyhow::bail!(
                "logging.level must be one of {}: {}",
                LOG_LEVELS.join(", "),
                self.level
            );
        }

        let format = self.format.trim().to_ascii_lowercase();
        if !LOG_FORMATS.contains(&format.as_str()) {
            anyhow::bail!(
                "logging.format must be one of {}: {}",
                LOG_FORMATS.join(", "),
                self.format
            );
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("APIFY_KEY").unwrap_or_default();
        let extractor_task_id = std::env::var("APIFY_ACTOR_EXTRACTOR_ID").unwrap_or_default();
        let scraper_task_id = std::env::var("APIFY_ACTOR_SCRAPER_ID").unwrap_or_default();
        let base_url = std::env::var("APIFY_BASE_URL").unwrap_or_else(|_| default_base_url());

        let request_timeout_secs =
            env_parse("APIFY_REQUEST_TIMEOUT")?.unwrap_or_else(default_request_timeout_secs);
        let poll_interval_ms =
            env_parse("APIFY_POLL_INTERVAL_MS")?.unwrap_or_else(default_poll_interval_ms);

        let postgres_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("POSTGRES_URL"))
            .unwrap_or_else(|_| String::from("postgresql://localhost/poidata"));
        let pool_size = env_parse("DB_POOL_SIZE")?.unwrap_or_else(default_pool_size);

        let bind_address =
            env_parse::<SocketAddr>("POIDATA_BIND_ADDRESS")?.unwrap_or_else(default_bind_address);

        let defaults = LoggingConfig::default();
        let level = std::env::var("POIDATA_LOG_LEVEL").unwrap_or(defaults.level);
        let format = std::env::var("POIDATA_LOG_FORMAT").unwrap_or(defaults.format);

        Ok(Self {
            apify: ApifyConfig {
                api_key,
                extractor_task_id,
                scraper_task_id,
                base_url,
                request_timeout_secs,
                poll_interval_ms,
            },
            database: DatabaseConfig {
                postgres_url,
                pool_size,
            },
            server: ServerConfig {
                bind_address,
                ..Default::default()
            },
            logging: LoggingConfig { level, format },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.apify.api_key.trim().is_empty() {
            anyhow::bail!("apify.api_key must not be empty");
        }

        if self.apify.extractor_task_id.trim().is_empty() {
            anyhow::bail!("apify.extractor_task_id must not be empty");
        }

        if self.apify.scraper_task_id.trim().is_empty() {
            anyhow::bail!("apify.scraper_task_id must not be empty");
        }

        Url::parse(&self.apify.base_url)
            .with_context(|| format!("apify.base_url is not a URL: {}", self.apify.base_url))?;

        if self.apify.poll_interval_ms == 0 {
            anyhow::bail!("apify.poll_interval_ms must be greater than 0");
        }

        if self.database.pool_size == 0 {
            anyhow::bail!("pool_size must be greater than 0");
        }

        self.logging.validate()
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.apify.request_timeout_secs)
    }

    /// Get initial poll interval as Duration
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.apify.poll_interval_ms)
    }

    /// Settings for the remote job client
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(
            &self.apify.api_key,
            &self.apify.extractor_task_id,
            &self.apify.scraper_task_id,
        )
        .with_base_url(&self.apify.base_url)
        .with_request_timeout(self.request_timeout())
        .with_poll_interval(self.poll_interval())
    }

    /// Settings for the PostgreSQL pool
    pub fn postgres_config(&self) -> PostgresConfig {
        PostgresConfig::new(&self.database.postgres_url).with_pool_size(self.database.pool_size)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            apify: ApifyConfig {
                api_key: String::new(),
                extractor_task_id: String::new(),
                scraper_task_id: String::new(),
                base_url: default_base_url(),
                request_timeout_secs: default_request_timeout_secs(),
                poll_interval_ms: default_poll_interval_ms(),
            },
            database: DatabaseConfig {
                postgres_url: String::from("postgresql://localhost/poidata"),
                pool_size: default_pool_size(),
            },
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
