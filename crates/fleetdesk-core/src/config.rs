//! Application configuration
//!
//! Settings are layered with the `config` crate: built-in defaults, then optional files under
//! `config/`, then `FLEETDESK__*` environment variables.

use crate::error::AppError;
use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Comma separated list of allowed CORS origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_cors_origins() -> String {
    "http://localhost:3000,http://127.0.0.1:3000".to_string()
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Apply pending migrations on startup
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

/// Redis configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,

    /// How many recent searches are kept per agency
    #[serde(default = "default_recent_searches_limit")]
    pub recent_searches_limit: usize,
}

fn default_recent_searches_limit() -> usize {
    10
}

/// Authentication configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// JWT signing secret
    pub jwt_secret: String,

    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: i64,
}

fn default_jwt_expiration() -> i64 {
    1800
}

/// Card payment provider configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PaymentsConfig {
    #[serde(default)]
    pub stripe_secret_key: String,

    #[serde(default = "default_stripe_api_base")]
    pub stripe_api_base: String,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_payment_timeout")]
    pub timeout_ms: u64,
}

fn default_stripe_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_payment_timeout() -> u64 {
    10_000
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            stripe_secret_key: String::new(),
            stripe_api_base: default_stripe_api_base(),
            currency: default_currency(),
            timeout_ms: default_payment_timeout(),
        }
    }
}

/// Report computation settings
#[derive(Debug, Deserialize, Clone)]
pub struct ReportingConfig {
    /// IANA timezone used to cut records into calendar days
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Longest day range a report may span
    #[serde(default = "default_max_range_days")]
    pub max_range_days: i64,
}

/// Three years, leap day included
pub const DEFAULT_MAX_RANGE_DAYS: i64 = 1096;

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_max_range_days() -> i64 {
    DEFAULT_MAX_RANGE_DAYS
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            max_range_days: default_max_range_days(),
        }
    }
}

impl ReportingConfig {
    /// Parse the configured timezone name
    pub fn tz(&self) -> Result<Tz, AppError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| AppError::Config(format!("Unknown reporting timezone: {}", e)))
    }
}

/// Log output settings
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl AppConfig {
    /// Load configuration from defaults, optional files and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("database.max_connections", 10)?
            .set_default("database.run_migrations", false)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("redis.recent_searches_limit", 10)?
            .set_default("auth.jwt_expiration_secs", 1800)?
            .set_default("reporting.timezone", "UTC")?
            .set_default("reporting.max_range_days", DEFAULT_MAX_RANGE_DAYS)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_env)).required(false))
            .add_source(
                Environment::with_prefix("FLEETDESK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings the server cannot start with
    pub fn validate(&self) -> Result<(), AppError> {
        if self.database.url.trim().is_empty() {
            return Err(AppError::Config("database.url must be set".to_string()));
        }
        if self.auth.jwt_secret.len() < 16 {
            return Err(AppError::Config(
                "auth.jwt_secret must be at least 16 bytes".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(AppError::Config("server.port must not be 0".to_string()));
        }
        self.reporting.tz()?;
        if self.reporting.max_range_days < 1 {
            return Err(AppError::Config(
                "reporting.max_range_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
