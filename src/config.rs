// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the comment board service.
//!
//! Every field has a serde default, so an empty environment yields a working
//! service apart from the admin identity, which is loaded separately by
//! [`crate::admin::AdminIdentity::from_env`].

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while assembling configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Invalid admin password hash: {0}")]
    InvalidPasswordHash(String),
}

/// Configuration for the comment board service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8100)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// SQLite database file, or `memory` for a throwaway database
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Origins allowed to call the API from a browser
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Take the client IP from `X-Forwarded-For` (default: true)
    #[serde(default = "default_true")]
    pub trust_proxy: bool,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Pagination configuration
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Per-IP posting window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Admission window in seconds (default: 86400, one day)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Delete rate-limit records older than this many seconds.
    /// `None` keeps records forever.
    #[serde(default)]
    pub retention_secs: Option<u64>,

    /// How often the pruning task runs, in seconds (default: 3600)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

/// Listing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size when the client does not ask for one (default: 5)
    #[serde(default = "default_page_limit")]
    pub default_limit: u32,

    /// Upper bound on the page size a client may request (default: 100)
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8100".to_string()
}

fn default_database_path() -> String {
    "comments.db".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["https://lain.ovh".to_string()]
}

fn default_window_secs() -> u64 {
    24 * 60 * 60
}

fn default_cleanup_interval_secs() -> u64 {
    3600
}

fn default_page_limit() -> u32 {
    5
}

fn default_max_limit() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            database_path: default_database_path(),
            allowed_origins: default_allowed_origins(),
            trust_proxy: default_true(),
            rate_limit: RateLimitConfig::default(),
            pagination: PaginationConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            retention_secs: None,
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl Config {
    /// Overlay environment variables on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset keys keep their
    /// default; set but unparsable keys are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(v) = lookup("BIND_ADDR") {
            config.bind_addr = v;
        }
        if let Some(v) = lookup("DATABASE_PATH") {
            config.database_path = v;
        }
        if let Some(v) = lookup("ALLOWED_ORIGINS") {
            config.allowed_origins = v
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup("TRUST_PROXY") {
            config.trust_proxy = parse_bool("TRUST_PROXY", &v)?;
        }
        if let Some(v) = lookup("RATE_LIMIT_WINDOW_SECS") {
            config.rate_limit.window_secs = parse_num("RATE_LIMIT_WINDOW_SECS", &v)?;
        }
        if let Some(v) = lookup("RATE_LIMIT_RETENTION_SECS") {
            config.rate_limit.retention_secs = Some(parse_num("RATE_LIMIT_RETENTION_SECS", &v)?);
        }
        if let Some(v) = lookup("MAX_PAGE_SIZE") {
            config.pagination.max_limit = parse_num("MAX_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("METRICS_ENABLED") {
            config.metrics.enabled = parse_bool("METRICS_ENABLED", &v)?;
        }

        if config.rate_limit.window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "RATE_LIMIT_WINDOW_SECS",
                value: "0".to_string(),
            });
        }
        if config.pagination.max_limit == 0 {
            return Err(ConfigError::InvalidValue {
                var: "MAX_PAGE_SIZE",
                value: "0".to_string(),
            });
        }

        Ok(config)
    }

    /// Allowed origins in their serialized `scheme://host[:port]` form.
    /// Entries that are not absolute URLs are skipped.
    pub fn normalized_origins(&self) -> Vec<String> {
        self.allowed_origins
            .iter()
            .filter_map(|o| normalize_origin(o))
            .collect()
    }
}

impl RateLimitConfig {
    /// Get the admission window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Retention period, never shorter than the admission window.
    pub fn retention_duration(&self) -> Option<Duration> {
        self.retention_secs
            .map(|secs| Duration::from_secs(secs.max(self.window_secs)))
    }

    /// Get the pruning interval
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

/// Reduce an origin (or any URL) to `scheme://host[:port]`.
pub fn normalize_origin(origin: &str) -> Option<String> {
    let parsed = Url::parse(origin.trim()).ok()?;
    match parsed.origin() {
        origin @ url::Origin::Tuple(..) => Some(origin.ascii_serialization()),
        url::Origin::Opaque(_) => None,
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_num<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}
