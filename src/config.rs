// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the RSS to CSV export service.
//!
//! Every value is sourced from the environment with a default. Values that
//! fail to parse fall back to their default rather than aborting startup,
//! and so do durations shorter than a millisecond.

use serde::{Deserialize, Serialize};
use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

/// Configuration for the export service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listen address; the `:port` form binds all interfaces (default: :8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Inbound server timeouts
    #[serde(default)]
    pub server: ServerConfig,

    /// Outbound feed fetch configuration
    #[serde(default)]
    pub fetch: FetchConfig,

    /// URL validation configuration
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// CSV export configuration
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Inbound server timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Budget for reading a request before the outbound fetch (default: 15s)
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Budget for the client to accept each CSV chunk (default: 15s)
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Budget for in-flight requests to drain on shutdown (default: 30s)
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

/// Outbound feed fetch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Whole-request timeout for the upstream fetch (default: 30s)
    #[serde(default = "default_fetch_timeout_ms")]
    pub timeout_ms: u64,

    /// User-Agent sent upstream
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum accepted feed body in bytes (default: 10 MiB)
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size: u64,
}

/// URL validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum accepted URL length in bytes (default: 2048)
    #[serde(default = "default_max_url_length")]
    pub max_url_length: usize,
}

/// Per-client token bucket configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Bucket capacity; refills at one token per second (default: 60)
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Idle visitor sweep interval in milliseconds (default: 5 minutes)
    #[serde(default = "default_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,
}

/// CSV export configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Strip HTML when the request carries no `sanitize` parameter
    #[serde(default)]
    pub default_sanitize: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Verbosity: DEBUG, INFO, WARN, ERROR (default: INFO)
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
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
    ":8080".to_string()
}

fn default_read_timeout_ms() -> u64 {
    15_000
}

fn default_write_timeout_ms() -> u64 {
    15_000
}

fn default_shutdown_timeout_ms() -> u64 {
    30_000
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    "RSS-to-CSV-Exporter/1.0".to_string()
}

fn default_max_feed_size() -> u64 {
    10 * 1024 * 1024
}

fn default_max_url_length() -> usize {
    2048
}

fn default_requests_per_minute() -> u32 {
    60
}

fn default_cleanup_interval_ms() -> u64 {
    5 * 60 * 1000
}

fn default_log_level() -> String {
    "INFO".to_string()
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
            server: ServerConfig::default(),
            fetch: FetchConfig::default(),
            validation: ValidationConfig::default(),
            rate_limit: RateLimitConfig::default(),
            export: ExportConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_fetch_timeout_ms(),
            user_agent: default_user_agent(),
            max_feed_size: default_max_feed_size(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_url_length: default_max_url_length(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            cleanup_interval_ms: default_cleanup_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
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
    /// Load configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let duration_ms = |key: &str, default: u64| {
            get(key)
                .and_then(|v| parse_duration(&v))
                .map(|d| d.as_millis() as u64)
                .filter(|&ms| ms > 0)
                .unwrap_or(default)
        };

        Self {
            bind_addr: get("PORT").unwrap_or_else(default_bind_addr),
            server: ServerConfig {
                read_timeout_ms: duration_ms("READ_TIMEOUT", default_read_timeout_ms()),
                write_timeout_ms: duration_ms("WRITE_TIMEOUT", default_write_timeout_ms()),
                shutdown_timeout_ms: duration_ms("SHUTDOWN_TIMEOUT", default_shutdown_timeout_ms()),
            },
            fetch: FetchConfig {
                timeout_ms: duration_ms("RSS_FETCH_TIMEOUT", default_fetch_timeout_ms()),
                user_agent: get("USER_AGENT").unwrap_or_else(default_user_agent),
                max_feed_size: get("MAX_RSS_SIZE")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or_else(default_max_feed_size),
            },
            validation: ValidationConfig {
                max_url_length: get("MAX_URL_LENGTH")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or_else(default_max_url_length),
            },
            rate_limit: RateLimitConfig {
                requests_per_minute: get("RATE_LIMIT_PER_MIN")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or_else(default_requests_per_minute),
                cleanup_interval_ms: duration_ms("RATE_LIMIT_CLEANUP", default_cleanup_interval_ms()),
            },
            export: ExportConfig {
                default_sanitize: get("DEFAULT_SANITIZE")
                    .and_then(|v| parse_bool(&v))
                    .unwrap_or(false),
            },
            logging: LoggingConfig {
                level: get("LOG_LEVEL").unwrap_or_else(default_log_level),
                format: match get("LOG_FORMAT").map(|v| v.trim().to_lowercase()).as_deref() {
                    Some("text") | Some("pretty") => LogFormat::Text,
                    _ => LogFormat::Json,
                },
            },
            metrics: MetricsConfig {
                enabled: get("METRICS_ENABLED")
                    .and_then(|v| parse_bool(&v))
                    .unwrap_or_else(default_true),
                path: get("METRICS_PATH").unwrap_or_else(default_metrics_path),
            },
        }
    }

    /// Resolve the listen address, expanding `:port` to all interfaces.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        match self.bind_addr.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}").parse(),
            None => self.bind_addr.parse(),
        }
    }

    /// Budget for producing a response: reading the request plus the
    /// upstream fetch. Streaming the body afterwards is bounded per chunk
    /// by the write timeout instead.
    pub fn request_timeout(&self) -> Duration {
        self.server.read_timeout() + self.fetch.timeout()
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl FetchConfig {
    /// Get the upstream fetch timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl RateLimitConfig {
    /// Get the idle sweep interval
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }
}

impl LoggingConfig {
    /// Map the configured level name to a tracing filter. Unknown names
    /// resolve to INFO.
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.trim().to_uppercase().as_str() {
            "TRACE" => LevelFilter::TRACE,
            "DEBUG" => LevelFilter::DEBUG,
            "WARN" | "WARNING" => LevelFilter::WARN,
            "ERROR" | "FATAL" => LevelFilter::ERROR,
            _ => LevelFilter::INFO,
        }
    }
}

/// Parse a duration in the `time.Duration` notation: one or more
/// decimal amounts with a unit (`ns`, `us`, `µs`, `ms`, `s`, `m`, `h`),
/// as in `15s`, `1.5s` or `1m30s`. A bare integer is read as seconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let mut rest = value;
    let mut nanos = 0f64;
    while !rest.is_empty() {
        let split = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (amount, tail) = rest.split_at(split);
        let amount: f64 = amount.parse().ok()?;

        let split = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(split);
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };

        nanos += amount * scale;
        rest = tail;
    }

    if value.is_empty() || !nanos.is_finite() || nanos > u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(nanos.round() as u64))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
