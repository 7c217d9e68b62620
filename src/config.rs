//! Configuration Module
//!
//! Handles loading and managing sidecar configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::refresh::{RetryPolicy, TtlPolicy};

/// Sidecar configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of signed URLs the cache holds
    pub max_entries: usize,
    /// Expired-entry sweep interval in seconds
    pub cleanup_interval: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Base URL of the backend that issues signed URLs
    pub backend_url: String,
    /// Cache lifetime per URL type
    pub ttl: TtlPolicy,
    /// Load-failure recovery bounds
    pub retry: RetryPolicy,
    /// Timeout for the HEAD status check, in milliseconds
    pub probe_timeout_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cached urls (default: 500)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `BACKEND_URL` - Signed url backend (default: http://localhost:8080/api)
    /// - `PREVIEW_TTL_MINUTES` / `THUMBNAIL_TTL_MINUTES` (default: 50)
    /// - `AVATAR_TTL_MINUTES` (default: 1380)
    /// - `MAX_RETRIES` - Automatic refetches per reference (default: 1)
    /// - `EXPIRY_STATUSES` - Comma-separated statuses treated as expiry (default: 403)
    /// - `PROBE_TIMEOUT_MS` - Status check timeout (default: 5000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            backend_url: env::var("BACKEND_URL").unwrap_or(defaults.backend_url),
            ttl: TtlPolicy {
                preview_minutes: env_or("PREVIEW_TTL_MINUTES", defaults.ttl.preview_minutes),
                thumbnail_minutes: env_or("THUMBNAIL_TTL_MINUTES", defaults.ttl.thumbnail_minutes),
                avatar_minutes: env_or("AVATAR_TTL_MINUTES", defaults.ttl.avatar_minutes),
            },
            retry: RetryPolicy {
                max_retries: env_or("MAX_RETRIES", defaults.retry.max_retries),
                expiry_statuses: env::var("EXPIRY_STATUSES")
                    .ok()
                    .and_then(|v| parse_statuses(&v))
                    .unwrap_or(defaults.retry.expiry_statuses),
            },
            probe_timeout_ms: env_or("PROBE_TIMEOUT_MS", defaults.probe_timeout_ms),
        }
    }

    pub fn cleanup_period(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 500,
            cleanup_interval: 300,
            server_port: 3000,
            backend_url: "http://localhost:8080/api".to_string(),
            ttl: TtlPolicy::default(),
            retry: RetryPolicy::default(),
            probe_timeout_ms: 5000,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parses `"403, 404"` into status codes; None if any part is not a status.
fn parse_statuses(raw: &str) -> Option<Vec<u16>> {
    let statuses: Option<Vec<u16>> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok().filter(|code| (100..600).contains(code)))
        .collect();

    statuses.filter(|s| !s.is_empty())
}
