//! Response DTOs for the signed URL API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheEntry, CacheStats, UrlType};

/// Response body for a resolved or refreshed URL
#[derive(Debug, Clone, Serialize)]
pub struct UrlResponse {
    /// Composite cache key
    pub key: String,
    pub url_type: UrlType,
    /// The signed URL
    pub url: String,
    /// When the cached URL was fetched (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_ms: Option<u64>,
}

impl UrlResponse {
    pub fn new(key: impl Into<String>, url_type: UrlType, url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            url_type,
            url: url.into(),
            fetched_at: None,
            expires_in_ms: None,
        }
    }

    /// Adds cache timing details when the entry still holds the returned URL.
    pub fn with_entry(mut self, details: Option<(CacheEntry, u64)>) -> Self {
        if let Some((entry, remaining_ms)) = details.filter(|(entry, _)| entry.url == self.url) {
            self.fetched_at = entry.fetched_at_utc().map(|at| at.to_rfc3339());
            self.expires_in_ms = Some(remaining_ms);
        }
        self
    }
}

/// Outcome of a reported load failure
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryResponse {
    /// `unchanged`, `refreshed` or `refresh_failed`
    pub outcome: &'static str,
    /// The replacement URL when refreshed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Retries spent on this reference after this report
    pub attempt: u32,
}

impl RecoveryResponse {
    pub fn unchanged(attempt: u32) -> Self {
        Self {
            outcome: "unchanged",
            url: None,
            error: None,
            attempt,
        }
    }

    pub fn refreshed(url: impl Into<String>, attempt: u32) -> Self {
        Self {
            outcome: "refreshed",
            url: Some(url.into()),
            error: None,
            attempt,
        }
    }

    /// The refetch ran and failed; the retry is still spent.
    pub fn refresh_failed(error: impl Into<String>, attempt: u32) -> Self {
        Self {
            outcome: "refresh_failed",
            url: None,
            error: Some(error.into()),
            attempt,
        }
    }
}

/// Generic acknowledgement for prefetch / invalidate / clear
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub total_size: usize,
    pub valid_count: usize,
    pub expired_count: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Fetches currently in flight
    pub pending: usize,
}

impl StatsResponse {
    pub fn new(stats: CacheStats, pending: usize) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            total_size: stats.total_size,
            valid_count: stats.valid_count,
            expired_count: stats.expired_count,
            max_size: stats.max_size,
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            pending,
        }
    }
}

/// Response body for the health check endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current server timestamp (RFC 3339)
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
