//! Cache Entry Module
//!
//! Defines a single signed URL slot and its expiry semantics.

use chrono::{DateTime, TimeZone, Utc};

/// Milliseconds per TTL minute.
pub const MS_PER_MINUTE: u64 = 60_000;

// == Cache Entry ==
/// A signed URL together with when it was fetched and when it stops being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The signed URL as last fetched
    pub url: String,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Retrieval timestamp (Unix milliseconds), diagnostics only
    pub fetched_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry fetched at `now_ms` that lives for `ttl_minutes`.
    pub fn new(url: String, now_ms: u64, ttl_minutes: u64) -> Self {
        Self {
            url,
            expires_at: now_ms.saturating_add(ttl_minutes.saturating_mul(MS_PER_MINUTE)),
            fetched_at: now_ms,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry is expired once the current time reaches `expires_at`, so it is
    /// never served past its expiry.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining lifetime in milliseconds, zero once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }

    /// Returns the fetch time as a UTC timestamp for diagnostics.
    pub fn fetched_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.fetched_at as i64).single()
    }
}
