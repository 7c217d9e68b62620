//! URL Cache Store Module
//!
//! Bounded key -> signed URL map with lazy expiry and oldest-write eviction.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, Clock, InsertionOrder, SystemClock};

// == URL Cache ==
/// In-memory store of signed URLs keyed by composite resource key.
#[derive(Debug)]
pub struct UrlCache {
    /// Key -> entry storage
    entries: HashMap<String, CacheEntry>,
    /// Write order, oldest first
    order: InsertionOrder,
    /// Running counters
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_size: usize,
    clock: Arc<dyn Clock>,
}

impl UrlCache {
    // == Constructor ==
    /// Creates a cache bounded to `max_size` entries, reading the system clock.
    pub fn new(max_size: usize) -> Self {
        Self::with_clock(max_size, Arc::new(SystemClock))
    }

    /// Creates a cache bounded to `max_size` entries with an explicit time source.
    ///
    /// A `max_size` of zero is treated as one.
    pub fn with_clock(max_size: usize, clock: Arc<dyn Clock>) -> Self {
        let max_size = max_size.max(1);
        Self {
            entries: HashMap::new(),
            order: InsertionOrder::new(),
            stats: CacheStats::new(max_size),
            max_size,
            clock,
        }
    }

    // == Get ==
    /// Returns the stored URL if present and not expired.
    ///
    /// An expired entry is deleted on the way out and counted as a miss.
    pub fn get_cached_url(&mut self, key: &str) -> Option<String> {
        let now = self.clock.now_ms();

        match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                self.entries.remove(key);
                self.order.remove(key);
                self.stats.record_miss();
                debug!(key, "cached url expired");
                None
            }
            Some(entry) => {
                let url = entry.url.clone();
                self.stats.record_hit();
                Some(url)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Set ==
    /// Stores `url` under `key` for `ttl_minutes`, replacing any previous entry.
    ///
    /// When a new key arrives at capacity, expired entries are purged first and,
    /// if that frees nothing, the oldest written entry is evicted.
    pub fn set_cached_url(&mut self, key: impl Into<String>, url: impl Into<String>, ttl_minutes: u64) {
        let key = key.into();
        let now = self.clock.now_ms();

        let is_overwrite = self.entries.contains_key(&key);
        if !is_overwrite && self.entries.len() >= self.max_size {
            self.clear_expired_urls();

            if self.entries.len() >= self.max_size {
                if let Some(evicted) = self.order.pop_oldest() {
                    self.entries.remove(&evicted);
                    self.stats.record_eviction();
                    debug!(key = %evicted, "evicted oldest cached url");
                }
            }
        }

        let entry = CacheEntry::new(url.into(), now, ttl_minutes);
        self.order.record_insert(&key);
        self.entries.insert(key, entry);
    }

    // == Invalidate ==
    /// Removes the entry for `key` if there is one.
    pub fn invalidate_url(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.remove(key);
            debug!(key, "invalidated cached url");
        }
    }

    // == Cleanup Expired ==
    /// Removes every expired entry and returns how many were removed.
    pub fn clear_expired_urls(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.remove(key);
            self.order.remove(key);
        }

        expired_keys.len()
    }

    // == Clear ==
    pub fn clear_all_urls(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    // == Stats ==
    /// Returns a diagnostic snapshot; does not remove anything.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_ms();
        let expired_count = self
            .entries
            .values()
            .filter(|entry| entry.is_expired(now))
            .count();

        CacheStats {
            total_size: self.entries.len(),
            valid_count: self.entries.len() - expired_count,
            expired_count,
            ..self.stats.clone()
        }
    }

    /// Returns the raw entry for `key`, expired or not.
    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Returns the entry for `key` with its remaining lifetime in milliseconds.
    pub fn inspect(&self, key: &str) -> Option<(CacheEntry, u64)> {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .map(|entry| (entry.clone(), entry.ttl_remaining_ms(now)))
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn cache_with_clock(max: usize) -> (UrlCache, ManualClock) {
        let clock = ManualClock::new(1_700_000_000_000);
        (UrlCache::with_clock(max, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_store_new() {
        let cache = UrlCache::new(100);
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.max_size(), 100);
    }

    #[test]
    fn test_set_then_get_returns_url() {
        let mut cache = UrlCache::new(100);

        cache.set_cached_url("photo-1-preview", "https://x/a.jpg", 50);

        assert_eq!(
            cache.get_cached_url("photo-1-preview").as_deref(),
            Some("https://x/a.jpg")
        );
    }

    #[test]
    fn test_get_missing_is_absent() {
        let mut cache = UrlCache::new(100);
        assert_eq!(cache.get_cached_url("nothing"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let (mut cache, clock) = cache_with_clock(100);

        cache.set_cached_url("photo-1-preview", "https://x/a.jpg", 1);
        assert_eq!(cache.len(), 1);

        clock.advance_secs(61);

        assert_eq!(cache.get_cached_url("photo-1-preview"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_overwrite_last_write_wins() {
        let mut cache = UrlCache::new(100);

        cache.set_cached_url("k", "https://x/1.jpg", 50);
        cache.set_cached_url("k", "https://x/2.jpg", 50);

        assert_eq!(cache.get_cached_url("k").as_deref(), Some("https://x/2.jpg"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_overwrite_resets_expiry() {
        let (mut cache, clock) = cache_with_clock(100);

        cache.set_cached_url("k", "https://x/1.jpg", 1);
        clock.advance_secs(50);
        cache.set_cached_url("k", "https://x/2.jpg", 1);
        clock.advance_secs(50);

        assert_eq!(cache.get_cached_url("k").as_deref(), Some("https://x/2.jpg"));
    }

    #[test]
    fn test_invalidate() {
        let mut cache = UrlCache::new(100);

        cache.set_cached_url("k", "u", 50);
        cache.invalidate_url("k");
        cache.invalidate_url("never-set");

        assert!(cache.is_empty());
        assert_eq!(cache.get_cached_url("k"), None);
    }

    #[test]
    fn test_capacity_evicts_oldest_insert() {
        let mut cache = UrlCache::new(3);

        cache.set_cached_url("key1", "u1", 50);
        cache.set_cached_url("key2", "u2", 50);
        cache.set_cached_url("key3", "u3", 50);

        // Reads do not protect key1: eviction follows write order
        cache.get_cached_url("key1");

        cache.set_cached_url("key4", "u4", 50);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get_cached_url("key1"), None);
        assert!(cache.get_cached_url("key2").is_some());
        assert!(cache.get_cached_url("key4").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_capacity_purges_expired_before_evicting() {
        let (mut cache, clock) = cache_with_clock(3);

        cache.set_cached_url("old", "u1", 50);
        cache.set_cached_url("short", "u2", 1);
        cache.set_cached_url("mid", "u3", 50);

        clock.advance_secs(120);
        cache.set_cached_url("new", "u4", 50);

        assert_eq!(cache.len(), 3);
        assert!(cache.get_cached_url("old").is_some());
        assert!(cache.get_cached_url("new").is_some());
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let mut cache = UrlCache::new(2);

        cache.set_cached_url("a", "u1", 50);
        cache.set_cached_url("b", "u2", 50);
        cache.set_cached_url("a", "u3", 50);

        assert_eq!(cache.len(), 2);
        assert!(cache.get_cached_url("b").is_some());
    }

    #[test]
    fn test_clear_expired_urls() {
        let (mut cache, clock) = cache_with_clock(100);

        cache.set_cached_url("short", "u1", 1);
        cache.set_cached_url("long", "u2", 10);

        clock.advance_secs(120);

        assert_eq!(cache.clear_expired_urls(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_cached_url("long").is_some());
    }

    #[test]
    fn test_clear_all_twice() {
        let mut cache = UrlCache::new(100);
        cache.set_cached_url("a", "u1", 50);
        cache.set_cached_url("b", "u2", 50);

        cache.clear_all_urls();
        assert!(cache.is_empty());
        cache.clear_all_urls();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stats_counts_expired_without_removing() {
        let (mut cache, clock) = cache_with_clock(10);

        cache.set_cached_url("short", "u1", 1);
        cache.set_cached_url("long", "u2", 50);
        clock.advance_secs(61);

        let stats = cache.stats();
        assert_eq!(stats.total_size, 2);
        assert_eq!(stats.valid_count, 1);
        assert_eq!(stats.expired_count, 1);
        assert_eq!(stats.max_size, 10);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_inspect_reports_remaining_lifetime() {
        let (mut cache, clock) = cache_with_clock(10);

        cache.set_cached_url("k", "u", 10);
        clock.advance_secs(60);

        let (entry, remaining) = cache.inspect("k").unwrap();
        assert_eq!(entry.url, "u");
        assert_eq!(remaining, 9 * 60_000);
        assert!(cache.inspect("missing").is_none());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut cache = UrlCache::new(0);
        cache.set_cached_url("a", "u1", 50);
        cache.set_cached_url("b", "u2", 50);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_cached_url("b").is_some());
    }
}
