//! URL Resolver Module
//!
//! Refresh coordinator: cache first, one in-flight fetch per key, bounded
//! recovery when a URL turns out to be expired at point of use.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStats, ResourceRef, UrlCache};
use crate::error::{Result, UrlError};
use crate::refresh::fetcher::usable_url;
use crate::refresh::{RetryPolicy, StatusProbe, TtlPolicy, UrlSource};

type SharedFetch = Shared<BoxFuture<'static, Result<String>>>;

// == Recovery Outcome ==
/// Result of one load-failure recovery step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// Nothing to do: the URL answered fine, or the probe itself failed
    Unchanged,
    /// The URL was expired; a refetch produced this URL
    Refreshed(String),
    /// The URL was expired; the refetch failed
    RefreshFailed(UrlError),
    /// Terminal failure without a refetch
    Failed(UrlError),
}

impl Recovery {
    /// Whether this step spent one of the reference's retries.
    pub fn used_retry(&self) -> bool {
        matches!(self, Recovery::Refreshed(_) | Recovery::RefreshFailed(_))
    }
}

/// Why using a URL failed, as far as a status check can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailure {
    /// The status check itself did not complete
    Unreachable,
    /// The URL answers with a 2xx status
    Healthy,
    /// The URL answers with an expiry status
    Expired,
    Other(u16),
}

// == URL Resolver ==
/// Resolves signed URLs for resources, sharing one cache and one pending-request
/// registry between every caller.
pub struct UrlResolver {
    cache: Arc<RwLock<UrlCache>>,
    /// In-flight fetches, at most one per cache key
    pending: Arc<Mutex<HashMap<String, SharedFetch>>>,
    ttl: TtlPolicy,
    retry: RetryPolicy,
    probe: Arc<dyn StatusProbe>,
}

impl UrlResolver {
    pub fn new(
        cache: UrlCache,
        ttl: TtlPolicy,
        retry: RetryPolicy,
        probe: Arc<dyn StatusProbe>,
    ) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            retry,
            probe,
        }
    }

    /// Shared handle to the underlying cache, for the sweep task.
    pub fn cache(&self) -> Arc<RwLock<UrlCache>> {
        Arc::clone(&self.cache)
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    // == Resolve ==
    /// Returns a usable URL for `target`.
    ///
    /// A valid cached URL is returned without a fetch. Concurrent misses on the
    /// same key share one fetch. Fetch failures are returned as errors and are
    /// not retried here.
    pub async fn resolve(&self, target: &ResourceRef, source: &UrlSource) -> Result<String> {
        self.resolve_with(target, source, false).await
    }

    // == Refresh ==
    /// Drops the cached URL and fetches a new one.
    pub async fn refresh(&self, target: &ResourceRef, source: &UrlSource) -> Result<String> {
        self.invalidate(target).await;
        self.resolve_with(target, source, true).await
    }

    // == Prefetch ==
    /// Warms the cache for `target`; does nothing if a valid URL is cached.
    pub async fn prefetch(&self, target: &ResourceRef, source: &UrlSource) -> Result<()> {
        self.resolve_with(target, source, false).await.map(|_| ())
    }

    // == Invalidate ==
    pub async fn invalidate(&self, target: &ResourceRef) {
        self.cache.write().await.invalidate_url(&target.cache_key());
    }

    pub async fn clear_all(&self) {
        self.cache.write().await.clear_all_urls();
        info!("Cleared all cached urls");
    }

    /// Cached entry for `target` and its remaining lifetime, if any.
    pub async fn inspect(&self, target: &ResourceRef) -> Option<(CacheEntry, u64)> {
        self.cache.read().await.inspect(&target.cache_key())
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.read().await.stats()
    }

    /// Number of fetches currently in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    // == Recover ==
    /// Classifies a failed load of `current_url` and refetches when the failure
    /// means the signature expired.
    ///
    /// `attempts_used` is how many retries the caller's reference has already
    /// spent. Probe transport errors are logged and reported as `Unchanged`.
    pub async fn recover(
        &self,
        target: &ResourceRef,
        current_url: &str,
        attempts_used: u32,
        source: &UrlSource,
    ) -> Recovery {
        match self.classify_failure(target, current_url).await {
            LoadFailure::Expired => self.recover_expired(target, attempts_used, source).await,
            LoadFailure::Other(status) => Recovery::Failed(UrlError::LoadFailed { status }),
            LoadFailure::Healthy | LoadFailure::Unreachable => Recovery::Unchanged,
        }
    }

    /// Checks `current_url` and says why loading it failed.
    pub async fn classify_failure(&self, target: &ResourceRef, current_url: &str) -> LoadFailure {
        let key = target.cache_key();

        let status = match self.probe.status(current_url).await {
            Ok(status) => status,
            Err(err) => {
                warn!(key = %key, error = %err, "Status check failed, keeping current url");
                return LoadFailure::Unreachable;
            }
        };

        if self.retry.is_expiry_status(status) {
            LoadFailure::Expired
        } else if (200..300).contains(&status) {
            debug!(key = %key, status, "Url answered successfully, nothing to recover");
            LoadFailure::Healthy
        } else {
            warn!(key = %key, status, "Url failed to load");
            LoadFailure::Other(status)
        }
    }

    /// Drops the expired URL and, while retries remain, fetches a replacement.
    pub async fn recover_expired(
        &self,
        target: &ResourceRef,
        attempts_used: u32,
        source: &UrlSource,
    ) -> Recovery {
        let key = target.cache_key();
        self.invalidate(target).await;

        if attempts_used >= self.retry.max_retries {
            warn!(key = %key, "Signed url expired, retry limit reached");
            return Recovery::Failed(UrlError::Expired { key });
        }

        info!(key = %key, "Signed url expired, refetching");
        match self.resolve_with(target, source, true).await {
            Ok(url) => Recovery::Refreshed(url),
            Err(err) => Recovery::RefreshFailed(err),
        }
    }

    async fn resolve_with(
        &self,
        target: &ResourceRef,
        source: &UrlSource,
        bypass_cache: bool,
    ) -> Result<String> {
        let key = target.cache_key();
        let ttl_minutes = self.ttl.ttl_minutes(target.url_type);

        // The cache write lock is held while the registry is consulted, and the
        // fetch task clears its registry slot under the same lock, so a caller
        // sees either the cached result or the in-flight fetch.
        let fetch = {
            let mut cache = self.cache.write().await;

            if !bypass_cache {
                if let Some(url) = cache.get_cached_url(&key) {
                    debug!(key = %key, "Cache hit");
                    return Ok(url);
                }
            }

            let mut pending = self.pending.lock();
            if let Some(inflight) = pending.get(&key) {
                debug!(key = %key, "Joining in-flight fetch");
                inflight.clone()
            } else if let (false, None, Some(initial)) =
                (bypass_cache, &source.fetcher, &source.initial_url)
            {
                let initial = usable_url(initial.clone(), target)?;
                debug!(key = %key, "Seeding cache with initial url");
                cache.set_cached_url(key.clone(), initial.clone(), ttl_minutes);
                return Ok(initial);
            } else {
                let fetch = self.spawn_fetch(key.clone(), target.clone(), source.clone(), ttl_minutes);
                pending.insert(key, fetch.clone());
                fetch
            }
        };

        fetch.await
    }

    /// Starts the fetch on the runtime so it completes even if every awaiter
    /// goes away.
    fn spawn_fetch(
        &self,
        key: String,
        target: ResourceRef,
        source: UrlSource,
        ttl_minutes: u64,
    ) -> SharedFetch {
        let cache = Arc::clone(&self.cache);
        let pending = Arc::clone(&self.pending);

        let task = tokio::spawn(async move {
            debug!(key = %key, "Fetching fresh signed url");
            let result = AssertUnwindSafe(source.fetch(&target))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(UrlError::Internal("url fetcher panicked".to_string())));

            let mut cache = cache.write().await;
            match &result {
                Ok(url) => cache.set_cached_url(key.clone(), url.clone(), ttl_minutes),
                Err(err) => warn!(key = %key, error = %err, "Signed url fetch failed"),
            }
            pending.lock().remove(&key);

            result
        });

        async move {
            task.await
                .unwrap_or_else(|e| Err(UrlError::Internal(format!("fetch task aborted: {}", e))))
        }
        .boxed()
        .shared()
    }
}

impl std::fmt::Debug for UrlResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlResolver")
            .field("ttl", &self.ttl)
            .field("retry", &self.retry)
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, UrlType};
    use crate::refresh::{ProbeError, UrlFetcher};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // == Test Doubles ==
    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl CountingFetcher {
        fn with_delay(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                ..Self::default()
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                ..Self::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UrlFetcher for CountingFetcher {
        async fn fetch_url(&self, target: &ResourceRef) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(UrlError::Fetch("backend unavailable".to_string()));
            }
            Ok(format!("https://bucket/{}?sig={}", target.cache_key(), n))
        }
    }

    struct ScriptedProbe {
        replies: Mutex<VecDeque<std::result::Result<u16, ProbeError>>>,
    }

    impl ScriptedProbe {
        fn new(replies: Vec<std::result::Result<u16, ProbeError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }
    }

    #[async_trait]
    impl StatusProbe for ScriptedProbe {
        async fn status(&self, _url: &str) -> std::result::Result<u16, ProbeError> {
            self.replies.lock().pop_front().unwrap_or(Ok(200))
        }
    }

    fn resolver(probe: Arc<dyn StatusProbe>) -> (UrlResolver, ManualClock) {
        let clock = ManualClock::new(1_700_000_000_000);
        let cache = UrlCache::with_clock(100, Arc::new(clock.clone()));
        (
            UrlResolver::new(cache, TtlPolicy::default(), RetryPolicy::default(), probe),
            clock,
        )
    }

    fn photo(id: &str) -> ResourceRef {
        ResourceRef::new("photo", id, UrlType::Preview)
    }

    #[tokio::test]
    async fn test_resolve_fetches_then_serves_from_cache() {
        let (resolver, _clock) = resolver(ScriptedProbe::new(vec![]));
        let fetcher = CountingFetcher::with_delay(Duration::ZERO);
        let source = UrlSource::from_fetcher(fetcher.clone());

        let first = resolver.resolve(&photo("1"), &source).await.unwrap();
        let second = resolver.resolve(&photo("1"), &source).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(resolver.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_fetch() {
        let (resolver, _clock) = resolver(ScriptedProbe::new(vec![]));
        let fetcher = CountingFetcher::with_delay(Duration::from_millis(100));
        let source = UrlSource::from_fetcher(fetcher.clone());
        let target = ResourceRef::new("photo", "2", UrlType::Preview);

        let (a, b) = tokio::join!(
            resolver.resolve(&target, &source),
            resolver.resolve(&target, &source)
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_many_concurrent_resolves_share_one_fetch() {
        let (resolver, _clock) = resolver(ScriptedProbe::new(vec![]));
        let resolver = Arc::new(resolver);
        let fetcher = CountingFetcher::with_delay(Duration::from_millis(50));
        let source = UrlSource::from_fetcher(fetcher.clone());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                let source = source.clone();
                tokio::spawn(async move { resolver.resolve(&photo("3"), &source).await })
            })
            .collect();

        let mut urls = Vec::new();
        for handle in handles {
            urls.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(fetcher.calls(), 1);
        assert!(urls.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces_and_clears_pending() {
        let (resolver, _clock) = resolver(ScriptedProbe::new(vec![]));
        let fetcher = CountingFetcher::failing();
        let source = UrlSource::from_fetcher(fetcher.clone());

        let result = resolver.resolve(&photo("4"), &source).await;
        assert!(matches!(result, Err(UrlError::Fetch(_))));
        assert_eq!(resolver.pending_count(), 0);

        // A later call starts a new fetch rather than reusing the failure
        let _ = resolver.resolve(&photo("4"), &source).await;
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_cache_entry_triggers_refetch() {
        let (resolver, clock) = resolver(ScriptedProbe::new(vec![]));
        let fetcher = CountingFetcher::with_delay(Duration::ZERO);
        let source = UrlSource::from_fetcher(fetcher.clone());

        resolver.resolve(&photo("5"), &source).await.unwrap();
        clock.advance_secs(51 * 60);
        let url = resolver.resolve(&photo("5"), &source).await.unwrap();

        assert_eq!(fetcher.calls(), 2);
        assert!(url.ends_with("sig=2"));
    }

    #[tokio::test]
    async fn test_initial_url_seeds_cache_without_fetcher() {
        let (resolver, _clock) = resolver(ScriptedProbe::new(vec![]));
        let source = UrlSource::from_initial_url("https://seed/a.jpg");

        let url = resolver.resolve(&photo("6"), &source).await.unwrap();

        assert_eq!(url, "https://seed/a.jpg");
        assert_eq!(resolver.stats().await.total_size, 1);
        assert_eq!(resolver.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_fetcher_wins_over_initial_url() {
        let (resolver, _clock) = resolver(ScriptedProbe::new(vec![]));
        let fetcher = CountingFetcher::with_delay(Duration::ZERO);
        let source =
            UrlSource::from_fetcher(fetcher.clone()).with_initial_url("https://stale/a.jpg");

        let url = resolver.resolve(&photo("6"), &source).await.unwrap();

        assert_eq!(url, "https://bucket/photo-6-preview?sig=1");
        assert_eq!(fetcher.calls(), 1);

        // Cached fetch result is served afterwards, not the initial url
        let again = resolver.resolve(&photo("6"), &source).await.unwrap();
        assert_eq!(again, url);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_initial_url_is_a_fetch_error() {
        let (resolver, _clock) = resolver(ScriptedProbe::new(vec![]));

        let result = resolver
            .resolve(&photo("6"), &UrlSource::from_initial_url(""))
            .await;

        assert!(matches!(result, Err(UrlError::Fetch(_))));
        assert_eq!(resolver.stats().await.total_size, 0);
    }

    #[tokio::test]
    async fn test_refresh_bypasses_cache() {
        let (resolver, _clock) = resolver(ScriptedProbe::new(vec![]));
        let fetcher = CountingFetcher::with_delay(Duration::ZERO);
        let source = UrlSource::from_fetcher(fetcher.clone());

        resolver.resolve(&photo("7"), &source).await.unwrap();
        let refreshed = resolver.refresh(&photo("7"), &source).await.unwrap();

        assert_eq!(fetcher.calls(), 2);
        assert!(refreshed.ends_with("sig=2"));
    }

    #[tokio::test]
    async fn test_prefetch_is_noop_when_cached() {
        let (resolver, _clock) = resolver(ScriptedProbe::new(vec![]));
        let fetcher = CountingFetcher::with_delay(Duration::ZERO);
        let source = UrlSource::from_fetcher(fetcher.clone());

        resolver.prefetch(&photo("8"), &source).await.unwrap();
        resolver.prefetch(&photo("8"), &source).await.unwrap();

        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_completes_after_caller_drops() {
        let (resolver, _clock) = resolver(ScriptedProbe::new(vec![]));
        let fetcher = CountingFetcher::with_delay(Duration::from_millis(50));
        let source = UrlSource::from_fetcher(fetcher.clone());

        let abandoned =
            tokio::time::timeout(Duration::from_millis(5), resolver.resolve(&photo("9"), &source))
                .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(resolver.stats().await.total_size, 1);
        assert_eq!(resolver.pending_count(), 0);

        resolver.resolve(&photo("9"), &source).await.unwrap();
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_recover_forbidden_refetches_once() {
        let (resolver, _clock) = resolver(ScriptedProbe::new(vec![Ok(403)]));
        let fetcher = CountingFetcher::with_delay(Duration::ZERO);
        let source = UrlSource::from_fetcher(fetcher.clone());
        let url = resolver.resolve(&photo("10"), &source).await.unwrap();

        let outcome = resolver.recover(&photo("10"), &url, 0, &source).await;

        assert!(matches!(outcome, Recovery::Refreshed(ref u) if u.ends_with("sig=2")));
        assert!(outcome.used_retry());
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_recover_forbidden_at_limit_is_terminal() {
        let (resolver, _clock) = resolver(ScriptedProbe::new(vec![Ok(403)]));
        let fetcher = CountingFetcher::with_delay(Duration::ZERO);
        let source = UrlSource::from_fetcher(fetcher.clone());
        let url = resolver.resolve(&photo("11"), &source).await.unwrap();

        let outcome = resolver.recover(&photo("11"), &url, 1, &source).await;

        assert_eq!(
            outcome,
            Recovery::Failed(UrlError::Expired {
                key: "photo-11-preview".to_string()
            })
        );
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(resolver.stats().await.total_size, 0);
    }

    #[tokio::test]
    async fn test_recover_other_status_keeps_cache() {
        let (resolver, _clock) = resolver(ScriptedProbe::new(vec![Ok(404)]));
        let fetcher = CountingFetcher::with_delay(Duration::ZERO);
        let source = UrlSource::from_fetcher(fetcher.clone());
        let url = resolver.resolve(&photo("12"), &source).await.unwrap();

        let outcome = resolver.recover(&photo("12"), &url, 0, &source).await;

        assert_eq!(outcome, Recovery::Failed(UrlError::LoadFailed { status: 404 }));
        assert!(!outcome.used_retry());
        assert_eq!(resolver.stats().await.total_size, 1);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_recover_probe_error_is_swallowed() {
        let (resolver, _clock) = resolver(ScriptedProbe::new(vec![Err(ProbeError(
            "connection reset".to_string(),
        ))]));
        let source = UrlSource::from_initial_url("https://seed/a.jpg");

        let outcome = resolver
            .recover(&photo("13"), "https://seed/a.jpg", 0, &source)
            .await;

        assert_eq!(outcome, Recovery::Unchanged);
    }

    #[tokio::test]
    async fn test_recover_custom_expiry_statuses() {
        let clock = ManualClock::new(0);
        let retry = RetryPolicy {
            max_retries: 1,
            expiry_statuses: vec![403, 404],
        };
        let resolver = UrlResolver::new(
            UrlCache::with_clock(10, Arc::new(clock)),
            TtlPolicy::default(),
            retry,
            ScriptedProbe::new(vec![Ok(404)]),
        );
        let fetcher = CountingFetcher::with_delay(Duration::ZERO);
        let source = UrlSource::from_fetcher(fetcher.clone());

        let outcome = resolver.recover(&photo("14"), "https://old", 0, &source).await;

        assert!(matches!(outcome, Recovery::Refreshed(_)));
        assert_eq!(fetcher.calls(), 1);
    }
}
