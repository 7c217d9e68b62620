//! Image Handle Module
//!
//! Per-reference view of one signed URL: what is currently displayed, whether
//! it is loading, and how many automatic recoveries it has spent.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::ResourceRef;
use crate::error::{Result, UrlError};
use crate::refresh::{LoadFailure, Recovery, UrlResolver, UrlSource};

// == Image State ==
/// Lifecycle of one logical image reference.
///
/// `Errored` is terminal until [`ImageHandle::retry`] is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageState {
    Idle,
    Loading,
    Ready(String),
    Errored(UrlError),
}

// == Image Handle ==
#[derive(Debug)]
pub struct ImageHandle {
    resolver: Arc<UrlResolver>,
    target: ResourceRef,
    source: UrlSource,
    state: ImageState,
    retry_count: u32,
}

impl ImageHandle {
    pub fn new(resolver: Arc<UrlResolver>, target: ResourceRef, source: UrlSource) -> Self {
        Self {
            resolver,
            target,
            source,
            state: ImageState::Idle,
            retry_count: 0,
        }
    }

    // == Load ==
    /// Resolves the URL through the shared cache and records the outcome.
    pub async fn load(&mut self) -> Result<String> {
        self.state = ImageState::Loading;
        let result = self.resolver.resolve(&self.target, &self.source).await;
        self.settle(result)
    }

    // == Handle Load Failure ==
    /// Called when actually using `current_url` failed.
    ///
    /// An expiry status spends one retry on a refetch, showing `Loading` while it
    /// runs; past the retry limit, or for any other failing status, the handle
    /// moves to `Errored`. Probe transport errors leave the state untouched.
    /// Ignored once `Errored`.
    pub async fn handle_load_failure(&mut self, current_url: &str) {
        if let ImageState::Errored(_) = self.state {
            return;
        }

        let recovery = match self.resolver.classify_failure(&self.target, current_url).await {
            LoadFailure::Expired => {
                if self.retry_count < self.resolver.retry_policy().max_retries {
                    self.state = ImageState::Loading;
                }
                self.resolver
                    .recover_expired(&self.target, self.retry_count, &self.source)
                    .await
            }
            LoadFailure::Other(status) => Recovery::Failed(UrlError::LoadFailed { status }),
            LoadFailure::Healthy | LoadFailure::Unreachable => Recovery::Unchanged,
        };

        if recovery.used_retry() {
            self.retry_count += 1;
        }

        match recovery {
            Recovery::Unchanged => {
                debug!(key = %self.target.cache_key(), "Load failure not actionable");
            }
            Recovery::Refreshed(url) => self.state = ImageState::Ready(url),
            Recovery::RefreshFailed(err) | Recovery::Failed(err) => {
                self.state = ImageState::Errored(err);
            }
        }
    }

    // == Retry ==
    /// Manual recovery: resets the retry budget and forces a fresh fetch.
    pub async fn retry(&mut self) -> Result<String> {
        self.retry_count = 0;
        self.state = ImageState::Loading;
        let result = self.resolver.refresh(&self.target, &self.source).await;
        self.settle(result)
    }

    // == Prefetch ==
    /// Warms the cache without touching what this handle displays.
    pub async fn prefetch(&self) {
        if let Err(err) = self.resolver.prefetch(&self.target, &self.source).await {
            warn!(key = %self.target.cache_key(), error = %err, "Prefetch failed");
        }
    }

    fn settle(&mut self, result: Result<String>) -> Result<String> {
        self.state = match &result {
            Ok(url) => ImageState::Ready(url.clone()),
            Err(err) => ImageState::Errored(err.clone()),
        };
        result
    }

    pub fn state(&self) -> &ImageState {
        &self.state
    }

    pub fn image_url(&self) -> Option<&str> {
        match &self.state {
            ImageState::Ready(url) => Some(url),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state == ImageState::Loading
    }

    pub fn error(&self) -> Option<&UrlError> {
        match &self.state {
            ImageState::Errored(err) => Some(err),
            _ => None,
        }
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn target(&self) -> &ResourceRef {
        &self.target
    }
}
