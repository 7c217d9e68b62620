//! Fetch-fresh-URL collaborators.
//!
//! The resolver never talks to the backend directly; it asks a [`UrlFetcher`]
//! for a currently valid signed URL.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::ResourceRef;
use crate::error::{Result, UrlError};

// == Fetcher Trait ==
/// Produces a fresh signed URL for a resource, or an error.
#[async_trait]
pub trait UrlFetcher: Send + Sync {
    async fn fetch_url(&self, target: &ResourceRef) -> Result<String>;
}

// == Closure Fetcher ==
/// Adapts an async closure into a [`UrlFetcher`].
pub struct FnFetcher<F>(F);

/// Wraps `f` so it can be handed to the resolver as a fetcher.
pub fn fetcher_fn<F, Fut>(f: F) -> Arc<dyn UrlFetcher>
where
    F: Fn(ResourceRef) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    Arc::new(FnFetcher(f))
}

#[async_trait]
impl<F, Fut> UrlFetcher for FnFetcher<F>
where
    F: Fn(ResourceRef) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send,
{
    async fn fetch_url(&self, target: &ResourceRef) -> Result<String> {
        (self.0)(target.clone()).await
    }
}

// == URL Source ==
/// Where a resolver may obtain a URL on a cache miss.
///
/// The fetcher always wins when present. Without one, the initial URL seeds the
/// cache and stands in for the fetch result on forced refreshes.
#[derive(Clone, Default)]
pub struct UrlSource {
    pub fetcher: Option<Arc<dyn UrlFetcher>>,
    pub initial_url: Option<String>,
}

impl UrlSource {
    pub fn from_fetcher(fetcher: Arc<dyn UrlFetcher>) -> Self {
        Self {
            fetcher: Some(fetcher),
            initial_url: None,
        }
    }

    pub fn from_initial_url(url: impl Into<String>) -> Self {
        Self {
            fetcher: None,
            initial_url: Some(url.into()),
        }
    }

    pub fn with_initial_url(mut self, url: impl Into<String>) -> Self {
        self.initial_url = Some(url.into());
        self
    }

    /// Obtains a URL from the fetcher, falling back to the initial URL.
    pub(crate) async fn fetch(&self, target: &ResourceRef) -> Result<String> {
        let url = match (&self.fetcher, &self.initial_url) {
            (Some(fetcher), _) => fetcher.fetch_url(target).await?,
            (None, Some(initial)) => initial.clone(),
            (None, None) => return Err(UrlError::NoSource(target.cache_key())),
        };

        usable_url(url, target)
    }
}

/// Rejects blank URLs; they are never worth caching.
pub(crate) fn usable_url(url: String, target: &ResourceRef) -> Result<String> {
    if url.trim().is_empty() {
        return Err(UrlError::Fetch(format!(
            "empty url returned for '{}'",
            target.cache_key()
        )));
    }
    Ok(url)
}

impl std::fmt::Debug for UrlSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSource")
            .field("fetcher", &self.fetcher.is_some())
            .field("initial_url", &self.initial_url)
            .finish()
    }
}

// == Backend Response ==
/// Body returned by the backend's signed URL endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BackendResponse {
    Ok {
        url: String,
    },
    Error {
        #[serde(default)]
        code: Option<String>,
        message: String,
    },
}

impl BackendResponse {
    pub fn into_result(self) -> Result<String> {
        match self {
            BackendResponse::Ok { url } if url.trim().is_empty() => {
                Err(UrlError::Fetch("backend returned an empty url".to_string()))
            }
            BackendResponse::Ok { url } => Ok(url),
            BackendResponse::Error { code, message } => Err(UrlError::Fetch(match code {
                Some(code) => format!("{}: {}", code, message),
                None => message,
            })),
        }
    }
}

// == HTTP Fetcher ==
/// Fetches signed URLs from `GET {base}/{resource_type}/{resource_id}/urls/{url_type}`.
#[derive(Debug, Clone)]
pub struct HttpUrlFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUrlFetcher {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self, target: &ResourceRef) -> String {
        format!(
            "{}/{}/{}/urls/{}",
            self.base_url, target.resource_type, target.resource_id, target.url_type
        )
    }
}

#[async_trait]
impl UrlFetcher for HttpUrlFetcher {
    async fn fetch_url(&self, target: &ResourceRef) -> Result<String> {
        let endpoint = self.endpoint(target);
        debug!(%endpoint, "requesting signed url");

        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| UrlError::Fetch(e.to_string()))?;

        let status = response.status();
        match response.json::<BackendResponse>().await {
            Ok(body) => body.into_result(),
            Err(_) if !status.is_success() => Err(UrlError::Fetch(format!(
                "backend returned status {}",
                status.as_u16()
            ))),
            Err(e) => Err(UrlError::Fetch(format!("malformed backend response: {}", e))),
        }
    }
}
