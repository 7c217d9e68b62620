//! API Handlers
//!
//! HTTP request handlers for each signed URL endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};

use crate::cache::{ResourceRef, UrlCache, UrlType};
use crate::config::Config;
use crate::error::{Result, UrlError};
use crate::models::{
    FailureReport, HealthResponse, MessageResponse, RecoveryResponse, StatsResponse, UrlResponse,
};
use crate::refresh::{HttpStatusProbe, HttpUrlFetcher, Recovery, UrlResolver, UrlSource};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared resolver (cache + in-flight registry)
    pub resolver: Arc<UrlResolver>,
    /// Where misses are fetched from
    pub source: UrlSource,
}

impl AppState {
    pub fn new(resolver: Arc<UrlResolver>, source: UrlSource) -> Self {
        Self { resolver, source }
    }

    /// Wires the resolver to the configured backend and a HEAD status probe.
    pub fn from_config(config: &Config) -> Self {
        let client = reqwest::Client::new();
        let fetcher = HttpUrlFetcher::new(client.clone(), config.backend_url.clone());
        let probe = HttpStatusProbe::new(client, config.probe_timeout());

        let resolver = UrlResolver::new(
            UrlCache::new(config.max_entries),
            config.ttl,
            config.retry.clone(),
            Arc::new(probe),
        );

        Self::new(Arc::new(resolver), UrlSource::from_fetcher(Arc::new(fetcher)))
    }
}

/// Path segments `{resource_type}/{resource_id}/{url_type}`.
type TargetPath = Path<(String, String, String)>;

fn parse_target((resource_type, resource_id, url_type): (String, String, String)) -> Result<ResourceRef> {
    if resource_type.is_empty() || resource_id.is_empty() {
        return Err(UrlError::InvalidRequest(
            "Resource type and id cannot be empty".to_string(),
        ));
    }
    // The key splits on '-', so only the id may contain one
    if resource_type.contains('-') {
        return Err(UrlError::InvalidRequest(format!(
            "Resource type '{}' cannot contain '-'",
            resource_type
        )));
    }
    let url_type: UrlType = url_type.parse()?;
    Ok(ResourceRef::new(resource_type, resource_id, url_type))
}

/// Handler for GET /urls/:resource_type/:resource_id/:url_type
pub async fn resolve_handler(
    State(state): State<AppState>,
    Path(path): TargetPath,
) -> Result<Json<UrlResponse>> {
    let target = parse_target(path)?;
    let url = state.resolver.resolve(&target, &state.source).await?;

    let details = state.resolver.inspect(&target).await;

    Ok(Json(
        UrlResponse::new(target.cache_key(), target.url_type, url).with_entry(details),
    ))
}

/// Handler for POST /urls/:resource_type/:resource_id/:url_type/prefetch
pub async fn prefetch_handler(
    State(state): State<AppState>,
    Path(path): TargetPath,
) -> Result<Json<MessageResponse>> {
    let target = parse_target(path)?;
    state.resolver.prefetch(&target, &state.source).await?;

    Ok(Json(MessageResponse::new(format!(
        "Url '{}' is cached",
        target.cache_key()
    ))))
}

/// Handler for POST /urls/:resource_type/:resource_id/:url_type/refresh
///
/// Manual retry: drops the cached URL and fetches a new one.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Path(path): TargetPath,
) -> Result<Json<UrlResponse>> {
    let target = parse_target(path)?;
    let url = state.resolver.refresh(&target, &state.source).await?;

    let details = state.resolver.inspect(&target).await;

    Ok(Json(
        UrlResponse::new(target.cache_key(), target.url_type, url).with_entry(details),
    ))
}

/// Handler for POST /urls/:resource_type/:resource_id/:url_type/failure
///
/// The client reports a URL that failed to load, along with how many
/// automatic retries it has spent; the response tells it what to show next.
/// A failed refetch keeps the error status but still reports the spent retry.
pub async fn failure_handler(
    State(state): State<AppState>,
    Path(path): TargetPath,
    Json(report): Json<FailureReport>,
) -> Result<Response> {
    if let Some(error_msg) = report.validate() {
        return Err(UrlError::InvalidRequest(error_msg));
    }
    let target = parse_target(path)?;

    let recovery = state
        .resolver
        .recover(&target, &report.url, report.attempt, &state.source)
        .await;

    let spent = report.attempt.saturating_add(1);
    match recovery {
        Recovery::Unchanged => Ok(Json(RecoveryResponse::unchanged(report.attempt)).into_response()),
        Recovery::Refreshed(url) => Ok(Json(RecoveryResponse::refreshed(url, spent)).into_response()),
        Recovery::RefreshFailed(err) => Ok((
            err.status_code(),
            Json(RecoveryResponse::refresh_failed(err.to_string(), spent)),
        )
            .into_response()),
        Recovery::Failed(err) => Err(err),
    }
}

/// Handler for DELETE /urls/:resource_type/:resource_id/:url_type
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(path): TargetPath,
) -> Result<Json<MessageResponse>> {
    let target = parse_target(path)?;
    state.resolver.invalidate(&target).await;

    Ok(Json(MessageResponse::new(format!(
        "Url '{}' invalidated",
        target.cache_key()
    ))))
}

/// Handler for DELETE /urls
pub async fn clear_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.resolver.clear_all().await;
    Json(MessageResponse::new("All cached urls cleared"))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.resolver.stats().await;
    Json(StatsResponse::new(stats, state.resolver.pending_count()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
