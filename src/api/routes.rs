//! API Routes
//!
//! Configures the Axum router with all signed URL endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, failure_handler, health_handler, invalidate_handler, prefetch_handler,
    refresh_handler, resolve_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /urls/:resource_type/:resource_id/:url_type` - Resolve a signed url
/// - `DELETE /urls/:resource_type/:resource_id/:url_type` - Invalidate it
/// - `POST /urls/:resource_type/:resource_id/:url_type/prefetch` - Warm the cache
/// - `POST /urls/:resource_type/:resource_id/:url_type/refresh` - Force a refetch
/// - `POST /urls/:resource_type/:resource_id/:url_type/failure` - Report a failed load
/// - `DELETE /urls` - Clear the cache
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/urls/:resource_type/:resource_id/:url_type",
            get(resolve_handler).delete(invalidate_handler),
        )
        .route(
            "/urls/:resource_type/:resource_id/:url_type/prefetch",
            post(prefetch_handler),
        )
        .route(
            "/urls/:resource_type/:resource_id/:url_type/refresh",
            post(refresh_handler),
        )
        .route(
            "/urls/:resource_type/:resource_id/:url_type/failure",
            post(failure_handler),
        )
        .route("/urls", delete(clear_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
