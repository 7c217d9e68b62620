//! API Module
//!
//! HTTP handlers and routing for the signed URL sidecar.
//!
//! # Endpoints
//! - `GET /urls/:resource_type/:resource_id/:url_type` - Resolve a signed url
//! - `DELETE /urls/:resource_type/:resource_id/:url_type` - Invalidate it
//! - `POST .../prefetch`, `.../refresh`, `.../failure` - Warm, force, recover
//! - `DELETE /urls` - Clear the cache
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
