//! Signed URL Cache
//!
//! Caches expiring object-storage URLs, coalesces concurrent refreshes per
//! resource, and recovers once from URLs that expire at point of use.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod refresh;
pub mod tasks;

pub use api::AppState;
pub use cache::{generate_cache_key, ResourceRef, UrlCache, UrlType};
pub use config::Config;
pub use error::UrlError;
pub use refresh::{ImageHandle, ImageState, UrlResolver, UrlSource};
pub use tasks::CleanupTask;
