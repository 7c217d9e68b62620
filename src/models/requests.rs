//! Request DTOs for the signed URL API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Request body for reporting a failed load
/// (POST /urls/{resource_type}/{resource_id}/{url_type}/failure)
///
/// # Fields
/// - `url`: The URL the client failed to load
/// - `attempt`: Automatic retries the client has already spent on this reference
#[derive(Debug, Clone, Deserialize)]
pub struct FailureReport {
    pub url: String,
    #[serde(default)]
    pub attempt: u32,
}

impl FailureReport {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.url.trim().is_empty() {
            return Some("Url cannot be empty".to_string());
        }
        None
    }
}
