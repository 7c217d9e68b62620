//! Error types for signed URL resolution
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == URL Error Enum ==
/// Every failure a caller of the resolver can observe.
///
/// Clone so a single coalesced fetch can hand the same error to every awaiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    /// The fetch collaborator rejected or returned nothing usable
    #[error("Failed to fetch signed url: {0}")]
    Fetch(String),

    /// The URL kept failing authorization after the allowed refreshes
    #[error("Signed url for '{key}' expired and retry limit reached")]
    Expired { key: String },

    /// Using the URL failed for a reason other than expiry
    #[error("Failed to load image (status {status})")]
    LoadFailed { status: u16 },

    /// Neither a fetcher nor an initial URL was available
    #[error("No url source for '{0}'")]
    NoSource(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UrlError {
    /// HTTP status this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            UrlError::Fetch(_) => StatusCode::BAD_GATEWAY,
            UrlError::Expired { .. } => StatusCode::GONE,
            UrlError::LoadFailed { .. } => StatusCode::FAILED_DEPENDENCY,
            UrlError::NoSource(_) => StatusCode::NOT_FOUND,
            UrlError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            UrlError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for UrlError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string()
        }));

        (self.status_code(), body).into_response()
    }
}

// == Result Type Alias ==
pub type Result<T> = std::result::Result<T, UrlError>;
