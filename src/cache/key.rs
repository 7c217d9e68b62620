//! Cache Key Module
//!
//! Composite addressing for signed URL slots.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UrlError;

// == URL Type ==
/// Variant of a signed URL issued for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlType {
    /// Full-size watermarked preview
    Preview,
    /// Small listing thumbnail
    Thumbnail,
    /// Profile avatar
    Avatar,
}

impl UrlType {
    /// Returns the lowercase wire name of the URL type.
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlType::Preview => "preview",
            UrlType::Thumbnail => "thumbnail",
            UrlType::Avatar => "avatar",
        }
    }
}

impl fmt::Display for UrlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UrlType {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preview" => Ok(UrlType::Preview),
            "thumbnail" => Ok(UrlType::Thumbnail),
            "avatar" => Ok(UrlType::Avatar),
            other => Err(UrlError::InvalidRequest(format!(
                "Unknown url type '{}'",
                other
            ))),
        }
    }
}

// == Resource Reference ==
/// Identifies one signed URL slot: which resource, and which variant of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub resource_type: String,
    pub resource_id: String,
    pub url_type: UrlType,
}

impl ResourceRef {
    pub fn new(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        url_type: UrlType,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            url_type,
        }
    }

    /// Returns the cache key addressing this reference.
    pub fn cache_key(&self) -> String {
        generate_cache_key(&self.resource_type, &self.resource_id, self.url_type)
    }
}

// == Key Generation ==
/// Builds the composite cache key `"{type}-{id}-{url_type}"`.
///
/// Pure and deterministic; it is the only way entries are addressed. Keys stay
/// unambiguous only while `resource_type` has no `-`.
pub fn generate_cache_key(resource_type: &str, resource_id: &str, url_type: UrlType) -> String {
    format!("{}-{}-{}", resource_type, resource_id, url_type)
}
