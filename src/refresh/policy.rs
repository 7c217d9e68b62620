//! Refresh policies: how long each URL type is cached and when a failed load
//! earns a refetch.

use serde::{Deserialize, Serialize};

use crate::cache::UrlType;

// == TTL Policy ==
/// Cache lifetime per URL type, in minutes.
///
/// Defaults leave a buffer under the signing server's lifetimes
/// (60 minutes for images, 24 hours for avatars).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlPolicy {
    pub preview_minutes: u64,
    pub thumbnail_minutes: u64,
    pub avatar_minutes: u64,
}

impl TtlPolicy {
    pub fn ttl_minutes(&self, url_type: UrlType) -> u64 {
        match url_type {
            UrlType::Preview => self.preview_minutes,
            UrlType::Thumbnail => self.thumbnail_minutes,
            UrlType::Avatar => self.avatar_minutes,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            preview_minutes: 50,
            thumbnail_minutes: 50,
            avatar_minutes: 23 * 60,
        }
    }
}

// == Retry Policy ==
/// Bounds automatic recovery after a URL fails at point of use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Automatic refetches allowed per logical reference
    pub max_retries: u32,
    /// Probe statuses that mean "signature expired"
    pub expiry_statuses: Vec<u16>,
}

impl RetryPolicy {
    pub fn is_expiry_status(&self, status: u16) -> bool {
        self.expiry_statuses.contains(&status)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            expiry_statuses: vec![403],
        }
    }
}
