//! Status probe used to classify why a URL failed to load.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// The probe could not obtain a status at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("status check failed: {0}")]
pub struct ProbeError(pub String);

// == Probe Trait ==
/// Lightweight existence check against a candidate URL.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// Returns the HTTP status the URL answers with.
    async fn status(&self, url: &str) -> Result<u16, ProbeError>;
}

// == HTTP Probe ==
/// Issues a `HEAD` request and reports the response status.
#[derive(Debug, Clone)]
pub struct HttpStatusProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpStatusProbe {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl StatusProbe for HttpStatusProbe {
    async fn status(&self, url: &str) -> Result<u16, ProbeError> {
        let response = self
            .client
            .head(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProbeError(e.to_string()))?;

        Ok(response.status().as_u16())
    }
}
