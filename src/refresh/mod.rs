//! Refresh Module
//!
//! Obtains usable signed URLs: cache first, coalesced fetches on a miss, and
//! bounded recovery when a URL turns out to be expired.

mod fetcher;
mod handle;
mod policy;
mod probe;
mod resolver;

pub use fetcher::{fetcher_fn, BackendResponse, FnFetcher, HttpUrlFetcher, UrlFetcher, UrlSource};
pub use handle::{ImageHandle, ImageState};
pub use policy::{RetryPolicy, TtlPolicy};
pub use probe::{HttpStatusProbe, ProbeError, StatusProbe};
pub use resolver::{LoadFailure, Recovery, UrlResolver};
