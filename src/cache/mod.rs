//! Cache Module
//!
//! In-memory signed URL storage with TTL expiration and bounded size.

mod clock;
mod entry;
mod key;
mod order;
mod stats;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, MS_PER_MINUTE};
pub use key::{generate_cache_key, ResourceRef, UrlType};
pub use order::InsertionOrder;
pub use stats::CacheStats;
pub use store::UrlCache;
