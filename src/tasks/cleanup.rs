//! Expired URL Sweep Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::UrlCache;

// == Cleanup Task ==
/// Owned handle to the periodic sweep. Dropping it stops the sweep.
///
/// The sweep only removes entries; reads already enforce expiry on their own.
#[derive(Debug)]
pub struct CleanupTask {
    handle: JoinHandle<()>,
}

impl CleanupTask {
    /// Starts sweeping `cache` every `interval`.
    ///
    /// The first sweep runs one full interval after start.
    pub fn start(cache: Arc<RwLock<UrlCache>>, interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            info!("Starting expired url sweep every {:?}", interval);

            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let removed = cache.write().await.clear_expired_urls();

                if removed > 0 {
                    info!("Url sweep: removed {} expired entries", removed);
                } else {
                    debug!("Url sweep: no expired entries found");
                }
            }
        });

        Self { handle }
    }

    /// Stops the sweep. Safe to call more than once.
    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CleanupTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
