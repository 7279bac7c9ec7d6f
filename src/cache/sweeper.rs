//! Periodic removal of expired cache entries.

use std::time::Duration;
use tokio::time;

use crate::cache::ResponseCache;
use crate::lifecycle::shutdown::ShutdownListener;

/// Default period between sweeps.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Sweeps the cache on a timer so it stays bounded without reads.
pub struct CacheSweeper {
    cache: ResponseCache,
    interval: Duration,
}

impl CacheSweeper {
    pub fn new(cache: ResponseCache, interval: Duration) -> Self {
        Self { cache, interval }
    }

    /// Sweep immediately, then every interval, until shutdown.
    pub async fn run(self, mut shutdown: ShutdownListener) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Cache sweeper starting");

        let mut ticker = time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.cache.cleanup_expired().await {
                        tracing::error!(error = %e, "Cache cleanup failed");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::cache::{ManualClock, DEFAULT_TTL};
    use crate::lifecycle::Shutdown;

    #[tokio::test]
    async fn test_sweeper_removes_expired_without_reads() {
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = ResponseCache::in_memory(DEFAULT_TTL, clock.clone()).unwrap();
        cache.set("GET:/employees", "[]").await.unwrap();
        clock.advance(DEFAULT_TTL.as_secs() as i64 + 1);

        let shutdown = Shutdown::new();
        let sweeper = CacheSweeper::new(cache.clone(), Duration::from_millis(20));
        let handle = tokio::spawn(sweeper.run(shutdown.subscribe()));

        let mut swept = false;
        for _ in 0..50 {
            if cache.is_empty().await.unwrap() {
                swept = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(swept, "sweeper should have removed the expired entry");

        shutdown.trigger();
        handle.await.unwrap();
    }
}
