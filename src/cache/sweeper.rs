//! Periodic removal of expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::store::ResponseCache;

/// Spawn a task that sweeps `cache` every `period` until aborted.
///
/// Each pass takes the store's write lock once; request handlers are held
/// up for at most one pass.
pub fn spawn_sweeper<V>(cache: Arc<ResponseCache<V>>, period: Duration) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            let removed = cache.sweep_expired();
            if removed > 0 {
                debug!(cache = "response", removed, "swept expired entries");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sweeper_drops_expired_entries_without_reads() {
        let cache: Arc<ResponseCache> =
            Arc::new(ResponseCache::with_default_ttl(Duration::from_secs(60)));
        cache.set("short", json!(1), Duration::from_secs(1));
        cache.set("long", json!(2), Duration::from_secs(3600));

        let handle = spawn_sweeper(Arc::clone(&cache), Duration::from_secs(2));
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(cache.stats().expired, 1);
        assert_eq!(cache.stats().misses, 0);
        assert_eq!(cache.keys(), vec!["long".to_string()]);

        handle.abort();
        let _ = handle.await;
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_does_not_run_before_first_period() {
        let cache: Arc<ResponseCache> =
            Arc::new(ResponseCache::with_default_ttl(Duration::from_secs(60)));
        cache.set("short", json!(1), Duration::from_secs(1));

        let handle = spawn_sweeper(Arc::clone(&cache), Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(cache.stats().expired, 0);

        handle.abort();
        let _ = handle.await;
    }
}
