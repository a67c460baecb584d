use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

/// Full pass over all buckets after this many admitted checks.
const PRUNE_INTERVAL: u64 = 256;

/// Sliding-window limiter for the search route, one bucket per client.
///
/// Buckets whose newest hit has left the window are evicted on a periodic
/// pass, so idle or one-off clients do not accumulate.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    window: Duration,
    max_requests: u32,
    trust_forwarded_for: bool,
    buckets: Arc<DashMap<String, VecDeque<Instant>>>,
    checks: Arc<AtomicU64>,
}

impl ApiRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            trust_forwarded_for: false,
            buckets: Arc::new(DashMap::new()),
            checks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Key clients on `x-forwarded-for` instead of the peer address. Only
    /// safe behind a proxy that overwrites the header.
    pub fn with_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub fn trusts_forwarded_for(&self) -> bool {
        self.trust_forwarded_for
    }

    /// Count one request from `client` on `route`. Returns whether it is
    /// admitted and how many requests remain in the current window.
    pub fn allow(&self, client: &str, route: &str) -> (bool, u32) {
        let now = Instant::now();
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_INTERVAL == PRUNE_INTERVAL - 1 {
            self.prune_at(now);
        }

        let mut hits = self
            .buckets
            .entry(format!("{client}|{route}"))
            .or_default();
        while hits
            .front()
            .is_some_and(|oldest| now.duration_since(*oldest) >= self.window)
        {
            hits.pop_front();
        }

        let used = u32::try_from(hits.len()).unwrap_or(u32::MAX);
        if used >= self.max_requests {
            return (false, 0);
        }

        hits.push_back(now);
        (true, self.max_requests - used - 1)
    }

    /// Drop every bucket with no hits inside the window. Returns how many
    /// were evicted.
    pub fn prune(&self) -> usize {
        self.prune_at(Instant::now())
    }

    fn prune_at(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, hits| {
            hits.back()
                .is_some_and(|newest| now.duration_since(*newest) < self.window)
        });
        let evicted = before.saturating_sub(self.buckets.len());
        if evicted > 0 {
            debug!(target = "jobscout::api::rate_limit", evicted, "evicted idle rate limit buckets");
        }
        evicted
    }

    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTE: &str = "/api/jobs/search";

    #[test]
    fn blocks_after_limit_within_window() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 2);

        assert_eq!(limiter.allow("client", ROUTE), (true, 1));
        assert_eq!(limiter.allow("client", ROUTE), (true, 0));
        assert_eq!(limiter.allow("client", ROUTE), (false, 0));
    }

    #[test]
    fn buckets_are_independent_per_client() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 1);

        assert!(limiter.allow("a", ROUTE).0);
        assert!(!limiter.allow("a", ROUTE).0);
        assert!(limiter.allow("b", ROUTE).0);
    }

    #[test]
    fn idle_buckets_are_evicted() {
        let limiter = ApiRateLimiter::new(Duration::from_millis(20), 5);
        for client in ["a", "b", "c"] {
            limiter.allow(client, ROUTE);
        }
        assert_eq!(limiter.prune(), 0);
        assert_eq!(limiter.buckets.len(), 3);

        std::thread::sleep(Duration::from_millis(40));
        limiter.allow("c", ROUTE);

        assert_eq!(limiter.prune(), 2);
        assert_eq!(limiter.buckets.len(), 1);
        assert!(limiter.buckets.contains_key(&format!("c|{ROUTE}")));
    }

    #[test]
    fn many_distinct_clients_do_not_accumulate() {
        let limiter = ApiRateLimiter::new(Duration::from_millis(10), 1);
        for i in 0..PRUNE_INTERVAL {
            limiter.allow(&format!("client-{i}"), ROUTE);
        }
        std::thread::sleep(Duration::from_millis(20));

        for i in 0..PRUNE_INTERVAL {
            limiter.allow(&format!("other-{i}"), ROUTE);
        }

        // the periodic pass dropped the first wave
        assert!(limiter.buckets.len() <= PRUNE_INTERVAL as usize);
    }

    #[test]
    fn forwarded_for_is_untrusted_by_default() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 1);
        assert!(!limiter.trusts_forwarded_for());
        assert!(limiter.with_forwarded_for(true).trusts_forwarded_for());
    }

    #[test]
    fn retry_after_is_at_least_one_second() {
        let limiter = ApiRateLimiter::new(Duration::from_millis(200), 1);
        assert_eq!(limiter.retry_after_secs(), 1);
    }
}
