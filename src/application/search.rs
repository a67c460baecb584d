//! Job search backed by the response cache.
//!
//! Identical filters within the TTL are answered from the cache. Concurrent
//! misses on the same filter are not coalesced: each one reaches the
//! provider and the last write wins.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jobscout_api_types::{JobRecord, JobSearchFilter};
use metrics::histogram;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::cache::{ResponseCache, search_key};

use super::provider::{JobProvider, ProviderError};

const METRIC_UPSTREAM_MS: &str = "jobscout_upstream_ms";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("failed to fingerprint search: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub jobs: Vec<JobRecord>,
    pub cached: bool,
}

pub struct SearchService {
    cache: Arc<ResponseCache>,
    provider: Arc<dyn JobProvider>,
    cache_enabled: bool,
    ttl: Duration,
}

impl SearchService {
    pub fn new(
        cache: Arc<ResponseCache>,
        provider: Arc<dyn JobProvider>,
        cache_enabled: bool,
    ) -> Self {
        let ttl = cache.default_ttl();
        Self {
            cache,
            provider,
            cache_enabled,
            ttl,
        }
    }

    /// Search with caching keyed on the canonical filter.
    #[instrument(skip_all)]
    pub async fn search(&self, filter: &JobSearchFilter) -> Result<SearchOutcome, SearchError> {
        if !self.cache_enabled {
            let jobs = self.fetch(filter).await?;
            return Ok(SearchOutcome {
                jobs,
                cached: false,
            });
        }

        let key = search_key(filter)?;

        if let Some(value) = self.cache.get(&key) {
            match serde_json::from_value::<Vec<JobRecord>>(value) {
                Ok(jobs) => {
                    debug!(cache = "search", outcome = "hit", key = %key, "serving cached search");
                    return Ok(SearchOutcome { jobs, cached: true });
                }
                Err(err) => {
                    warn!(
                        cache = "search",
                        key = %key,
                        error = %err,
                        "cached search has unexpected shape, refetching"
                    );
                }
            }
        }

        debug!(cache = "search", outcome = "miss", key = %key, "calling provider");
        let jobs = self.fetch(filter).await?;
        self.cache.set(key, serde_json::to_value(&jobs)?, self.ttl);

        Ok(SearchOutcome {
            jobs,
            cached: false,
        })
    }

    /// Call the provider directly, bypassing the cache.
    pub async fn fetch(&self, filter: &JobSearchFilter) -> Result<Vec<JobRecord>, ProviderError> {
        let started_at = Instant::now();
        let result = self.provider.search(filter).await;
        histogram!(
            METRIC_UPSTREAM_MS,
            "outcome" => if result.is_ok() { "ok" } else { "error" }
        )
        .record(started_at.elapsed().as_secs_f64() * 1000.0);
        result
    }
}
