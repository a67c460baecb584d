//! Cache configuration.
//!
//! Controls the response cache via the `[cache]` section of `jobscout.toml`.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_TTL_SECONDS: u64 = 3600;
const DEFAULT_CHECK_PERIOD_SECONDS: u64 = 600;
const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the response cache for search and GET routes.
    pub enabled: bool,
    /// TTL applied when callers do not pass one. Zero means entries never expire.
    pub default_ttl_seconds: u64,
    /// Interval between expiry sweeps.
    pub check_period_seconds: u64,
    /// Largest response body the middleware will buffer for caching.
    pub body_limit_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_seconds: DEFAULT_TTL_SECONDS,
            check_period_seconds: DEFAULT_CHECK_PERIOD_SECONDS,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            default_ttl_seconds: settings.default_ttl.as_secs(),
            check_period_seconds: settings.check_period.as_secs(),
            body_limit_bytes: settings.body_limit_bytes,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    /// Sweep interval, clamped to one second so the timer never spins.
    pub fn check_period(&self) -> Duration {
        Duration::from_secs(self.check_period_seconds.max(1))
    }
}
