//! Response Cache
//!
//! A process-wide, key-addressed store of previously computed JSON
//! responses with a fixed per-entry TTL:
//!
//! - [`ResponseCache`]: the store (get/set/delete/flush/keys/pattern clear/stats)
//! - [`keys`]: fingerprint derivation for reads and searches
//! - [`response_cache_layer`]: axum middleware for GET routes
//! - [`spawn_sweeper`]: periodic expiry sweep
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! default_ttl_seconds = 3600
//! check_period_seconds = 600
//! ```
//!
//! The cache is injected wherever it is needed; there is no global instance.
//! Concurrent misses on one key each recompute independently.

mod config;
pub mod keys;
mod lock;
mod middleware;
mod store;
mod sweeper;

pub use config::CacheConfig;
pub use keys::{SEARCH_KEY_PREFIX, request_key, search_key};
pub use middleware::{CacheState, X_CACHE, response_cache_layer};
pub use store::{CacheError, ResponseCache};
pub use sweeper::spawn_sweeper;
