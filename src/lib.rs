//! jobscout: a job search proxy with a TTL response cache.
//!
//! Searches are forwarded to an upstream provider and identical filters are
//! answered from [`cache::ResponseCache`] within the configured TTL. An HTTP
//! surface exposes search plus cache statistics and privileged invalidation.

pub mod application;
pub mod cache;
pub mod config;
pub mod infra;
