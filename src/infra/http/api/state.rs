use std::sync::Arc;

use crate::application::auth::AdminVerifier;
use crate::application::search::SearchService;
use crate::cache::{CacheConfig, ResponseCache};

use super::rate_limit::ApiRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub cache: Arc<ResponseCache>,
    pub cache_config: CacheConfig,
    pub search: Arc<SearchService>,
    pub verifier: Arc<dyn AdminVerifier>,
    pub rate_limiter: Arc<ApiRateLimiter>,
}
