pub mod error;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::cache::{CacheState, response_cache_layer};
use crate::infra::http::middleware::{log_responses, set_request_context};

pub fn build_api_router(state: ApiState) -> Router {
    let cache_state = CacheState {
        config: state.cache_config.clone(),
        cache: state.cache.clone(),
    };

    let privileged = Router::new()
        .route("/api/cache/keys", get(handlers::cache_keys))
        .route("/api/cache/flush", post(handlers::cache_flush))
        .route("/api/cache/clear", post(handlers::cache_clear))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::admin_auth,
        ));

    let search = Router::new()
        .route("/api/jobs/search", post(handlers::search_jobs))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::search_rate_limit,
        ));

    let cached_reads = Router::new()
        .route("/api/jobs/recent", get(handlers::recent_jobs))
        .route_layer(axum_middleware::from_fn_with_state(
            cache_state,
            response_cache_layer,
        ));

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/cache/stats", get(handlers::cache_stats))
        .route("/api/cache/size", get(handlers::cache_size))
        .merge(privileged)
        .merge(search)
        .merge(cached_reads)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
