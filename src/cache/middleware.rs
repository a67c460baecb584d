//! Response cache middleware.
//!
//! Caches successful JSON responses of GET routes, keyed by method, path
//! and query string. Only the body is stored; replays are sent as 200 JSON.

use std::sync::Arc;

use axum::{
    Json,
    body::{Body, HttpBody},
    extract::State,
    http::{
        HeaderValue, Method, Request, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, HeaderName},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{CacheConfig, ResponseCache, keys::request_key};

/// Marks whether a response was served from the cache.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Shared cache state for middleware.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub cache: Arc<ResponseCache>,
}

/// Middleware for GET response caching.
///
/// A request with `Cache-Control: no-cache` skips the lookup but its fresh
/// response still replaces the stored one.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(state): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = request_key(request.method(), request.uri().path(), request.uri().query());

    if !wants_fresh(&request) {
        if let Some(cached) = state.cache.get(&key) {
            debug!(cache = "response", outcome = "hit", "serving cached response");
            return replay(cached);
        }
    }

    debug!(cache = "response", outcome = "miss", "cache miss, executing handler");

    let response = next.run(request).await;
    if !response.status().is_success() || !is_json(&response) {
        return response;
    }
    if !fits_limit(&response, state.config.body_limit_bytes) {
        debug!(
            cache = "response",
            limit = state.config.body_limit_bytes,
            "response body unbounded or over limit, not caching"
        );
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, state.config.body_limit_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(
                cache = "response",
                limit = state.config.body_limit_bytes,
                error = %err,
                "failed to buffer response body"
            );
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => {
            debug!(cache = "response", key = %key, "caching response");
            state.cache.set_default(key, value);
            parts.headers.insert(X_CACHE, HeaderValue::from_static("MISS"));
        }
        Err(err) => {
            debug!(cache = "response", error = %err, "response body is not JSON, skipping");
        }
    }

    Response::from_parts(parts, Body::from(bytes))
}

fn wants_fresh(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("no-cache"))
}

/// Only bodies with a known upper bound within `limit` are buffered.
fn fits_limit(response: &Response, limit: usize) -> bool {
    response
        .body()
        .size_hint()
        .upper()
        .and_then(|upper| usize::try_from(upper).ok())
        .is_some_and(|upper| upper <= limit)
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

fn replay(value: Value) -> Response {
    let mut response = Json(value).into_response();
    response
        .headers_mut()
        .insert(X_CACHE, HeaderValue::from_static("HIT"));
    response
}
