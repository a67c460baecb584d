use std::net::{IpAddr, SocketAddr};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, Request, header::AUTHORIZATION};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::application::auth::AuthError;

use super::error::ApiError;
use super::state::ApiState;

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const FORWARDED_FOR: &str = "x-forwarded-for";
const ANONYMOUS_CLIENT: &str = "anonymous";

/// Reject privileged requests before they reach the cache.
///
/// The verified principal is attached to both the request and the response
/// so handlers and the outer logging layer can see who acted.
pub async fn admin_auth(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match extract_token(request.headers()) {
        Some(token) => token,
        None => return ApiError::from(AuthError::Missing).into_response(),
    };

    let principal = match state.verifier.verify(&token).await {
        Ok(principal) => principal,
        Err(err) => {
            debug!(target = "jobscout::api::auth", error = %err, "admin verification failed");
            return ApiError::from(err).into_response();
        }
    };

    request.extensions_mut().insert(principal.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    response
}

pub async fn search_rate_limit(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let client = client_key(
        request.headers(),
        peer,
        state.rate_limiter.trusts_forwarded_for(),
    );

    let (allowed, remaining) = state.rate_limiter.allow(&client, &path);
    if !allowed {
        return ApiError::rate_limited(state.rate_limiter.retry_after_secs());
    }

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
        response.headers_mut().insert(RATE_LIMIT_REMAINING, value);
    }
    response
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?.trim();
    (!bearer.is_empty()).then(|| bearer.to_string())
}

/// Peer address by default; the first `x-forwarded-for` hop only when the
/// limiter is configured to trust it.
fn client_key(headers: &HeaderMap, peer: Option<IpAddr>, trust_forwarded_for: bool) -> String {
    let forwarded = trust_forwarded_for
        .then(|| {
            headers
                .get(FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
        .flatten();

    forwarded
        .or_else(|| peer.map(|ip| ip.to_string()))
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
}
