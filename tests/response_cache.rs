use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    body::Body,
    http::{
        Method, Request, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use http_body_util::BodyExt;
use jobscout::cache::{CacheConfig, CacheState, ResponseCache, X_CACHE, response_cache_layer};
use serde_json::{Value, json};
use tower::ServiceExt;

struct Fixture {
    app: Router,
    cache: Arc<ResponseCache>,
    calls: Arc<AtomicUsize>,
}

fn fixture(config: CacheConfig) -> Fixture {
    let cache = Arc::new(ResponseCache::new(&config));
    let calls = Arc::new(AtomicUsize::new(0));

    let json_calls = Arc::clone(&calls);
    let failing_calls = Arc::clone(&calls);
    let text_calls = Arc::clone(&calls);
    let app = Router::new()
        .route(
            "/jobs",
            get(move || {
                let calls = Arc::clone(&json_calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    Json(json!({"call": n}))
                }
            })
            .post(|| async { Json(json!({"posted": true})) }),
        )
        .route(
            "/broken",
            get(move || {
                let calls = Arc::clone(&failing_calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::BAD_GATEWAY, Json(json!({"error": "upstream"}))).into_response()
                }
            }),
        )
        .route(
            "/large",
            get(|| async { Json(json!({"jobs": "x".repeat(1000)})) }),
        )
        .route(
            "/malformed",
            get(|| async { ([(CONTENT_TYPE, "application/json")], "{not json") }),
        )
        .route(
            "/plain",
            get(move || {
                let calls = Arc::clone(&text_calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    "plain text"
                }
            }),
        )
        .layer(middleware::from_fn_with_state(
            CacheState {
                config,
                cache: Arc::clone(&cache),
            },
            response_cache_layer,
        ));

    Fixture { app, cache, calls }
}

async fn call(app: &Router, method: Method, uri: &str, no_cache: bool) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if no_cache {
        builder = builder.header(CACHE_CONTROL, "no-cache");
    }
    let request = builder.body(Body::empty()).expect("request should build");
    app.clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn x_cache(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(X_CACHE)
        .and_then(|value| value.to_str().ok())
}

#[tokio::test]
async fn second_get_is_a_hit_with_the_same_body() {
    let f = fixture(CacheConfig::default());

    let first = call(&f.app, Method::GET, "/jobs?q=rust", false).await;
    assert_eq!(x_cache(&first), Some("MISS"));
    let first = body_json(first).await;

    let second = call(&f.app, Method::GET, "/jobs?q=rust", false).await;
    assert_eq!(x_cache(&second), Some("HIT"));
    let second = body_json(second).await;

    assert_eq!(first, json!({"call": 1}));
    assert_eq!(first, second);
    assert_eq!(f.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn query_string_is_part_of_the_key() {
    let f = fixture(CacheConfig::default());

    call(&f.app, Method::GET, "/jobs?q=rust", false).await;
    let other = call(&f.app, Method::GET, "/jobs?q=go", false).await;

    assert_eq!(x_cache(&other), Some("MISS"));
    assert_eq!(f.calls.load(Ordering::SeqCst), 2);
    assert_eq!(f.cache.len(), 2);
}

#[tokio::test]
async fn no_cache_request_refreshes_the_entry() {
    let f = fixture(CacheConfig::default());

    call(&f.app, Method::GET, "/jobs", false).await;
    let fresh = call(&f.app, Method::GET, "/jobs", true).await;
    assert_eq!(x_cache(&fresh), Some("MISS"));
    assert_eq!(body_json(fresh).await, json!({"call": 2}));

    let replay = call(&f.app, Method::GET, "/jobs", false).await;
    assert_eq!(x_cache(&replay), Some("HIT"));
    assert_eq!(body_json(replay).await, json!({"call": 2}));
}

#[tokio::test]
async fn error_responses_are_not_cached() {
    let f = fixture(CacheConfig::default());

    for _ in 0..2 {
        let response = call(&f.app, Method::GET, "/broken", false).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(x_cache(&response).is_none());
    }
    assert_eq!(f.calls.load(Ordering::SeqCst), 2);
    assert!(f.cache.is_empty());
}

#[tokio::test]
async fn non_json_responses_pass_through() {
    let f = fixture(CacheConfig::default());

    call(&f.app, Method::GET, "/plain", false).await;
    call(&f.app, Method::GET, "/plain", false).await;

    assert_eq!(f.calls.load(Ordering::SeqCst), 2);
    assert!(f.cache.is_empty());
}

#[tokio::test]
async fn post_requests_bypass_the_cache() {
    let f = fixture(CacheConfig::default());

    let response = call(&f.app, Method::POST, "/jobs", false).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(x_cache(&response).is_none());
    assert!(f.cache.is_empty());
}

#[tokio::test]
async fn disabled_cache_always_runs_the_handler() {
    let f = fixture(CacheConfig {
        enabled: false,
        ..Default::default()
    });

    call(&f.app, Method::GET, "/jobs", false).await;
    let second = call(&f.app, Method::GET, "/jobs", false).await;

    assert!(x_cache(&second).is_none());
    assert_eq!(f.calls.load(Ordering::SeqCst), 2);
    assert!(f.cache.is_empty());
}

#[tokio::test]
async fn flushed_entries_are_recomputed() {
    let f = fixture(CacheConfig::default());

    call(&f.app, Method::GET, "/jobs", false).await;
    assert_eq!(f.cache.flush(), 1);

    let after = call(&f.app, Method::GET, "/jobs", false).await;
    assert_eq!(x_cache(&after), Some("MISS"));
    assert_eq!(f.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn oversized_bodies_pass_through_uncached() {
    let f = fixture(CacheConfig {
        body_limit_bytes: 64,
        ..Default::default()
    });

    let response = call(&f.app, Method::GET, "/large", false).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(x_cache(&response).is_none());
    let body = body_json(response).await;
    assert_eq!(body["jobs"].as_str().map(str::len), Some(1000));
    assert!(f.cache.is_empty());

    let small = call(&f.app, Method::GET, "/jobs", false).await;
    assert_eq!(x_cache(&small), Some("MISS"));
    assert_eq!(f.cache.len(), 1);
}

#[tokio::test]
async fn unparsable_json_is_returned_without_a_cache_marker() {
    let f = fixture(CacheConfig::default());

    let response = call(&f.app, Method::GET, "/malformed", false).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(x_cache(&response).is_none());
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    assert_eq!(&bytes[..], b"{not json");
    assert!(f.cache.is_empty());
}
