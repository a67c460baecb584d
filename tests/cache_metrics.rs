use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Json, Router,
    body::Body,
    http::{Method, Request, StatusCode},
    middleware,
    routing::get,
};
use jobscout::application::provider::{JobProvider, ProviderError};
use jobscout::application::search::SearchService;
use jobscout::cache::{CacheConfig, CacheState, ResponseCache, response_cache_layer};
use jobscout_api_types::{JobRecord, JobSearchFilter};
use metrics_util::debugging::DebuggingRecorder;
use serde_json::json;
use tower::ServiceExt;

struct EmptyProvider;

#[async_trait]
impl JobProvider for EmptyProvider {
    async fn search(&self, _filter: &JobSearchFilter) -> Result<Vec<JobRecord>, ProviderError> {
        Ok(Vec::new())
    }
}

#[tokio::test(start_paused = true)]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    // store hit/miss/expiry
    let cache = ResponseCache::<serde_json::Value>::with_default_ttl(Duration::from_secs(60));
    assert!(cache.get("search:a").is_none());
    cache.set("search:a", json!([]), Duration::from_secs(1));
    assert!(cache.get("search:a").is_some());
    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.sweep_expired(), 1);

    // upstream latency through the search service
    let shared = Arc::new(ResponseCache::with_default_ttl(Duration::from_secs(60)));
    let service = SearchService::new(Arc::clone(&shared), Arc::new(EmptyProvider), true);
    service
        .search(&JobSearchFilter::default())
        .await
        .expect("search should succeed");

    // middleware hit/miss
    let cache_state = CacheState {
        config: CacheConfig::default(),
        cache: Arc::new(ResponseCache::new(&CacheConfig::default())),
    };
    let calls = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/api/jobs/recent",
            get(move || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Json(json!({"jobs": [], "count": 0}))
                }
            }),
        )
        .layer(middleware::from_fn_with_state(
            cache_state,
            response_cache_layer,
        ));

    for _ in 0..2 {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/jobs/recent")
            .body(Body::empty())
            .expect("request should build");
        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "jobscout_cache_hit_total",
        "jobscout_cache_miss_total",
        "jobscout_cache_expired_total",
        "jobscout_cache_keys",
        "jobscout_upstream_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
