use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Query, State};
use jobscout_api_types::{
    CacheKeysResponse, CacheSizeResponse, CacheStats, ClearPatternRequest, FlushResponse,
    HealthResponse, JobListResponse, JobSearchFilter, PatternClear, SearchResponse,
};
use serde::Deserialize;
use tracing::info;

use crate::application::auth::AdminPrincipal;
use crate::application::search::SearchError;

use super::error::ApiError;
use super::state::ApiState;

const RECENT_DEFAULT_LIMIT: u32 = 25;
const RECENT_MAX_LIMIT: u32 = 100;
const RECENT_WINDOW: &str = "24hr";
const RECENT_SORT: &str = "recent";

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn search_jobs(
    State(state): State<ApiState>,
    payload: Result<Json<JobSearchFilter>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(filter) = payload
        .map_err(|err| ApiError::bad_request("Invalid search filter", Some(err.body_text())))?;

    let outcome = state.search.search(&filter).await?;

    Ok(Json(SearchResponse {
        count: outcome.jobs.len(),
        jobs: outcome.jobs,
        cached: outcome.cached,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecentJobsQuery {
    pub keyword: Option<String>,
    pub location: Option<String>,
    pub limit: Option<u32>,
}

/// Listings posted in the last day. Cached by the response cache layer.
pub async fn recent_jobs(
    State(state): State<ApiState>,
    Query(query): Query<RecentJobsQuery>,
) -> Result<Json<JobListResponse>, ApiError> {
    let filter = JobSearchFilter {
        keyword: query.keyword,
        location: query.location,
        date_since_posted: Some(RECENT_WINDOW.to_string()),
        sort_by: Some(RECENT_SORT.to_string()),
        limit: Some(
            query
                .limit
                .unwrap_or(RECENT_DEFAULT_LIMIT)
                .clamp(1, RECENT_MAX_LIMIT),
        ),
        ..Default::default()
    };

    let jobs = state
        .search
        .fetch(&filter)
        .await
        .map_err(SearchError::from)?;

    Ok(Json(JobListResponse {
        count: jobs.len(),
        jobs,
    }))
}

pub async fn cache_stats(State(state): State<ApiState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

pub async fn cache_size(State(state): State<ApiState>) -> Json<CacheSizeResponse> {
    Json(CacheSizeResponse {
        size: state.cache.len(),
    })
}

pub async fn cache_keys(State(state): State<ApiState>) -> Json<CacheKeysResponse> {
    let mut keys = state.cache.keys();
    keys.sort();
    Json(CacheKeysResponse { keys })
}

pub async fn cache_flush(
    State(state): State<ApiState>,
    Extension(principal): Extension<AdminPrincipal>,
) -> Json<FlushResponse> {
    let flushed = state.cache.flush();
    info!(
        target = "jobscout::api::cache",
        actor = %principal.subject,
        flushed,
        "response cache flushed"
    );
    Json(FlushResponse { flushed })
}

pub async fn cache_clear(
    State(state): State<ApiState>,
    Extension(principal): Extension<AdminPrincipal>,
    payload: Result<Json<ClearPatternRequest>, JsonRejection>,
) -> Result<Json<PatternClear>, ApiError> {
    let Json(request) = payload
        .map_err(|err| ApiError::bad_request("Invalid clear request", Some(err.body_text())))?;

    let pattern = request.pattern.unwrap_or_default();
    let outcome = state.cache.clear_by_pattern(&pattern)?;

    info!(
        target = "jobscout::api::cache",
        actor = %principal.subject,
        pattern = %outcome.pattern,
        deleted = outcome.deleted_count,
        remaining = outcome.remaining_keys,
        "response cache cleared by pattern"
    );

    Ok(Json(outcome))
}
