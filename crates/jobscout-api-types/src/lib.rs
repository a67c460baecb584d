//! Request and response types shared by the jobscout server and its clients.

use serde::{Deserialize, Serialize};

/// Filter parameters accepted by the job search endpoint.
///
/// Field order is part of the wire contract: the server derives cache keys
/// from the serialized form, so two filters with equal fields always produce
/// the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobSearchFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_since_posted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
}

/// A single job listing as returned by the upstream provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobRecord {
    pub position: String,
    pub company: String,
    pub location: String,
    pub date: String,
    pub salary: String,
    pub job_url: String,
    pub company_logo: String,
    pub ago_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub jobs: Vec<JobRecord>,
    pub count: usize,
    /// True when the result was served from the response cache.
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListResponse {
    pub jobs: Vec<JobRecord>,
    pub count: usize,
}

/// Cumulative response cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub keys: usize,
    pub sets: u64,
    pub deletes: u64,
    pub expired: u64,
    /// Hits divided by lookups; zero before the first lookup.
    pub hit_rate: f64,
    pub default_ttl_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSizeResponse {
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKeysResponse {
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushResponse {
    pub flushed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClearPatternRequest {
    pub pattern: Option<String>,
}

/// Outcome of a pattern-based invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternClear {
    pub pattern: String,
    pub deleted_count: usize,
    pub remaining_keys: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_serializes_in_declaration_order() {
        let filter = JobSearchFilter {
            sort_by: Some("recent".to_string()),
            keyword: Some("rust".to_string()),
            limit: Some(10),
            ..Default::default()
        };
        let json = serde_json::to_string(&filter).expect("serialize filter");
        assert_eq!(json, r#"{"keyword":"rust","limit":10,"sortBy":"recent"}"#);
    }

    #[test]
    fn filter_accepts_camel_case_and_missing_fields() {
        let filter: JobSearchFilter =
            serde_json::from_str(r#"{"keyword":"go","dateSincePosted":"past week"}"#)
                .expect("parse filter");
        assert_eq!(filter.keyword.as_deref(), Some("go"));
        assert_eq!(filter.date_since_posted.as_deref(), Some("past week"));
        assert!(filter.location.is_none());
    }

    #[test]
    fn job_record_tolerates_partial_payloads() {
        let job: JobRecord = serde_json::from_str(r#"{"position":"Engineer","jobUrl":"https://x"}"#)
            .expect("parse job");
        assert_eq!(job.position, "Engineer");
        assert_eq!(job.job_url, "https://x");
        assert!(job.company.is_empty());
    }
}
