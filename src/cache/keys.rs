//! Cache key derivation.
//!
//! The store treats keys as opaque strings. Everything that makes two
//! logically identical requests land on the same key happens here.

use axum::http::Method;
use jobscout_api_types::JobSearchFilter;

/// Prefix shared by every search fingerprint, so `clear_by_pattern("search")`
/// drops all cached searches at once.
pub const SEARCH_KEY_PREFIX: &str = "search:";

/// Key for a query-style read: method, path and raw query string.
pub fn request_key(method: &Method, path: &str, query: Option<&str>) -> String {
    match query.filter(|q| !q.is_empty()) {
        Some(query) => format!("{method}:{path}?{query}"),
        None => format!("{method}:{path}"),
    }
}

/// Key for a parameterized search.
///
/// The filter is canonicalized first (trimmed, blank fields dropped) and then
/// serialized in struct field order.
pub fn search_key(filter: &JobSearchFilter) -> Result<String, serde_json::Error> {
    let canonical = canonicalize(filter);
    let body = serde_json::to_string(&canonical)?;
    Ok(format!("{SEARCH_KEY_PREFIX}{body}"))
}

/// Normalize incidental differences between equivalent filters.
pub fn canonicalize(filter: &JobSearchFilter) -> JobSearchFilter {
    JobSearchFilter {
        keyword: clean(&filter.keyword),
        location: clean(&filter.location),
        date_since_posted: clean(&filter.date_since_posted),
        job_type: clean(&filter.job_type),
        remote_filter: clean(&filter.remote_filter),
        salary: clean(&filter.salary),
        experience_level: clean(&filter.experience_level),
        limit: filter.limit,
        page: filter.page,
        sort_by: clean(&filter.sort_by),
    }
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_key_includes_query_when_present() {
        assert_eq!(
            request_key(&Method::GET, "/api/jobs/recent", Some("limit=5")),
            "GET:/api/jobs/recent?limit=5"
        );
        assert_eq!(
            request_key(&Method::GET, "/api/jobs/recent", Some("")),
            "GET:/api/jobs/recent"
        );
        assert_eq!(
            request_key(&Method::GET, "/api/jobs/recent", None),
            "GET:/api/jobs/recent"
        );
    }

    #[test]
    fn equivalent_filters_share_a_key() {
        let a = JobSearchFilter {
            keyword: Some("python".to_string()),
            location: Some("  Berlin ".to_string()),
            salary: Some(String::new()),
            ..Default::default()
        };
        let b = JobSearchFilter {
            location: Some("Berlin".to_string()),
            keyword: Some("python".to_string()),
            ..Default::default()
        };

        assert_eq!(search_key(&a).unwrap(), search_key(&b).unwrap());
    }

    #[test]
    fn different_filters_produce_different_keys() {
        let a = JobSearchFilter {
            keyword: Some("python".to_string()),
            ..Default::default()
        };
        let b = JobSearchFilter {
            keyword: Some("rust".to_string()),
            ..Default::default()
        };
        assert_ne!(search_key(&a).unwrap(), search_key(&b).unwrap());
    }

    #[test]
    fn search_keys_carry_the_search_prefix() {
        let key = search_key(&JobSearchFilter::default()).unwrap();
        assert_eq!(key, "search:{}");
        assert!(key.starts_with(SEARCH_KEY_PREFIX));
    }
}
