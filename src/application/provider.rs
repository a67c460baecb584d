use async_trait::async_trait;
use jobscout_api_types::{JobRecord, JobSearchFilter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upstream payload could not be decoded: {0}")]
    Decode(String),
}

/// Source of job listings. Results for equal filters are assumed stable
/// enough to reuse within a cache TTL.
#[async_trait]
pub trait JobProvider: Send + Sync {
    async fn search(&self, filter: &JobSearchFilter) -> Result<Vec<JobRecord>, ProviderError>;
}
