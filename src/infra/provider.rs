//! HTTP adapter for the upstream job search provider.

use std::time::Duration;

use async_trait::async_trait;
use jobscout_api_types::{JobRecord, JobSearchFilter};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::application::provider::{JobProvider, ProviderError};

use super::error::InfraError;

const MAX_ERROR_BODY_CHARS: usize = 512;

/// POSTs the filter as JSON to a search endpoint and decodes the listings.
#[derive(Debug, Clone)]
pub struct HttpJobProvider {
    client: Client,
    url: String,
}

/// Providers answer with either a bare list or a `{ "jobs": [...] }` envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum SearchPayload {
    List(Vec<JobRecord>),
    Envelope { jobs: Vec<JobRecord> },
}

impl SearchPayload {
    fn into_jobs(self) -> Vec<JobRecord> {
        match self {
            Self::List(jobs) | Self::Envelope { jobs } => jobs,
        }
    }
}

impl HttpJobProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("jobscout/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl JobProvider for HttpJobProvider {
    #[instrument(skip_all, fields(url = %self.url))]
    async fn search(&self, filter: &JobSearchFilter) -> Result<Vec<JobRecord>, ProviderError> {
        let response = self
            .client
            .post(&self.url)
            .json(filter)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let bytes = response.bytes().await.map_err(map_transport_error)?;
        let payload: SearchPayload = serde_json::from_slice(&bytes)
            .map_err(|err| ProviderError::Decode(err.to_string()))?;
        let jobs = payload.into_jobs();

        debug!(count = jobs.len(), "upstream search completed");
        Ok(jobs)
    }
}

fn map_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_accepts_bare_list() {
        let payload: SearchPayload =
            serde_json::from_str(r#"[{"position":"Engineer"}]"#).expect("list payload");
        let jobs = payload.into_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].position, "Engineer");
    }

    #[test]
    fn payload_accepts_envelope() {
        let payload: SearchPayload =
            serde_json::from_str(r#"{"jobs":[{"company":"Acme"},{"company":"Initech"}]}"#)
                .expect("envelope payload");
        let jobs = payload.into_jobs();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].company, "Initech");
    }

    #[test]
    fn payload_rejects_other_shapes() {
        assert!(serde_json::from_str::<SearchPayload>(r#"{"results":[]}"#).is_err());
    }
}
