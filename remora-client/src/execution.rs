//! Execution service adapter
//!
//! Translates a [`JobSpec`] into one submission call and exposes a
//! status query. No retries happen here; retry policy belongs to the caller.

use async_trait::async_trait;
use reqwest::{Client, Method};
use remora_core::dto::job::{DescribeJobResponse, SubmitJobRequest, SubmitJobResponse};
use remora_core::{JobHandle, JobSpec, JobStatus};
use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::error::{ClientError, Result};
use crate::HttpBackend;

/// Submit/describe contract of the remote execution service
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Starts a job
    ///
    /// Fails if the service rejects the request (malformed target, quota
    /// exceeded, service unavailable).
    async fn submit(&self, spec: &JobSpec) -> Result<JobHandle>;

    /// Reads the current status of a job
    ///
    /// Transport failures come back as errors for which
    /// [`ClientError::is_transient`] is true; callers record those as
    /// [`JobStatus::Unknown`] rather than as a job outcome.
    async fn describe(&self, handle: &JobHandle) -> Result<JobStatus>;
}

/// HTTP implementation of [`ExecutionClient`]
///
/// - `POST {endpoint}/jobs` submits a [`SubmitJobRequest`]
/// - `GET {endpoint}/jobs/{handle}` returns a [`DescribeJobResponse`]
#[derive(Debug, Clone)]
pub struct HttpExecutionClient {
    backend: HttpBackend,
}

impl HttpExecutionClient {
    /// Creates a client for the configured execution endpoint
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        Ok(Self {
            backend: HttpBackend::new(&config.execution_endpoint, config)?,
        })
    }

    /// Creates a client with a custom HTTP client
    ///
    /// This allows you to configure proxies, TLS settings, etc.
    pub fn with_client(config: &ServiceConfig, client: Client) -> Self {
        Self {
            backend: HttpBackend::with_client(&config.execution_endpoint, client, config),
        }
    }

    /// Get the base URL of the execution service
    pub fn base_url(&self) -> &str {
        self.backend.base_url()
    }
}

#[async_trait]
impl ExecutionClient for HttpExecutionClient {
    async fn submit(&self, spec: &JobSpec) -> Result<JobHandle> {
        let url = self.backend.url(["jobs"])?;
        debug!("Submitting job {} to {}", spec.job_id(), self.backend.base_url());

        let response = self
            .backend
            .request(Method::POST, url)
            .json(&SubmitJobRequest::from(spec))
            .send()
            .await?;

        let submitted: SubmitJobResponse = self.backend.handle_response(response).await?;

        if submitted.handle.as_str().is_empty() {
            return Err(ClientError::ParseError(
                "Service returned an empty job handle".to_string(),
            ));
        }

        info!("Job {} submitted with handle {}", spec.job_id(), submitted.handle);
        Ok(submitted.handle)
    }

    async fn describe(&self, handle: &JobHandle) -> Result<JobStatus> {
        let url = self.backend.url(["jobs", handle.as_str()])?;
        let response = self.backend.request(Method::GET, url).send().await?;

        let described: DescribeJobResponse = self.backend.handle_response(response).await?;

        if let Some(phase) = &described.phase {
            debug!("Job {} is {} (phase {})", handle, described.status, phase);
        } else {
            debug!("Job {} is {}", handle, described.status);
        }

        Ok(described.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_uses_execution_endpoint() {
        let config = ServiceConfig::new("http://localhost:8080/", "http://localhost:9000");
        let client = HttpExecutionClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_client_with_custom_client() {
        let config = ServiceConfig::new("http://localhost:8080", "http://localhost:9000");
        let client = HttpExecutionClient::with_client(&config, Client::new());
        assert_eq!(client.base_url(), "http://localhost:8080");
    }
}
