//! Remora Client
//!
//! Adapters for the two remote collaborators of the orchestrator: the
//! execution service (submit a job, describe its status) and the object
//! store holding job artifacts (list a prefix, get an object).
//!
//! Both are exposed as traits so the orchestrator can be driven by the HTTP
//! implementations in production and by scripted doubles in tests.
//!
//! # Example
//!
//! ```no_run
//! use remora_client::{ExecutionClient, HttpExecutionClient, ServiceConfig};
//! use remora_core::JobSpec;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServiceConfig::new("http://localhost:8080", "http://localhost:9000");
//!     let client = HttpExecutionClient::new(&config)?;
//!
//!     let spec = JobSpec::generate("https://github.com/org/repo", "docs-output", "doc-gen")?;
//!     let handle = client.submit(&spec).await?;
//!
//!     println!("Submitted job {} as {}", spec.job_id(), handle);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
mod execution;
mod local;
mod storage;

// Re-export commonly used types
pub use config::ServiceConfig;
pub use error::{ClientError, Result};
pub use execution::{ExecutionClient, HttpExecutionClient};
pub use local::LocalObjectStore;
pub use storage::{HttpObjectStore, ObjectStore};

use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;

/// Header carrying the configured region
pub const REGION_HEADER: &str = "x-remora-region";

/// Shared HTTP plumbing for the service adapters
///
/// Holds the base URL, a configured reqwest client and the per-request
/// headers every call carries.
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client instance
    client: Client,
    region: String,
    auth_token: Option<String>,
}

impl HttpBackend {
    pub(crate) fn new(base_url: &str, config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(base_url, client, config))
    }

    pub(crate) fn with_client(base_url: &str, client: Client, config: &ServiceConfig) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            region: config.region.clone(),
            auth_token: config.auth_token.clone(),
        }
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds a URL from path segments, percent-encoding each one
    pub(crate) fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidConfig(format!("Invalid base URL {}: {}", self.base_url, e)))?;

        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidConfig(format!("Base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    /// Starts a request with region and authorization headers set
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(REGION_HEADER, &self.region);

        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    pub(crate) async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let response = Self::check_status(response).await?;
        let body = response.bytes().await?;

        serde_json::from_slice(&body)
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response whose body is raw bytes
    pub(crate) async fn handle_bytes(&self, response: reqwest::Response) -> Result<Vec<u8>> {
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await?;

        Ok(bytes.to_vec())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServiceConfig {
        ServiceConfig::new("http://localhost:8080", "http://localhost:9000")
    }

    #[test]
    fn test_backend_trims_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:8080/", &config()).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_url_encodes_segments() {
        let backend = HttpBackend::new("http://localhost:8080/api", &config()).unwrap();
        let url = backend.url(["jobs", "project:build 1"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/jobs/project:build%201");
    }

    #[test]
    fn test_url_keeps_key_hierarchy() {
        let backend = HttpBackend::new("http://localhost:9000", &config()).unwrap();
        let url = backend
            .url(std::iter::once("objects").chain("docs/job-1/a.md".split('/')))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/objects/docs/job-1/a.md");
    }

    #[test]
    fn test_backend_with_custom_client() {
        let backend = HttpBackend::with_client("http://localhost:8080", Client::new(), &config());
        assert_eq!(backend.base_url(), "http://localhost:8080");
    }
}
