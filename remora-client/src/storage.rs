//! Object store adapter
//!
//! Read-only access to the store holding job artifacts. Listing is paginated;
//! callers follow `next_token` until it is absent.

use async_trait::async_trait;
use reqwest::{Client, Method};
use remora_core::dto::storage::ListObjectsResponse;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::error::{ClientError, Result};
use crate::HttpBackend;

/// List/get contract of the remote object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists one page of object keys under `prefix`
    ///
    /// # Arguments
    /// * `prefix` - Key prefix to enumerate
    /// * `continuation` - Token from the previous page, `None` for the first
    async fn list(&self, prefix: &str, continuation: Option<&str>) -> Result<ListObjectsResponse>;

    /// Reads a whole object
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
}

/// HTTP implementation of [`ObjectStore`]
///
/// - `GET {endpoint}/objects?prefix=..&token=..` returns a [`ListObjectsResponse`]
/// - `GET {endpoint}/objects/{key}` returns the object body
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    backend: HttpBackend,
}

impl HttpObjectStore {
    /// Creates a store client for the configured storage endpoint
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        Ok(Self {
            backend: HttpBackend::new(&config.storage_endpoint, config)?,
        })
    }

    /// Creates a store client with a custom HTTP client
    pub fn with_client(config: &ServiceConfig, client: Client) -> Self {
        Self {
            backend: HttpBackend::with_client(&config.storage_endpoint, client, config),
        }
    }

    /// Get the base URL of the object store
    pub fn base_url(&self) -> &str {
        self.backend.base_url()
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn list(&self, prefix: &str, continuation: Option<&str>) -> Result<ListObjectsResponse> {
        let url = self.backend.url(["objects"])?;

        let mut request = self
            .backend
            .request(Method::GET, url)
            .query(&[("prefix", prefix)]);
        if let Some(token) = continuation {
            request = request.query(&[("token", token)]);
        }

        let response = request.send().await?;
        let page: ListObjectsResponse = self.backend.handle_response(response).await?;

        debug!(
            "Listed {} object(s) under {} (more: {})",
            page.keys.len(),
            prefix,
            page.next_token.is_some()
        );

        Ok(page)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        if key.is_empty() || key.ends_with('/') {
            return Err(ClientError::InvalidRequest(format!(
                "Not an object key: '{}'",
                key
            )));
        }

        let url = self
            .backend
            .url(std::iter::once("objects").chain(key.split('/')))?;
        let response = self.backend.request(Method::GET, url).send().await?;

        self.backend.handle_bytes(response).await
    }
}
