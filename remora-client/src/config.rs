//! Service connection configuration
//!
//! Every endpoint, credential and region the adapters need is carried by an
//! explicit [`ServiceConfig`] passed to their constructors. The environment is
//! read only by [`ServiceConfig::from_env`], which the binary calls once.

use std::time::Duration;

/// Region used when nothing else is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for the execution service and object store
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the execution service (e.g., "http://localhost:8080")
    pub execution_endpoint: String,

    /// Base URL of the object store
    pub storage_endpoint: String,

    /// Region sent with every request
    pub region: String,

    /// Bearer token, if the services require one
    pub auth_token: Option<String>,

    /// Per-request timeout
    pub request_timeout: Duration,
}

impl ServiceConfig {
    /// Creates a configuration with default region and timeout
    pub fn new(execution_endpoint: impl Into<String>, storage_endpoint: impl Into<String>) -> Self {
        Self {
            execution_endpoint: execution_endpoint.into(),
            storage_endpoint: storage_endpoint.into(),
            region: DEFAULT_REGION.to_string(),
            auth_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - REMORA_EXECUTION_URL (required)
    /// - REMORA_STORAGE_URL (optional, defaults to the execution URL)
    /// - REMORA_AUTH_TOKEN (optional)
    /// - REMORA_REQUEST_TIMEOUT (optional, seconds, default: 30)
    /// - REMORA_REGION, AWS_DEFAULT_REGION, AWS_REGION (first one set wins)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let execution_endpoint = lookup("REMORA_EXECUTION_URL")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("REMORA_EXECUTION_URL environment variable not set"))?;

        let storage_endpoint = lookup("REMORA_STORAGE_URL")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| execution_endpoint.clone());

        let request_timeout = lookup("REMORA_REQUEST_TIMEOUT")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Ok(Self {
            execution_endpoint,
            storage_endpoint,
            region: resolve_region(&lookup),
            auth_token: lookup("REMORA_AUTH_TOKEN").filter(|s| !s.is_empty()),
            request_timeout,
        })
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, url) in [
            ("execution_endpoint", &self.execution_endpoint),
            ("storage_endpoint", &self.storage_endpoint),
        ] {
            if url.is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        if self.region.trim().is_empty() {
            anyhow::bail!("region cannot be empty");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        Ok(())
    }
}

/// Resolves the region in priority order, falling back to [`DEFAULT_REGION`]
pub fn resolve_region(lookup: impl Fn(&str) -> Option<String>) -> String {
    ["REMORA_REGION", "AWS_DEFAULT_REGION", "AWS_REGION"]
        .into_iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_region_priority() {
        let lookup = lookup_from(&[("AWS_REGION", "eu-west-1"), ("AWS_DEFAULT_REGION", "us-west-2")]);
        assert_eq!(resolve_region(lookup), "us-west-2");

        let lookup = lookup_from(&[("REMORA_REGION", "ap-south-1"), ("AWS_REGION", "eu-west-1")]);
        assert_eq!(resolve_region(lookup), "ap-south-1");

        let lookup = lookup_from(&[("AWS_DEFAULT_REGION", " ")]);
        assert_eq!(resolve_region(lookup), DEFAULT_REGION);
    }

    #[test]
    fn test_from_lookup_requires_execution_url() {
        let lookup = lookup_from(&[]);
        assert!(ServiceConfig::from_lookup(lookup).is_err());
    }

    #[test]
    fn test_storage_defaults_to_execution_endpoint() {
        let lookup = lookup_from(&[
            ("REMORA_EXECUTION_URL", "http://localhost:8080"),
            ("REMORA_REQUEST_TIMEOUT", "5"),
        ]);
        let config = ServiceConfig::from_lookup(lookup).unwrap();

        assert_eq!(config.storage_endpoint, "http://localhost:8080");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(config.auth_token.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ServiceConfig::new("http://localhost:8080", "http://localhost:9000");
        assert!(config.validate().is_ok());

        config.storage_endpoint = "s3://bucket".to_string();
        assert!(config.validate().is_err());

        config.storage_endpoint = "http://localhost:9000".to_string();
        config.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
