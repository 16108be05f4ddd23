//! Configuration module
//!
//! Global connection flags and the translation of flags plus environment
//! into the library configuration structs.

use anyhow::{Context, Result};
use clap::Args;
use remora_client::config::resolve_region;
use remora_client::{
    ExecutionClient, HttpExecutionClient, HttpObjectStore, LocalObjectStore, ObjectStore,
    ServiceConfig,
};
use remora_orchestrator::OrchestratorConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Connection flags shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Execution service URL
    #[arg(long, env = "REMORA_EXECUTION_URL", global = true)]
    pub execution_url: Option<String>,

    /// Object store URL (defaults to the execution service URL)
    #[arg(long, env = "REMORA_STORAGE_URL", global = true)]
    pub storage_url: Option<String>,

    /// Read artifacts from a mounted directory instead of the object store
    #[arg(long, env = "REMORA_STORAGE_DIR", global = true, conflicts_with = "storage_url")]
    pub storage_dir: Option<PathBuf>,

    /// Region sent with every request
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Bearer token for the services
    #[arg(long, env = "REMORA_AUTH_TOKEN", global = true, hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Seconds between status queries
    #[arg(long, global = true)]
    pub poll_interval: Option<u64>,
}

impl GlobalArgs {
    /// Builds the service configuration from flags, then the environment
    pub fn service_config(&self) -> Result<ServiceConfig> {
        let execution_url = self.execution_url.clone().context(
            "No execution service URL, use --execution-url or set REMORA_EXECUTION_URL",
        )?;
        let storage_url = self
            .storage_url
            .clone()
            .unwrap_or_else(|| execution_url.clone());
        let region = self
            .region
            .clone()
            .unwrap_or_else(|| resolve_region(|key| std::env::var(key).ok()));

        let mut config = ServiceConfig::new(execution_url, storage_url).with_region(region);
        if let Some(token) = &self.auth_token {
            config = config.with_auth_token(token.clone());
        }
        if let Some(secs) = std::env::var("REMORA_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        config.validate().context("Invalid service configuration")?;
        Ok(config)
    }

    /// Builds the orchestrator configuration from the environment and flags
    pub fn orchestrator_config(&self) -> Result<OrchestratorConfig> {
        self.orchestrator_config_from(|key| std::env::var(key).ok())
    }

    fn orchestrator_config_from(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<OrchestratorConfig> {
        let mut config = OrchestratorConfig::from_lookup(lookup)
            .context("Failed to load orchestrator configuration")?;
        if let Some(secs) = self.poll_interval {
            config = config.with_poll_interval(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn execution_client(&self) -> Result<Arc<dyn ExecutionClient>> {
        let config = self.service_config()?;
        let client = HttpExecutionClient::new(&config)
            .context("Failed to create execution service client")?;
        Ok(Arc::new(client))
    }

    /// Object store for artifacts: the mounted directory when given,
    /// otherwise the HTTP store
    pub fn object_store(&self) -> Result<Arc<dyn ObjectStore>> {
        if let Some(dir) = &self.storage_dir {
            return Ok(Arc::new(LocalObjectStore::new(dir)));
        }

        let config = self.service_config()?;
        let store = HttpObjectStore::new(&config).context("Failed to create object store client")?;
        Ok(Arc::new(store))
    }
}
