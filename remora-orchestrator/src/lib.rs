//! Remora Orchestrator
//!
//! Drives jobs on a remote execution service from submission to a terminal
//! state and mirrors the artifacts of successful jobs locally.
//!
//! Architecture:
//! - Configuration: polling cadence, local timeout and retry tunables
//! - Scheduler: the polling loop ([`PollingOrchestrator`])
//! - Services: progress reporting and artifact retrieval
//! - Runner: submit, wait and fetch composed into one call ([`JobRunner`])
//!
//! Cancellation only detaches the local wait. The remote job is never
//! stopped or modified.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use remora_client::{HttpExecutionClient, HttpObjectStore, ServiceConfig};
//! use remora_core::{JobSpec, WaitMode};
//! use remora_orchestrator::{JobRunner, OrchestratorConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = ServiceConfig::from_env()?;
//!     let runner = JobRunner::new(
//!         Arc::new(HttpExecutionClient::new(&service)?),
//!         Arc::new(HttpObjectStore::new(&service)?),
//!         OrchestratorConfig::from_env()?.with_output_dir("./artifacts"),
//!     );
//!
//!     let spec = JobSpec::generate("https://github.com/org/repo", "docs-output", "doc-gen")?;
//!     let (_handle, cancel) = runner.cancel_signal();
//!     let outcome = runner.run(&spec, WaitMode::default(), &cancel).await?;
//!
//!     println!("{:?}", outcome.poll().outcome);
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod runner;
pub mod scheduler;
pub mod service;

pub use cancel::{CancelHandle, CancelSignal, cancel_pair, signal_pair};
pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, Result, RetrievalError};
pub use runner::{JobRunner, RunOutcome};
pub use scheduler::{PollResultExt, PollingOrchestrator};
pub use service::{
    ArtifactRetriever, InMemoryReporter, NoopReporter, ProgressEvent, ProgressReporter,
    TracingReporter,
};
