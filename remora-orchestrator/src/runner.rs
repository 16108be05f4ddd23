//! Job runner
//!
//! Composes the full control flow for one job: submit, optionally wait for a
//! terminal status, and mirror the artifact tree of a successful job.

use remora_client::{ExecutionClient, ObjectStore};
use remora_core::{FetchResult, JobHandle, JobSpec, PollOutcome, PollResult, WaitMode};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::cancel::{CancelHandle, CancelSignal, signal_pair};
use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};
use crate::scheduler::PollingOrchestrator;
use crate::service::{ArtifactRetriever, ProgressEvent, ProgressReporter, TracingReporter};

/// How [`JobRunner::run`] ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Submitted without waiting
    Detached { handle: JobHandle },

    /// The wait ended; `fetch` is set when artifacts were copied
    Finished {
        handle: JobHandle,
        poll: PollResult,
        fetch: Option<FetchResult>,
    },
}

impl RunOutcome {
    pub fn handle(&self) -> &JobHandle {
        match self {
            Self::Detached { handle } | Self::Finished { handle, .. } => handle,
        }
    }

    /// The poll result; detached runs report [`PollOutcome::Detached`]
    pub fn poll(&self) -> PollResult {
        match self {
            Self::Detached { .. } => PollResult {
                outcome: PollOutcome::Detached,
                elapsed: Duration::ZERO,
                attempts: 0,
            },
            Self::Finished { poll, .. } => poll.clone(),
        }
    }
}

/// Submits jobs and follows them to completion
#[derive(Clone)]
pub struct JobRunner {
    client: Arc<dyn ExecutionClient>,
    poller: PollingOrchestrator,
    retriever: ArtifactRetriever,
    config: OrchestratorConfig,
    reporter: Arc<dyn ProgressReporter>,
}

impl JobRunner {
    pub fn new(
        client: Arc<dyn ExecutionClient>,
        store: Arc<dyn ObjectStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            poller: PollingOrchestrator::new(client.clone(), config.clone()),
            retriever: ArtifactRetriever::new(store, &config),
            client,
            config,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Routes progress of submission, polling and retrieval to `reporter`
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.poller = self.poller.with_reporter(reporter.clone());
        self.retriever = self.retriever.with_reporter(reporter.clone());
        self.reporter = reporter;
        self
    }

    pub fn poller(&self) -> &PollingOrchestrator {
        &self.poller
    }

    pub fn retriever(&self) -> &ArtifactRetriever {
        &self.retriever
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Creates a cancellation pair, wired to Ctrl-C when configured
    ///
    /// Must be called inside a tokio runtime.
    pub fn cancel_signal(&self) -> (CancelHandle, CancelSignal) {
        signal_pair(self.config.cancel_on_signal)
    }

    /// Submits a job to the execution service
    ///
    /// Submission is not retried; on failure nothing was created remotely
    /// and the same job may be submitted again.
    pub async fn submit(&self, spec: &JobSpec) -> Result<JobHandle> {
        info!(
            "Submitting job {} for {}",
            spec.job_id(),
            spec.target_reference()
        );

        let handle = self.client.submit(spec).await.map_err(|e| {
            error!("Submission of job {} failed: {}", spec.job_id(), e);
            OrchestratorError::Submission(e)
        })?;

        self.reporter.report(&ProgressEvent::Submitted {
            handle: handle.clone(),
            job_id: spec.job_id().to_string(),
        });
        Ok(handle)
    }

    /// Runs a job end to end
    ///
    /// In blocking mode the artifact tree is copied into
    /// `output_dir/<job id>` when the job succeeded and an output directory
    /// is configured. Non-success outcomes are returned, not raised; use
    /// [`crate::PollResultExt::into_result`] to turn them into errors.
    pub async fn run(
        &self,
        spec: &JobSpec,
        mode: WaitMode,
        cancel: &CancelSignal,
    ) -> Result<RunOutcome> {
        let handle = self.submit(spec).await?;

        let timeout = match mode {
            WaitMode::Detached => {
                info!("Detached from job {}", handle);
                return Ok(RunOutcome::Detached { handle });
            }
            WaitMode::Blocking { timeout } => timeout.or(self.config.max_elapsed_timeout),
        };

        let poll = self
            .poller
            .await_job_with_timeout(&handle, timeout, cancel)
            .await?;

        let fetch = match (&self.config.output_dir, poll.is_success()) {
            (Some(output_dir), true) => {
                let local_dir = output_dir.join(spec.job_id());
                Some(self.fetch(&handle, spec, &local_dir, cancel).await?)
            }
            _ => None,
        };

        Ok(RunOutcome::Finished {
            handle,
            poll,
            fetch,
        })
    }

    /// Copies the artifact tree of `spec` into `local_dir`
    pub async fn fetch(
        &self,
        handle: &JobHandle,
        spec: &JobSpec,
        local_dir: &Path,
        cancel: &CancelSignal,
    ) -> Result<FetchResult> {
        let result = self
            .retriever
            .fetch(handle, &spec.artifact_prefix(), local_dir, cancel)
            .await?;
        Ok(result)
    }
}
