//! Job poller
//!
//! Drives one job handle from submission to a terminal state:
//! `Submitted -> Polling -> {Succeeded | Failed | Faulted | Stopped | TimedOut}`.
//! `Polling` is the only repeating state. The first terminal observation
//! ends the loop and polling is never re-entered.

use rand::Rng;
use remora_client::ExecutionClient;
use remora_core::{CancelReason, JobHandle, JobStatus, PollOutcome, PollResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{info, warn};

use crate::cancel::CancelSignal;
use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};
use crate::service::{ProgressEvent, ProgressReporter, TracingReporter};

/// Polls the execution service until a job reaches a terminal state
///
/// Holds only shared immutable state, so one instance can await any number
/// of jobs concurrently.
#[derive(Clone)]
pub struct PollingOrchestrator {
    client: Arc<dyn ExecutionClient>,
    config: OrchestratorConfig,
    reporter: Arc<dyn ProgressReporter>,
}

/// Outcome of racing an operation against cancellation and the deadline
enum Race<T> {
    Ready(T),
    Interrupted(CancelReason),
}

impl PollingOrchestrator {
    /// Creates a poller that reports through `tracing`
    pub fn new(client: Arc<dyn ExecutionClient>, config: OrchestratorConfig) -> Self {
        Self {
            client,
            config,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Replaces the progress reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Waits for a job using the configured maximum elapsed time
    pub async fn await_job(&self, handle: &JobHandle, cancel: &CancelSignal) -> Result<PollResult> {
        self.await_job_with_timeout(handle, self.config.max_elapsed_timeout, cancel)
            .await
    }

    /// Waits for a job with an explicit local timeout
    ///
    /// Cancellation and the timeout only stop the local wait; the remote job
    /// is left running. A non-transient status query failure is returned as
    /// [`OrchestratorError::Describe`]; transient ones are absorbed.
    pub async fn await_job_with_timeout(
        &self,
        handle: &JobHandle,
        timeout: Option<Duration>,
        cancel: &CancelSignal,
    ) -> Result<PollResult> {
        let start = Instant::now();
        // a deadline beyond the clock's range is no deadline at all
        let deadline = timeout.and_then(|t| start.checked_add(t));
        let mut attempts: u32 = 0;
        let mut consecutive_failures: u32 = 0;
        let mut last_status: Option<JobStatus> = None;

        info!(
            "Waiting for job {} (interval: {:?}, timeout: {:?})",
            handle, self.config.poll_interval, timeout
        );

        loop {
            if let Race::Interrupted(reason) =
                Self::race(time::sleep(self.next_delay()), deadline, cancel).await
            {
                return Ok(self.finish(handle, PollOutcome::Cancelled(reason), start, attempts));
            }

            attempts += 1;
            let described = match Self::race(self.client.describe(handle), deadline, cancel).await {
                Race::Ready(described) => described,
                Race::Interrupted(reason) => {
                    return Ok(self.finish(
                        handle,
                        PollOutcome::Cancelled(reason),
                        start,
                        attempts,
                    ));
                }
            };

            let status = match described {
                Ok(status) => status,
                Err(e) if e.is_transient() => {
                    consecutive_failures += 1;
                    if self.transient_failure(handle, attempts, consecutive_failures, e.to_string()) {
                        return Ok(self.finish(
                            handle,
                            PollOutcome::Terminal(JobStatus::Unknown),
                            start,
                            attempts,
                        ));
                    }
                    continue;
                }
                Err(e) => {
                    warn!("Status query for job {} failed permanently: {}", handle, e);
                    return Err(OrchestratorError::Describe {
                        handle: handle.clone(),
                        source: e,
                    });
                }
            };

            let elapsed = start.elapsed();
            match status {
                JobStatus::Unknown => {
                    consecutive_failures += 1;
                    let message = "service reported an unrecognized status".to_string();
                    if self.transient_failure(handle, attempts, consecutive_failures, message) {
                        return Ok(self.finish(
                            handle,
                            PollOutcome::Terminal(JobStatus::Unknown),
                            start,
                            attempts,
                        ));
                    }
                }
                JobStatus::Pending | JobStatus::InProgress => {
                    consecutive_failures = 0;
                    self.observe(handle, &mut last_status, status, elapsed);
                    self.reporter.report(&ProgressEvent::Waiting {
                        handle: handle.clone(),
                        status,
                        elapsed,
                        attempt: attempts,
                    });
                }
                JobStatus::Succeeded
                | JobStatus::Failed
                | JobStatus::Faulted
                | JobStatus::Stopped
                | JobStatus::TimedOut => {
                    self.observe(handle, &mut last_status, status, elapsed);
                    return Ok(self.finish(handle, PollOutcome::Terminal(status), start, attempts));
                }
            }
        }
    }

    /// Races `fut` against cancellation and the optional deadline
    ///
    /// Cancellation wins ties, then the deadline, so an expired deadline is
    /// never followed by another status query.
    async fn race<F: Future>(
        fut: F,
        deadline: Option<Instant>,
        cancel: &CancelSignal,
    ) -> Race<F::Output> {
        let expired = async {
            match deadline {
                Some(deadline) => time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Race::Interrupted(CancelReason::User),
            _ = expired => Race::Interrupted(CancelReason::Timeout),
            out = fut => Race::Ready(out),
        }
    }

    /// Interval plus a random share of the configured jitter
    fn next_delay(&self) -> Duration {
        let jitter_ms = self.config.poll_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.config.poll_interval;
        }

        self.config.poll_interval + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }

    /// Records a status observation, reporting it when it changed
    fn observe(
        &self,
        handle: &JobHandle,
        last_status: &mut Option<JobStatus>,
        status: JobStatus,
        elapsed: Duration,
    ) {
        if *last_status == Some(status) {
            return;
        }

        self.reporter.report(&ProgressEvent::StatusChanged {
            handle: handle.clone(),
            from: *last_status,
            to: status,
            elapsed,
        });
        *last_status = Some(status);
    }

    /// Reports a failed status query
    ///
    /// Returns `true` once the consecutive failure threshold is exceeded.
    fn transient_failure(
        &self,
        handle: &JobHandle,
        attempt: u32,
        consecutive: u32,
        message: String,
    ) -> bool {
        warn!(
            "Transient status failure for job {} ({} consecutive): {}",
            handle, consecutive, message
        );

        self.reporter.report(&ProgressEvent::TransientError {
            handle: handle.clone(),
            attempt,
            consecutive,
            message,
        });

        match self.config.max_consecutive_transient_failures {
            Some(max) if consecutive > max => {
                warn!(
                    "Giving up on status of job {} after {} consecutive failures",
                    handle, consecutive
                );
                true
            }
            _ => false,
        }
    }

    fn finish(
        &self,
        handle: &JobHandle,
        outcome: PollOutcome,
        start: Instant,
        attempts: u32,
    ) -> PollResult {
        let result = PollResult {
            outcome,
            elapsed: start.elapsed(),
            attempts,
        };

        match outcome {
            PollOutcome::Cancelled(reason) => info!(
                "Stopped waiting for job {} ({:?}); the remote job keeps running",
                handle, reason
            ),
            _ => info!(
                "Job {} ended with {:?} after {} poll(s)",
                handle, outcome, attempts
            ),
        }

        self.reporter.report(&ProgressEvent::Finished {
            handle: handle.clone(),
            result: result.clone(),
        });

        result
    }
}

/// Converts a [`PollResult`] into the error taxonomy
pub trait PollResultExt {
    /// `Ok` for success and detached runs, `Err` for everything else
    fn into_result(self, handle: &JobHandle) -> Result<PollResult>;
}

impl PollResultExt for PollResult {
    fn into_result(self, handle: &JobHandle) -> Result<PollResult> {
        match self.outcome {
            PollOutcome::Terminal(JobStatus::Succeeded) | PollOutcome::Detached => Ok(self),
            PollOutcome::Terminal(JobStatus::Unknown) => Err(OrchestratorError::StatusUnavailable {
                handle: handle.clone(),
                attempts: self.attempts,
            }),
            PollOutcome::Terminal(status) => Err(OrchestratorError::TerminalFailure {
                handle: handle.clone(),
                status,
            }),
            PollOutcome::Cancelled(reason) => Err(OrchestratorError::Cancelled {
                handle: handle.clone(),
                reason,
            }),
        }
    }
}
