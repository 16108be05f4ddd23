//! Progress reporting
//!
//! The orchestrator emits [`ProgressEvent`]s while it drives a job. How they
//! are rendered is up to the reporter: the CLI prints them, services log
//! them through `tracing`, tests collect them in memory.

use remora_core::{JobHandle, JobStatus, PollResult};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// Something worth telling the caller about
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// The service accepted the job
    Submitted { handle: JobHandle, job_id: String },

    /// A status query returned a different status than the previous one
    StatusChanged {
        handle: JobHandle,
        from: Option<JobStatus>,
        to: JobStatus,
        elapsed: Duration,
    },

    /// A status query returned a non-terminal status
    Waiting {
        handle: JobHandle,
        status: JobStatus,
        elapsed: Duration,
        attempt: u32,
    },

    /// A status query failed and will be retried on the next tick
    TransientError {
        handle: JobHandle,
        attempt: u32,
        consecutive: u32,
        message: String,
    },

    /// The wait ended
    Finished { handle: JobHandle, result: PollResult },

    /// One artifact was written locally
    ArtifactCopied {
        handle: JobHandle,
        path: String,
        bytes: u64,
    },
}

/// Receiver of orchestrator events
pub trait ProgressReporter: Send + Sync {
    /// Handles one event
    ///
    /// Called inline from the polling loop, so implementations should not
    /// block.
    fn report(&self, event: &ProgressEvent);
}

/// Reporter that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: &ProgressEvent) {}
}

/// Reporter that forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Submitted { handle, job_id } => {
                info!("Job {} submitted as {}", job_id, handle);
            }
            ProgressEvent::StatusChanged {
                handle,
                from,
                to,
                elapsed,
            } => match from {
                Some(from) => info!(
                    "Job {} moved {} -> {} after {}s",
                    handle,
                    from,
                    to,
                    elapsed.as_secs()
                ),
                None => info!("Job {} is {} after {}s", handle, to, elapsed.as_secs()),
            },
            ProgressEvent::Waiting {
                handle,
                status,
                elapsed,
                attempt,
            } => {
                debug!(
                    "Job {} still {} ({}s elapsed, poll #{})",
                    handle,
                    status,
                    elapsed.as_secs(),
                    attempt
                );
            }
            ProgressEvent::TransientError {
                handle,
                attempt,
                consecutive,
                message,
            } => {
                debug!(
                    "Status query #{} for job {} failed ({} in a row): {}",
                    attempt, handle, consecutive, message
                );
            }
            ProgressEvent::Finished { handle, result } => {
                info!(
                    "Job {} finished waiting: {:?} after {}s and {} poll(s)",
                    handle,
                    result.outcome,
                    result.elapsed.as_secs(),
                    result.attempts
                );
            }
            ProgressEvent::ArtifactCopied {
                handle,
                path,
                bytes,
            } => {
                debug!("Copied {} ({} bytes) from job {}", path, bytes, handle);
            }
        }
    }
}

/// In-memory reporter
///
/// Collects events behind a mutex so another task can drain them.
#[derive(Clone, Default)]
pub struct InMemoryReporter {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl InMemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every collected event
    pub fn drain(&self) -> Vec<ProgressEvent> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.drain(..).collect()
    }

    /// Returns a copy of the collected events
    pub fn snapshot(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ProgressReporter for InMemoryReporter {
    fn report(&self, event: &ProgressEvent) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(event.clone());
    }
}
