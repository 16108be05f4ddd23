//! Orchestration outcome types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::status::JobStatus;

/// Why a local wait stopped before the remote job finished
///
/// The remote job keeps running in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// The caller cancelled (e.g. Ctrl-C)
    User,
    /// The local maximum elapsed time was reached
    Timeout,
}

/// How a run ended from the orchestrator's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollOutcome {
    /// A terminal status was observed, or `Unknown` after too many
    /// consecutive transient failures
    Terminal(JobStatus),
    /// The local wait was abandoned
    Cancelled(CancelReason),
    /// The job was submitted without waiting
    Detached,
}

/// Result of driving one job handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResult {
    pub outcome: PollOutcome,
    pub elapsed: Duration,
    pub attempts: u32,
}

impl PollResult {
    /// The final remote status, if one was reached
    pub fn status(&self) -> Option<JobStatus> {
        match self.outcome {
            PollOutcome::Terminal(status) => Some(status),
            PollOutcome::Cancelled(_) | PollOutcome::Detached => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == Some(JobStatus::Succeeded)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, PollOutcome::Cancelled(_))
    }
}

/// Whether the caller waits for the job after submitting it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Submit and return the handle immediately
    Detached,
    /// Poll until a terminal state; `timeout` overrides the configured
    /// maximum elapsed time when set
    Blocking { timeout: Option<Duration> },
}

impl Default for WaitMode {
    fn default() -> Self {
        WaitMode::Blocking { timeout: None }
    }
}

/// Files copied from a job's artifact tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    /// Directory the tree was mirrored into
    pub local_dir: PathBuf,
    /// Relative paths, in copy order
    pub files: Vec<String>,
    /// Total bytes written
    pub bytes: u64,
}

impl FetchResult {
    pub fn new(local_dir: impl Into<PathBuf>) -> Self {
        Self {
            local_dir: local_dir.into(),
            files: Vec::new(),
            bytes: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
