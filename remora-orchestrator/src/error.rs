//! Error types for the orchestrator

use remora_client::ClientError;
use remora_core::{CancelReason, JobHandle, JobStatus};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Failures that end an orchestration run
///
/// Transient status query failures never appear here; the polling loop
/// absorbs them.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The job could not be created; a fresh spec may be submitted
    #[error("Job submission failed: {0}")]
    Submission(#[source] ClientError),

    /// A status query failed in a way retrying will not fix
    #[error("Status query for job {handle} failed: {source}")]
    Describe {
        handle: JobHandle,
        #[source]
        source: ClientError,
    },

    /// The remote service reported an authoritative negative outcome
    #[error("Job {handle} finished with status {status}")]
    TerminalFailure { handle: JobHandle, status: JobStatus },

    /// Too many consecutive status queries failed
    #[error("Status of job {handle} unavailable after {attempts} attempt(s)")]
    StatusUnavailable { handle: JobHandle, attempts: u32 },

    /// The local wait was abandoned; the remote job keeps running
    #[error("Wait for job {handle} cancelled ({reason:?})")]
    Cancelled {
        handle: JobHandle,
        reason: CancelReason,
    },

    /// Artifacts could not be copied
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

/// Failures while mirroring an artifact tree
///
/// Every variant carries the relative paths copied before the failure so a
/// caller can resume a partial download.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Artifact retrieval cancelled after {} file(s)", .copied.len())]
    Cancelled { copied: Vec<String> },

    #[error("Failed to list artifacts under {prefix}: {source}")]
    Listing {
        prefix: String,
        #[source]
        source: ClientError,
    },

    #[error("Listing of {prefix} repeated continuation token '{token}'")]
    IncompleteListing { prefix: String, token: String },

    #[error("Failed to download {key} after {attempts} attempt(s): {source}")]
    Transfer {
        key: String,
        attempts: u32,
        #[source]
        source: ClientError,
        copied: Vec<String>,
    },

    #[error("Refusing to write artifact with unsafe path: {key}")]
    UnsafePath { key: String, copied: Vec<String> },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        copied: Vec<String>,
    },
}

impl RetrievalError {
    /// Relative paths successfully copied before the failure
    pub fn copied(&self) -> &[String] {
        match self {
            Self::Cancelled { copied }
            | Self::Transfer { copied, .. }
            | Self::UnsafePath { copied, .. }
            | Self::Io { copied, .. } => copied,
            Self::Listing { .. } | Self::IncompleteListing { .. } => &[],
        }
    }
}
