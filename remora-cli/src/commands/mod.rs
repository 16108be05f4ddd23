//! Commands module
//!
//! Defines all CLI commands, their handlers and the mapping of outcomes to
//! process exit codes.

mod job;
mod wait;

pub use job::{JobArgs, RunArgs};
pub use wait::{FetchArgs, WaitArgs};

use anyhow::Result;
use clap::Subcommand;
use remora_core::{JobStatus, PollOutcome, PollResult};
use remora_orchestrator::{OrchestratorError, RetrievalError};
use std::process::ExitCode;

use crate::config::GlobalArgs;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a job, wait for it and fetch its artifacts
    Run(RunArgs),
    /// Submit a job and return immediately
    Submit(JobArgs),
    /// Show the current status of a job
    Status {
        /// Handle printed by `submit` or `run`
        handle: String,
    },
    /// Wait for a submitted job, optionally fetching its artifacts
    Wait(WaitArgs),
    /// Copy the artifacts of a finished job
    Fetch(FetchArgs),
}

/// Process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success,
    /// Configuration, transport or local I/O problem
    Error,
    /// The job ended in a failure status
    JobFailed,
    /// The local wait was interrupted or timed out
    Cancelled,
}

impl Exit {
    pub fn code(self) -> u8 {
        match self {
            Exit::Success => 0,
            Exit::Error => 1,
            Exit::JobFailed => 2,
            Exit::Cancelled => 3,
        }
    }

    /// Exit status for a finished wait
    pub fn from_poll(result: &PollResult) -> Self {
        match result.outcome {
            PollOutcome::Terminal(JobStatus::Succeeded) | PollOutcome::Detached => Exit::Success,
            PollOutcome::Terminal(JobStatus::Unknown) => Exit::Error,
            PollOutcome::Terminal(_) => Exit::JobFailed,
            PollOutcome::Cancelled(_) => Exit::Cancelled,
        }
    }

    /// Exit status for a failed command
    pub fn from_error(error: &anyhow::Error) -> Self {
        if let Some(RetrievalError::Cancelled { .. }) = error.downcast_ref::<RetrievalError>() {
            return Exit::Cancelled;
        }

        match error.downcast_ref::<OrchestratorError>() {
            Some(OrchestratorError::TerminalFailure { .. }) => Exit::JobFailed,
            Some(OrchestratorError::Cancelled { .. })
            | Some(OrchestratorError::Retrieval(RetrievalError::Cancelled { .. })) => {
                Exit::Cancelled
            }
            _ => Exit::Error,
        }
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit.code())
    }
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, global: &GlobalArgs) -> Result<Exit> {
    match command {
        Commands::Run(args) => job::run(args, global).await,
        Commands::Submit(args) => job::submit(args, global).await,
        Commands::Status { handle } => wait::status(&handle, global).await,
        Commands::Wait(args) => wait::wait(args, global).await,
        Commands::Fetch(args) => wait::fetch(args, global).await,
    }
}
