//! Console output
//!
//! Renders orchestrator progress and final outcomes for a terminal.

use colored::*;
use remora_core::{CancelReason, FetchResult, JobHandle, JobStatus, PollOutcome, PollResult};
use remora_orchestrator::{OrchestratorError, ProgressEvent, ProgressReporter, RetrievalError};
use std::time::Duration;

/// Prints progress events to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn report(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Submitted { handle, job_id } => {
                println!(
                    "{} Submitted job {} as {}",
                    "▸".cyan(),
                    job_id.bold(),
                    handle.as_str().cyan()
                );
            }
            ProgressEvent::StatusChanged { to, elapsed, .. } => {
                println!(
                    "  {} {} {}",
                    format_elapsed(*elapsed).dimmed(),
                    "Status:".bold(),
                    colorize_status(to)
                );
            }
            ProgressEvent::Waiting {
                status,
                elapsed,
                attempt,
                ..
            } => {
                println!(
                    "  {} {}",
                    format_elapsed(*elapsed).dimmed(),
                    format!("still {} (poll #{})", status, attempt).dimmed()
                );
            }
            ProgressEvent::TransientError {
                consecutive,
                message,
                ..
            } => {
                eprintln!(
                    "  {} status query failed ({} in a row): {}",
                    "⚠".yellow(),
                    consecutive,
                    message
                );
            }
            ProgressEvent::Finished { .. } => {}
            ProgressEvent::ArtifactCopied { path, bytes, .. } => {
                println!("  {} {} {}", "↓".green(), path, format!("({} bytes)", bytes).dimmed());
            }
        }
    }
}

/// Colorize job status for display
pub fn colorize_status(status: &JobStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::InProgress => status_str.cyan(),
        JobStatus::Succeeded => status_str.green(),
        JobStatus::Failed | JobStatus::Faulted | JobStatus::TimedOut => status_str.red(),
        JobStatus::Stopped => status_str.dimmed(),
        JobStatus::Unknown => status_str.magenta(),
    }
}

/// Formats a duration as `[MM:SS]`, or `[H:MM:SS]` past an hour
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("[{}:{:02}:{:02}]", h, m, s)
    } else {
        format!("[{:02}:{:02}]", m, s)
    }
}

/// Prints the end of a wait
pub fn print_poll_result(handle: &JobHandle, result: &PollResult) {
    println!();
    match result.outcome {
        PollOutcome::Terminal(JobStatus::Succeeded) => println!(
            "{} Job {} succeeded in {} ({} poll(s))",
            "✓".green(),
            handle.as_str().cyan(),
            format_elapsed(result.elapsed),
            result.attempts
        ),
        PollOutcome::Terminal(JobStatus::Unknown) => println!(
            "{} Could not determine the status of job {} after {} poll(s)",
            "?".magenta(),
            handle.as_str().cyan(),
            result.attempts
        ),
        PollOutcome::Terminal(status) => println!(
            "{} Job {} finished with {}",
            "✗".red(),
            handle.as_str().cyan(),
            colorize_status(&status)
        ),
        PollOutcome::Cancelled(reason) => print_detached(handle, reason),
        PollOutcome::Detached => print_resume_hint(handle),
    }
}

/// Explains that the remote job keeps running and how to resume
pub fn print_detached(handle: &JobHandle, reason: CancelReason) {
    let why = match reason {
        CancelReason::User => "Interrupted",
        CancelReason::Timeout => "Local timeout reached",
    };
    println!(
        "{} {}; job {} keeps running remotely",
        "⏸".yellow(),
        why,
        handle.as_str().cyan()
    );
    print_resume_hint(handle);
}

pub fn print_resume_hint(handle: &JobHandle) {
    println!(
        "  Resume with: {}",
        format!("remora wait {}", handle).bold()
    );
}

pub fn print_fetch_result(result: &FetchResult) {
    if result.is_empty() {
        println!("{}", "No artifacts found.".yellow());
    } else {
        println!(
            "{} Copied {} file(s), {} bytes, into {}",
            "✓".green(),
            result.files.len(),
            result.bytes,
            result.local_dir.display()
        );
    }
}

/// Prints a failure with its cause chain
pub fn print_error(error: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);
    for cause in error.chain().skip(1) {
        eprintln!("  {} {}", "caused by:".dimmed(), cause);
    }

    let copied = error
        .downcast_ref::<RetrievalError>()
        .map(RetrievalError::copied)
        .or_else(|| match error.downcast_ref::<OrchestratorError>() {
            Some(OrchestratorError::Retrieval(e)) => Some(e.copied()),
            _ => None,
        });
    if let Some(copied) = copied.filter(|c| !c.is_empty()) {
        eprintln!("  {} file(s) were copied before the failure:", copied.len());
        for path in copied {
            eprintln!("    {}", path.dimmed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "[00:00]");
        assert_eq!(format_elapsed(Duration::from_secs(95)), "[01:35]");
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "[1:02:05]");
    }
}
