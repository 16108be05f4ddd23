//! Handlers for jobs that were already submitted

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use remora_client::ExecutionClient;
use remora_core::domain::job::artifact_prefix;
use remora_core::JobHandle;
use remora_orchestrator::{ArtifactRetriever, PollingOrchestrator, signal_pair};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::Exit;
use crate::config::GlobalArgs;
use crate::report::{self, ConsoleReporter};

/// `wait` flags
#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Handle printed by `submit` or `run`
    pub handle: String,

    /// Stop waiting locally after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Storage location the job writes to
    #[arg(short, long, requires = "job_id")]
    pub destination: Option<String>,

    /// Id the job was submitted with
    #[arg(long, requires = "destination")]
    pub job_id: Option<String>,

    /// Copy artifacts of a successful job into DIR/<job id>
    #[arg(short, long, value_name = "DIR", requires_all = ["destination", "job_id"])]
    pub output: Option<PathBuf>,
}

/// `fetch` flags
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Storage location the job wrote to
    #[arg(short, long)]
    pub destination: String,

    /// Id the job was submitted with
    #[arg(long)]
    pub job_id: String,

    /// Artifacts land in DIR/<job id>
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,
}

/// Show the current status of a job
pub async fn status(handle: &str, global: &GlobalArgs) -> Result<Exit> {
    let client = global.execution_client()?;
    let handle = JobHandle::new(handle);

    let status = client
        .describe(&handle)
        .await
        .with_context(|| format!("Failed to query job {}", handle))?;

    println!("{}", "Job Status:".bold());
    println!("  Handle: {}", handle.as_str().cyan());
    println!("  Status: {}", report::colorize_status(&status));
    if !status.is_terminal() {
        report::print_resume_hint(&handle);
    }

    Ok(Exit::Success)
}

/// Resume waiting for a job
pub async fn wait(args: WaitArgs, global: &GlobalArgs) -> Result<Exit> {
    let config = global.orchestrator_config()?;
    let handle = JobHandle::new(args.handle);
    let poller = PollingOrchestrator::new(global.execution_client()?, config.clone())
        .with_reporter(Arc::new(ConsoleReporter));

    let (_cancel, signal) = signal_pair(config.cancel_on_signal);

    println!("{} Waiting for job {}", "▸".cyan(), handle.as_str().cyan());
    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .or(config.max_elapsed_timeout);
    let result = poller
        .await_job_with_timeout(&handle, timeout, &signal)
        .await?;
    report::print_poll_result(&handle, &result);

    if let (true, Some(output), Some(destination), Some(job_id)) = (
        result.is_success(),
        &args.output,
        &args.destination,
        &args.job_id,
    ) {
        let retriever = ArtifactRetriever::new(global.object_store()?, &config)
            .with_reporter(Arc::new(ConsoleReporter));
        let local_dir = output.join(job_id);
        let fetched = retriever
            .fetch(&handle, &artifact_prefix(destination, job_id), &local_dir, &signal)
            .await
            .with_context(|| format!("Artifacts of job {} were not fully copied", job_id))?;
        report::print_fetch_result(&fetched);
    }

    Ok(Exit::from_poll(&result))
}

/// Copy the artifacts of a job without querying its status
pub async fn fetch(args: FetchArgs, global: &GlobalArgs) -> Result<Exit> {
    let config = global.orchestrator_config()?;
    let retriever = ArtifactRetriever::new(global.object_store()?, &config)
        .with_reporter(Arc::new(ConsoleReporter));

    let (_cancel, signal) = signal_pair(config.cancel_on_signal);

    let prefix = artifact_prefix(&args.destination, &args.job_id);
    let local_dir = output_dir(&args.output, &args.job_id);
    println!("{} Fetching {} into {}", "▸".cyan(), prefix.bold(), local_dir.display());

    let fetched = retriever
        .fetch(&JobHandle::new(args.job_id.as_str()), &prefix, &local_dir, &signal)
        .await
        .with_context(|| format!("Artifacts of job {} were not fully copied", args.job_id))?;
    report::print_fetch_result(&fetched);

    Ok(Exit::Success)
}

fn output_dir(output: &Path, job_id: &str) -> PathBuf {
    output.join(job_id)
}
