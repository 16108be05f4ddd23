//! Job command handlers
//!
//! Submitting jobs, with or without waiting for them.

use anyhow::{Context, Result};
use clap::Args;
use remora_core::{JobSpec, WaitMode};
use remora_orchestrator::{JobRunner, OrchestratorError, RunOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::Exit;
use crate::config::GlobalArgs;
use crate::report::{self, ConsoleReporter};

/// What to run and where its artifacts go
#[derive(Args, Debug)]
pub struct JobArgs {
    /// Reference of the source to build (e.g., a repository URL)
    #[arg(short, long)]
    pub target: String,

    /// Storage location receiving the artifacts
    #[arg(short, long)]
    pub destination: String,

    /// Prefix of the generated job id
    #[arg(long, default_value = "remora", conflicts_with = "job_id")]
    pub job_prefix: String,

    /// Explicit job id instead of a generated one
    #[arg(long)]
    pub job_id: Option<String>,

    /// Parameters as key=value pairs (e.g., -p BRANCH=main -p MODE=full)
    #[arg(short, long = "param", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,
}

impl JobArgs {
    fn to_spec(&self) -> Result<JobSpec> {
        let spec = match &self.job_id {
            Some(job_id) => JobSpec::new(&self.target, &self.destination, job_id),
            None => JobSpec::generate(&self.target, &self.destination, &self.job_prefix),
        }
        .context("Invalid job")?;

        Ok(spec.with_parameters(self.params.iter().cloned()))
    }
}

/// `run` flags
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Return right after submission
    #[arg(long)]
    pub detach: bool,

    /// Stop waiting locally after this many seconds
    #[arg(long, conflicts_with = "detach")]
    pub timeout: Option<u64>,

    /// Copy artifacts of a successful job into DIR/<job id>
    #[arg(short, long, value_name = "DIR", conflicts_with = "detach")]
    pub output: Option<PathBuf>,
}

/// Parse a single key=value pair
fn parse_key_val(s: &str) -> Result<(String, String)> {
    let pos = s
        .find('=')
        .ok_or_else(|| anyhow::anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;
    let key = s[..pos].trim();
    if key.is_empty() {
        anyhow::bail!("invalid KEY=value: empty key in `{}`", s);
    }
    Ok((key.to_string(), s[pos + 1..].to_string()))
}

fn runner(global: &GlobalArgs, output: Option<PathBuf>) -> Result<JobRunner> {
    let mut config = global.orchestrator_config()?;
    if let Some(output) = output {
        config = config.with_output_dir(output);
    }

    Ok(
        JobRunner::new(global.execution_client()?, global.object_store()?, config)
            .with_reporter(Arc::new(ConsoleReporter)),
    )
}

/// Submit, wait and fetch
pub async fn run(args: RunArgs, global: &GlobalArgs) -> Result<Exit> {
    let spec = args.job.to_spec()?;
    let runner = runner(global, args.output)?;
    let mode = if args.detach {
        WaitMode::Detached
    } else {
        WaitMode::Blocking {
            timeout: args.timeout.map(Duration::from_secs),
        }
    };

    let (_cancel, signal) = runner.cancel_signal();
    let outcome = runner.run(&spec, mode, &signal).await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(OrchestratorError::Retrieval(e)) => {
            return Err(e).context(format!("Artifacts of job {} were not fully copied", spec.job_id()));
        }
        Err(e) => return Err(e.into()),
    };

    let poll = outcome.poll();
    report::print_poll_result(outcome.handle(), &poll);
    if let RunOutcome::Finished {
        fetch: Some(fetch), ..
    } = &outcome
    {
        report::print_fetch_result(fetch);
    }

    Ok(Exit::from_poll(&poll))
}

/// Submit without waiting
pub async fn submit(args: JobArgs, global: &GlobalArgs) -> Result<Exit> {
    let spec = args.to_spec()?;
    let runner = runner(global, None)?;

    let handle = runner.submit(&spec).await?;
    println!("  Job ID: {}", spec.job_id());
    println!("  Handle: {}", handle);
    report::print_resume_hint(&handle);

    Ok(Exit::Success)
}
