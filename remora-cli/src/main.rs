//! Remora CLI
//!
//! Submits jobs to a remote execution service, follows them to a terminal
//! state and copies their artifacts locally.

mod commands;
mod config;
mod report;

use clap::Parser;
use commands::{Commands, Exit, handle_command};
use config::GlobalArgs;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "remora")]
#[command(about = "Run jobs on a remote execution service and fetch their artifacts", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    /// Log more (-v for info, -vv for debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match handle_command(cli.command, &cli.global).await {
        Ok(exit) => exit.into(),
        Err(e) => {
            let exit = Exit::from_error(&e);
            report::print_error(&e);
            exit.into()
        }
    }
}

/// Installs a stderr subscriber so progress on stdout stays readable
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "remora=info,remora_orchestrator=info,remora_client=info",
        _ => "remora=debug,remora_orchestrator=debug,remora_client=debug",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
