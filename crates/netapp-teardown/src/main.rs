//! netapp-teardown: delete every Azure NetApp Files account in the current
//! subscription, children first, then the resource groups that held them.

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use netapp_teardown::azure::AzureContext;
use netapp_teardown::config::TeardownConfig;
use netapp_teardown::logging;
use netapp_teardown::prompt::TerminalPrompt;
use netapp_teardown::teardown::{FleetOrchestrator, FleetOutcome};
use netapp_teardown_common::defaults::{CA_BUNDLE_ENV_VAR, DEFAULT_MAX_WORKERS};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "netapp-teardown")]
#[command(about = "Delete all Azure NetApp Files accounts and their nested resources")]
#[command(version)]
struct Args {
    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// Enable debug logging, including HTTP request tracing
    #[arg(short, long)]
    verbose: bool,

    /// Number of accounts to delete in parallel
    #[arg(short, long, default_value_t = DEFAULT_MAX_WORKERS)]
    workers: usize,
}

impl From<&Args> for TeardownConfig {
    fn from(args: &Args) -> Self {
        Self {
            skip_confirmation: args.yes,
            max_workers: args.workers,
            verbose: args.verbose,
            ..Default::default()
        }
    }
}

fn main() {
    let args = Args::parse();

    // SAFETY: no other threads exist yet; the runtime is built below.
    unsafe { std::env::remove_var(CA_BUNDLE_ENV_VAR) };

    logging::init(args.verbose);

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
        .and_then(|runtime| runtime.block_on(run(TeardownConfig::from(&args))));

    if let Err(e) = result {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n{} {e}", style("Error:").red().bold());

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  {} {cause}", style("Caused by:").yellow());
        source = cause.source();
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n{}",
            style("Set RUST_BACKTRACE=1 for a detailed backtrace").dim()
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n{}\n{backtrace}", style("Backtrace:").dim());
        }
    }
}

async fn run(config: TeardownConfig) -> Result<()> {
    config.validate()?;

    let azure = AzureContext::new().await?;
    info!(subscription_id = %azure.subscription(), "Connected to Azure");

    let orchestrator = FleetOrchestrator::new(
        Arc::new(azure.netapp_client()),
        Arc::new(azure.resource_group_client()),
        Arc::new(TerminalPrompt),
        config.retry,
    );

    let report = orchestrator
        .run(config.skip_confirmation, config.max_workers)
        .await?;

    match report.outcome {
        FleetOutcome::NothingToDelete => info!("Nothing to delete"),
        FleetOutcome::Cancelled => info!("No resources were deleted"),
        FleetOutcome::Completed => info!(
            accounts = report.succeeded.len(),
            "Teardown complete"
        ),
    }

    Ok(())
}
