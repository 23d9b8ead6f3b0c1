use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use ticket_load_test::cli::{Cli, Scenario};
use ticket_load_test::config::RunConfig;
use ticket_load_test::Harness;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!("Ticketing Load Test Starting...");
    tracing::info!("Host: {}", cli.host);
    match &cli.scenario {
        Scenario::Entry => tracing::info!("Running Entry scenario"),
        Scenario::Queue => tracing::info!("Running Queue Enter scenario"),
        Scenario::Journey(args) => {
            tracing::info!("Running Journey scenario");
            tracing::info!("  Max Polls: {}", args.max_polls);
            tracing::info!(
                "  Poll Delay: {}-{}s",
                args.poll_delay_min,
                args.poll_delay_max
            );
        }
    }

    let harness = Harness::new(RunConfig::try_from(&cli)?)?;

    // Ctrl+C stops the run early; the final report is still printed
    let cancel = harness.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl+C received, stopping users");
            cancel.cancel();
        }
    });

    let snapshot = harness.run().await?;

    tracing::info!("Load test complete");

    if snapshot.passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
