//! Fundlock Load Generator
//!
//! Drives the server with concurrent, rate-limited traffic and tracks an
//! expected-balance mirror to compare against the ledger afterwards.

use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod check;
mod driver;
mod scenario;
mod stats;

use driver::{CommitMode, Driver, DriverOptions};
use scenario::Scenario;

/// Fundlock load generator CLI
#[derive(Parser, Debug)]
#[command(name = "loadgen")]
#[command(about = "Fundlock load generator and balance checker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drive the server with a named scenario
    Run {
        /// Scenario to run
        #[arg(short, long, default_value = "deposits-and-withdrawals")]
        scenario: String,

        /// Maximum requests per second (sliding one-second window)
        #[arg(short, long, default_value = "10")]
        rate: u32,

        /// Per-request timeout in milliseconds
        #[arg(long, default_value = "3000")]
        timeout_ms: u64,

        /// When to commit granted authorizations
        #[arg(long, value_enum, default_value = "instant")]
        mode: CommitMode,

        /// Server base URL
        #[arg(long, default_value = "http://localhost:3000")]
        base_url: String,

        /// Directory for the expected-balance file
        #[arg(long, default_value = "tmp")]
        out_dir: String,

        /// Random seed for reproducibility (mixed scenario)
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Compare a persisted expected-balance file against the server
    Check {
        /// Expected-balance file written by a previous run
        file: String,

        /// Server base URL
        #[arg(long, default_value = "http://localhost:3000")]
        base_url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match args.command {
        Command::Run {
            scenario,
            rate,
            timeout_ms,
            mode,
            base_url,
            out_dir,
            seed,
        } => {
            let scenario = Scenario::load(&scenario, seed)?;
            info!(
                scenario = %scenario.name,
                rate,
                ?mode,
                "Starting load run: {}",
                scenario.description
            );

            let driver = Driver::new(DriverOptions {
                rate,
                timeout: Duration::from_millis(timeout_ms),
                mode,
                base_url,
            });
            let report = driver.run(scenario).await;

            report.stats.log_summary();

            let outfile = report.persist_expected_balances(&out_dir).await?;
            info!(
                file = %outfile,
                "When the server has finished processing, verify with `loadgen check {}`",
                outfile
            );
        }
        Command::Check { file, base_url } => {
            check::run_check(&file, &base_url).await?;
        }
    }

    Ok(())
}
