//! Command-line front end for discwatch.
//!
//! Logs go to stderr; `RUST_LOG` overrides the `-v` verbosity.

mod commands;
mod progress;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{report, run, runs};

/// Scrape financial product pages and match disclosure patterns against them
#[derive(Parser)]
#[command(name = "discwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every kept product, store the run and export the report
    Run(run::RunArgs),

    /// Filter a stored run and export it
    Report(report::ReportArgs),

    /// List or purge stored runs
    Runs(runs::RunsArgs),
}

fn log_filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => run::run(args).await,
        Commands::Report(args) => report::run(args).await,
        Commands::Runs(args) => runs::run(args).await,
    }
}
