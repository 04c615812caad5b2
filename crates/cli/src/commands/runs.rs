//! `discwatch runs`: inspect and prune the run store.

use anyhow::Context;
use clap::{Args, Subcommand};

use discwatch_core::{AppConfig, CacheDb};

/// Arguments for the runs command.
#[derive(Debug, Args)]
pub struct RunsArgs {
    #[command(subcommand)]
    pub command: RunsCommand,
}

#[derive(Debug, Subcommand)]
pub enum RunsCommand {
    /// List stored runs, newest first
    List {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Delete runs by age or keep only the most recently used
    Purge {
        /// Delete runs created more than this many days ago
        #[arg(long)]
        older_than_days: Option<u32>,

        /// Keep at most this many runs
        #[arg(long)]
        max_entries: Option<usize>,
    },
}

pub async fn run(args: RunsArgs) -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening run store at {}", config.db_path.display()))?;

    match args.command {
        RunsCommand::List { limit } => {
            let runs = db.list_runs(limit).await?;
            if runs.is_empty() {
                println!("no stored runs");
            }
            for run in runs {
                println!(
                    "{}  {}  {:>4} products  {:>6} rows",
                    run.id, run.created_at, run.product_count, run.row_count
                );
            }
        }
        RunsCommand::Purge { older_than_days, max_entries } => {
            if older_than_days.is_none() && max_entries.is_none() {
                anyhow::bail!("pass --older-than-days, --max-entries, or both");
            }

            let mut deleted = 0;
            if let Some(days) = older_than_days {
                deleted += db.purge_runs_older_than(days).await?;
            }
            if let Some(max) = max_entries {
                deleted += db.purge_lru_runs(max).await?;
            }
            println!("deleted {deleted} runs");
        }
    }

    Ok(())
}
