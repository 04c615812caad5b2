//! `discwatch run`: scrape, match, store and export in one pass.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::Args;

use discwatch_client::{
    GeminiClient, MonitorInputs, MonitorOptions, RetryPolicy, TextGenerator, WebPageFetcher, run_monitor,
};
use discwatch_core::{AggregateOptions, AppConfig, CacheDb, ExportFormat, Pacing, RunRecord, report};

use super::FormatArg;
use crate::progress::BarProgress;

/// Arguments for the run command.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Product table (CSV)
    #[arg(long, env = "DISCWATCH_PRODUCTS")]
    pub products: PathBuf,

    /// Pattern table (CSV)
    #[arg(long, env = "DISCWATCH_PATTERNS")]
    pub patterns: PathBuf,

    /// Output directory (defaults to DISCWATCH_EXPORT_DIR)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Report file format
    #[arg(short, long, value_enum, default_value = "csv")]
    pub format: FormatArg,

    /// Skip the randomized delay between product fetches
    #[arg(long)]
    pub no_delay: bool,

    /// Summarize each product page with Gemini
    #[arg(long)]
    pub summarize: bool,

    /// Drop products whose page links no PDF document
    #[arg(long)]
    pub require_pdf: bool,

    /// Render products marked `browser` with headless Chrome
    #[arg(long)]
    pub render: bool,

    /// Do not keep the run in the run store
    #[arg(long)]
    pub no_store: bool,
}

impl RunArgs {
    /// Layer the flags over the loaded configuration.
    fn apply(&self, config: &mut AppConfig) {
        config.render_enabled |= self.render;
        config.require_pdf |= self.require_pdf;
    }

    fn options(&self, config: &AppConfig) -> MonitorOptions {
        let mut aggregate = AggregateOptions::from_config(config);
        if self.no_delay {
            aggregate.pacing = Pacing::none();
        }
        MonitorOptions { aggregate, retry: RetryPolicy::from_config(config) }
    }
}

/// Where a finished run ended up.
#[derive(Debug)]
struct Published {
    path: PathBuf,
    stored: bool,
}

/// Export the report, then keep the run in `db` when a store is open.
///
/// A store failure is logged and leaves the exported report in place.
async fn publish(
    run: &RunRecord, db: Option<&CacheDb>, dir: &Path, date: NaiveDate, format: ExportFormat,
) -> anyhow::Result<Published> {
    let path = report::export(&run.rows, dir, date, format)
        .with_context(|| format!("exporting run {} to {}", run.id, dir.display()))?;
    tracing::info!(run_id = %run.id, path = %path.display(), rows = run.rows.len(), "report exported");

    let stored = match db {
        Some(db) => match db.insert_run(run).await {
            Ok(()) => {
                tracing::info!(run_id = %run.id, "run stored");
                true
            }
            Err(e) => {
                tracing::warn!(run_id = %run.id, error = %e, "storing run failed");
                false
            }
        },
        None => false,
    };

    Ok(Published { path, stored })
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::load().context("loading configuration")?;
    args.apply(&mut config);

    let inputs = MonitorInputs::load(&args.products, &args.patterns)?;
    let generator = if args.summarize {
        Some(GeminiClient::from_app(&config).context("summaries need DISCWATCH_GEMINI_API_KEY")?)
    } else {
        None
    };
    let db = if args.no_store {
        None
    } else {
        Some(
            CacheDb::open(&config.db_path)
                .await
                .with_context(|| format!("opening run store at {}", config.db_path.display()))?,
        )
    };
    let fetcher = WebPageFetcher::from_config(&config).await?;

    tracing::info!(
        products = inputs.products.len(),
        patterns = inputs.patterns.len(),
        summarize = generator.is_some(),
        store = db.is_some(),
        "starting run"
    );

    let progress = if std::io::stderr().is_terminal() { BarProgress::new("scraping") } else { BarProgress::hidden() };
    let run = run_monitor(
        &inputs,
        &fetcher,
        generator.as_ref().map(|g| g as &dyn TextGenerator),
        &args.options(&config),
        &progress,
    )
    .await?;

    let dir = args.out.clone().unwrap_or_else(|| config.export_dir.clone());
    let date = Utc::now().with_timezone(&config.utc_offset()).date_naive();
    let published = publish(&run, db.as_ref(), &dir, date, args.format.into()).await?;

    let fetch_errors = run.rows.iter().filter(|r| r.fetch_error.is_some()).count();
    println!(
        "run {}: {} products, {} rows ({} with fetch errors)",
        run.id,
        run.product_count,
        run.rows.len(),
        fetch_errors
    );
    println!("report written to {}", published.path.display());
    if published.stored {
        println!("run stored in {}", config.db_path.display());
    }

    Ok(())
}
