//! `discwatch report`: filter a stored run and export or inspect it.

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::Args;

use discwatch_core::{AppConfig, CacheDb, Facets, report};

use super::{FilterArgs, FormatArg};

/// Arguments for the report command.
#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Id of a stored run (see `discwatch runs list`)
    pub run_id: String,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Print the selectable facet values as JSON instead of exporting
    #[arg(long)]
    pub facets: bool,

    /// Output directory (defaults to DISCWATCH_EXPORT_DIR)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Report file format
    #[arg(short, long, value_enum, default_value = "csv")]
    pub format: FormatArg,
}

pub async fn run(args: ReportArgs) -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening run store at {}", config.db_path.display()))?;

    let run = db.require_run(&args.run_id).await?;
    let filter = args.filter.to_filter();

    if args.facets {
        let facets = Facets::cascade(&run.rows, &filter);
        println!("{}", serde_json::to_string_pretty(&facets)?);
        return Ok(());
    }

    let rows = filter.apply(&run.rows);
    let date = Utc::now().with_timezone(&config.utc_offset()).date_naive();
    let dir = args.out.unwrap_or(config.export_dir);
    let path = report::export(&rows, &dir, date, args.format.into())?;

    println!("{} of {} rows written to {}", rows.len(), run.rows.len(), path.display());

    Ok(())
}
