//! CLI subcommands.

pub mod report;
pub mod run;
pub mod runs;

use clap::ValueEnum;
use discwatch_core::{ExportFormat, ReportFilter};

/// Report file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Csv,
    Json,
    Xlsx,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Xlsx => ExportFormat::Xlsx,
        }
    }
}

/// Facet selections shared by commands that read report rows.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct FilterArgs {
    /// Keep rows in this group (repeatable)
    #[arg(long = "group")]
    pub groups: Vec<String>,

    /// Keep rows for this financial institution (repeatable)
    #[arg(long = "fi")]
    pub fis: Vec<String>,

    /// Keep rows of this product type (repeatable)
    #[arg(long = "product-type")]
    pub product_types: Vec<String>,

    /// Keep rows for this product (repeatable)
    #[arg(long = "product")]
    pub products: Vec<String>,

    /// Keep rows from this keyword set (repeatable)
    #[arg(long = "keyword-set")]
    pub keyword_sets: Vec<String>,
}

fn selection(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() { None } else { Some(values.to_vec()) }
}

impl FilterArgs {
    /// An empty selection admits every value of that facet.
    pub fn to_filter(&self) -> ReportFilter {
        ReportFilter {
            groups: selection(&self.groups),
            fis: selection(&self.fis),
            product_types: selection(&self.product_types),
            products: selection(&self.products),
            keyword_sets: selection(&self.keyword_sets),
        }
    }
}
