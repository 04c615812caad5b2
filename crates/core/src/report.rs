//! Faceted filtering and export of report rows.
//!
//! Facets cascade the way an operator narrows a report: the institutions offered depend on the
//! groups selected, the product types on the institutions, and so on down to the keyword set.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::models::OutputRow;

/// Export header, in column order.
pub const OUTPUT_COLUMNS: [&str; 16] = [
    "Group",
    "Abbreviation",
    "FI",
    "FI_type",
    "Product",
    "Product_type",
    "URL",
    "PDF",
    "timestamp",
    "Keyword_Set",
    "keyword",
    "Sentences_found",
    "Sentences",
    "Fetch_error",
    "Summary_relevant",
    "Summary",
];

/// Excel's limit on characters in one cell; longer values are cut to fit.
pub const XLSX_MAX_CELL_CHARS: usize = 32_767;

/// Worksheet name of the xlsx export.
pub const XLSX_SHEET_NAME: &str = "report";

/// Distinct facet values, each in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Facets {
    pub groups: Vec<String>,
    pub fis: Vec<String>,
    pub product_types: Vec<String>,
    pub products: Vec<String>,
    pub keyword_sets: Vec<String>,
}

fn push_distinct(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

impl Facets {
    /// Distinct values of every facet across all rows.
    pub fn collect(rows: &[OutputRow]) -> Self {
        let mut facets = Self::default();
        for row in rows {
            push_distinct(&mut facets.groups, &row.group);
            push_distinct(&mut facets.fis, &row.fi);
            push_distinct(&mut facets.product_types, &row.product_type);
            push_distinct(&mut facets.products, &row.product);
            push_distinct(&mut facets.keyword_sets, &row.keyword_set);
        }
        facets
    }

    /// Facet values offered at each level given the selections made at the levels above it.
    pub fn cascade(rows: &[OutputRow], filter: &ReportFilter) -> Self {
        let mut facets = Self::default();
        for row in rows {
            push_distinct(&mut facets.groups, &row.group);
            if !admits(&filter.groups, &row.group) {
                continue;
            }
            push_distinct(&mut facets.fis, &row.fi);
            if !admits(&filter.fis, &row.fi) {
                continue;
            }
            push_distinct(&mut facets.product_types, &row.product_type);
            if !admits(&filter.product_types, &row.product_type) {
                continue;
            }
            push_distinct(&mut facets.products, &row.product);
            if !admits(&filter.products, &row.product) {
                continue;
            }
            push_distinct(&mut facets.keyword_sets, &row.keyword_set);
        }
        facets
    }
}

/// Optional allow-list per facet; `None` admits every value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ReportFilter {
    #[serde(default)]
    pub groups: Option<Vec<String>>,
    #[serde(default)]
    pub fis: Option<Vec<String>>,
    #[serde(default)]
    pub product_types: Option<Vec<String>>,
    #[serde(default)]
    pub products: Option<Vec<String>>,
    #[serde(default)]
    pub keyword_sets: Option<Vec<String>>,
}

fn admits(allowed: &Option<Vec<String>>, value: &str) -> bool {
    allowed.as_ref().is_none_or(|list| list.iter().any(|v| v == value))
}

impl ReportFilter {
    pub fn matches(&self, row: &OutputRow) -> bool {
        admits(&self.groups, &row.group)
            && admits(&self.fis, &row.fi)
            && admits(&self.product_types, &row.product_type)
            && admits(&self.products, &row.product)
            && admits(&self.keyword_sets, &row.keyword_set)
    }

    /// Rows admitted by every facet, in input order.
    pub fn apply(&self, rows: &[OutputRow]) -> Vec<OutputRow> {
        rows.iter().filter(|row| self.matches(row)).cloned().collect()
    }
}

/// Export file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

/// `output_<YYYY-MM-DD>.<ext>`
pub fn export_file_name(date: NaiveDate, format: ExportFormat) -> String {
    format!("output_{}.{}", date.format("%Y-%m-%d"), format.extension())
}

fn export_path(dir: &Path, date: NaiveDate, format: ExportFormat) -> Result<PathBuf, Error> {
    fs::create_dir_all(dir).map_err(|e| Error::ExportFailed(format!("{}: {e}", dir.display())))?;
    Ok(dir.join(export_file_name(date, format)))
}

/// Write rows as CSV under `dir`, returning the file path. The header is written even when
/// there are no rows.
pub fn export_csv(rows: &[OutputRow], dir: &Path, date: NaiveDate) -> Result<PathBuf, Error> {
    let path = export_path(dir, date, ExportFormat::Csv)?;
    let fail = |e: csv::Error| Error::ExportFailed(format!("{}: {e}", path.display()));

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(&path).map_err(fail)?;
    writer.write_record(OUTPUT_COLUMNS).map_err(fail)?;
    for row in rows {
        writer.serialize(row).map_err(fail)?;
    }
    writer.flush().map_err(|e| Error::ExportFailed(format!("{}: {e}", path.display())))?;

    tracing::info!(path = %path.display(), rows = rows.len(), "exported CSV report");

    Ok(path)
}

/// Write rows as a pretty-printed JSON array under `dir`, returning the file path.
pub fn export_json(rows: &[OutputRow], dir: &Path, date: NaiveDate) -> Result<PathBuf, Error> {
    let path = export_path(dir, date, ExportFormat::Json)?;

    let file = File::create(&path).map_err(|e| Error::ExportFailed(format!("{}: {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, rows)
        .map_err(|e| Error::ExportFailed(format!("{}: {e}", path.display())))?;
    writer.flush().map_err(|e| Error::ExportFailed(format!("{}: {e}", path.display())))?;

    tracing::info!(path = %path.display(), rows = rows.len(), "exported JSON report");

    Ok(path)
}

/// Cell values of a row in [`OUTPUT_COLUMNS`] order; absent optional columns are empty.
pub fn row_cells(row: &OutputRow) -> [&str; OUTPUT_COLUMNS.len()] {
    [
        row.group.as_str(),
        row.abbreviation.as_str(),
        row.fi.as_str(),
        row.fi_type.as_str(),
        row.product.as_str(),
        row.product_type.as_str(),
        row.url.as_str(),
        row.pdf.as_str(),
        row.timestamp.as_str(),
        row.keyword_set.as_str(),
        row.keyword.as_str(),
        row.sentences_found.as_str(),
        row.sentences.as_str(),
        row.fetch_error.as_deref().unwrap_or_default(),
        row.summary_relevant.as_deref().unwrap_or_default(),
        row.summary.as_deref().unwrap_or_default(),
    ]
}

fn xlsx_cell(value: &str) -> &str {
    match value.char_indices().nth(XLSX_MAX_CELL_CHARS) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Write rows as a single-sheet workbook under `dir`, returning the file path. The header row is
/// bold and frozen.
pub fn export_xlsx(rows: &[OutputRow], dir: &Path, date: NaiveDate) -> Result<PathBuf, Error> {
    let path = export_path(dir, date, ExportFormat::Xlsx)?;
    let fail = |e: XlsxError| Error::ExportFailed(format!("{}: {e}", path.display()));

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(XLSX_SHEET_NAME).map_err(fail)?;

    for (col, name) in OUTPUT_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &bold).map_err(fail)?;
    }
    for (idx, row) in rows.iter().enumerate() {
        let line = u32::try_from(idx + 1)
            .map_err(|_| Error::ExportFailed(format!("{}: too many rows", path.display())))?;
        for (col, value) in row_cells(row).into_iter().enumerate() {
            sheet.write_string(line, col as u16, xlsx_cell(value)).map_err(fail)?;
        }
    }
    sheet.set_freeze_panes(1, 0).map_err(fail)?;

    workbook.save(&path).map_err(fail)?;

    tracing::info!(path = %path.display(), rows = rows.len(), "exported xlsx report");

    Ok(path)
}

/// Export in the requested format.
pub fn export(rows: &[OutputRow], dir: &Path, date: NaiveDate, format: ExportFormat) -> Result<PathBuf, Error> {
    match format {
        ExportFormat::Csv => export_csv(rows, dir, date),
        ExportFormat::Json => export_json(rows, dir, date),
        ExportFormat::Xlsx => export_xlsx(rows, dir, date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(group: &str, fi: &str, product_type: &str, product: &str, set: &str) -> OutputRow {
        OutputRow {
            group: group.into(),
            abbreviation: fi.to_uppercase(),
            fi: fi.into(),
            fi_type: "commercial".into(),
            product: product.into(),
            product_type: product_type.into(),
            url: format!("https://{fi}.test/{product}"),
            pdf: "none found".into(),
            timestamp: "2024-03-01 10:00:00".into(),
            keyword_set: set.into(),
            keyword: "apr".into(),
            sentences_found: "found".into(),
            sentences: "16%\n\n- 18%".into(),
            fetch_error: None,
            summary_relevant: None,
            summary: None,
        }
    }

    fn rows() -> Vec<OutputRow> {
        vec![
            row("Bank", "alpha", "card", "Alpha Card", "rates"),
            row("Bank", "alpha", "loan", "Alpha Loan", "fees"),
            row("Bank", "beta", "card", "Beta Card", "rates"),
            row("NonBank", "gamma", "card", "Gamma Card", "rates"),
        ]
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_collect_facets_first_seen_order() {
        let facets = Facets::collect(&rows());
        assert_eq!(facets.groups, vec!["Bank", "NonBank"]);
        assert_eq!(facets.fis, vec!["alpha", "beta", "gamma"]);
        assert_eq!(facets.product_types, vec!["card", "loan"]);
        assert_eq!(facets.keyword_sets, vec!["rates", "fees"]);
    }

    #[test]
    fn test_cascade_narrows_lower_levels() {
        let filter = ReportFilter { groups: Some(vec!["Bank".into()]), fis: Some(vec!["beta".into()]), ..Default::default() };
        let facets = Facets::cascade(&rows(), &filter);
        assert_eq!(facets.groups, vec!["Bank", "NonBank"]);
        assert_eq!(facets.fis, vec!["alpha", "beta"]);
        assert_eq!(facets.product_types, vec!["card"]);
        assert_eq!(facets.products, vec!["Beta Card"]);
        assert_eq!(facets.keyword_sets, vec!["rates"]);
    }

    #[test]
    fn test_default_filter_admits_everything() {
        let rows = rows();
        assert_eq!(ReportFilter::default().apply(&rows), rows);
    }

    #[test]
    fn test_filter_combines_facets() {
        let filter = ReportFilter {
            groups: Some(vec!["Bank".into()]),
            product_types: Some(vec!["card".into()]),
            ..Default::default()
        };
        let products: Vec<String> = filter.apply(&rows()).into_iter().map(|r| r.product).collect();
        assert_eq!(products, vec!["Alpha Card", "Beta Card"]);
    }

    #[test]
    fn test_empty_allow_list_admits_nothing() {
        let filter = ReportFilter { keyword_sets: Some(vec![]), ..Default::default() };
        assert!(filter.apply(&rows()).is_empty());
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name(date(), ExportFormat::Csv), "output_2024-03-01.csv");
        assert_eq!(export_file_name(date(), ExportFormat::Json), "output_2024-03-01.json");
        assert_eq!(export_file_name(date(), ExportFormat::Xlsx), "output_2024-03-01.xlsx");
    }

    #[test]
    fn test_export_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut rows = rows();
        rows[0].fetch_error = Some("HTTP_ERROR: status 503".into());

        let path = export_csv(&rows, dir.path(), date()).unwrap();
        assert_eq!(path.file_name().unwrap(), "output_2024-03-01.csv");

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(headers, OUTPUT_COLUMNS.to_vec());

        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 4);
        assert_eq!(&records[0][12], "16%\n\n- 18%");
        assert_eq!(&records[0][13], "HTTP_ERROR: status 503");
        assert_eq!(&records[1][13], "");
    }

    #[test]
    fn test_export_csv_empty_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_csv(&[], dir.path(), date()).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with("Group,Abbreviation,FI"));
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_export_json_round_trips_rows() {
        let dir = tempfile::tempdir().unwrap();
        let rows = rows();
        let path = export(&rows, &dir.path().join("nested"), date(), ExportFormat::Json).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 4);
        assert_eq!(value[0]["Keyword_Set"], "rates");
        assert_eq!(value[0]["Sentences_found"], "found");
    }

    #[test]
    fn test_row_cells_follow_column_order() {
        let mut row = rows().remove(0);
        row.fetch_error = Some("HTTP_ERROR: status 503".into());
        row.summary = Some("rates apply".into());

        let value = serde_json::to_value(&row).unwrap();
        for (name, cell) in OUTPUT_COLUMNS.iter().zip(row_cells(&row)) {
            let expected = value[*name].as_str().unwrap_or_default();
            assert_eq!(cell, expected, "column {name}");
        }
    }

    #[test]
    fn test_xlsx_cell_is_cut_to_excel_limit() {
        let long = "ก".repeat(XLSX_MAX_CELL_CHARS + 10);
        assert_eq!(xlsx_cell(&long).chars().count(), XLSX_MAX_CELL_CHARS);
        assert_eq!(xlsx_cell("16%"), "16%");
    }

    #[test]
    fn test_export_xlsx_writes_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let mut rows = rows();
        rows[0].sentences = "x".repeat(XLSX_MAX_CELL_CHARS + 1);

        let path = export(&rows, dir.path(), date(), ExportFormat::Xlsx).unwrap();

        assert_eq!(path.file_name().unwrap(), "output_2024-03-01.xlsx");
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
