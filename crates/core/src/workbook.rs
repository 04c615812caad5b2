//! Product and pattern table ingestion.
//!
//! Both tables are CSV with a header row. Columns are located by name (trimmed,
//! case-insensitive, with a few legacy aliases), so column order does not matter. Validation
//! happens here so a malformed table fails the run before anything is fetched.

use std::io;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::Error;
use crate::models::{FetchStrategy, ProductRecord};
use crate::patterns::PatternDefinition;

const PRODUCT_TABLE: &str = "product";
const PATTERN_TABLE: &str = "pattern";

/// A required or optional column and the header names it may appear under.
struct Column {
    name: &'static str,
    aliases: &'static [&'static str],
}

const GROUP: Column = Column { name: "Group", aliases: &[] };
const BANK_ABB: Column = Column { name: "Bank_abb", aliases: &["Abbreviation"] };
const BANK_NAME: Column = Column { name: "Bank_name", aliases: &["FI"] };
const FI_TYPE: Column = Column { name: "FI_type", aliases: &["type"] };
const PRODUCT_TYPE: Column = Column { name: "Product_type", aliases: &[] };
const PRODUCT_NAME: Column = Column { name: "Product_Name", aliases: &["Product"] };
const URL: Column = Column { name: "URL", aliases: &[] };
const STATUS: Column = Column { name: "Status", aliases: &["Note"] };
const FETCH: Column = Column { name: "Fetch", aliases: &[] };

const SET: Column = Column { name: "set", aliases: &["Keyword_Set"] };
const TOPIC: Column = Column { name: "topic", aliases: &["mc", "keyword"] };
const PATTERN: Column = Column { name: "pattern", aliases: &[] };

fn header_matches(header: &str, column: &Column) -> bool {
    let header = header.trim_start_matches('\u{feff}').trim();
    header.eq_ignore_ascii_case(column.name) || column.aliases.iter().any(|a| header.eq_ignore_ascii_case(a))
}

fn find_column(headers: &StringRecord, column: &Column) -> Option<usize> {
    headers.iter().position(|h| header_matches(h, column))
}

fn require_column(headers: &StringRecord, table: &str, column: &Column) -> Result<usize, Error> {
    find_column(headers, column)
        .ok_or_else(|| Error::MissingColumn { table: table.to_string(), column: column.name.to_string() })
}

/// Cell value with surrounding whitespace removed.
fn cell(record: &StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or_default().trim().to_string()
}

/// Cell value exactly as written. Pattern sources keep their whitespace.
fn raw_cell(record: &StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or_default().to_string()
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|c| c.trim().is_empty())
}

fn line_of(record: &StringRecord, fallback: usize) -> usize {
    record.position().map(|p| p.line() as usize).unwrap_or(fallback)
}

fn table_reader<R: io::Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new().flexible(true).trim(Trim::Headers).from_reader(reader)
}

/// Load the product table.
///
/// Blank lines are skipped. A row flagged `keep` must carry a URL; `WIP` and `-` placeholders
/// are accepted here and skipped by the aggregator.
pub fn load_products<R: io::Read>(reader: R) -> Result<Vec<ProductRecord>, Error> {
    let mut rdr = table_reader(reader);
    let headers = rdr.headers()?.clone();

    let group = require_column(&headers, PRODUCT_TABLE, &GROUP)?;
    let bank_abb = require_column(&headers, PRODUCT_TABLE, &BANK_ABB)?;
    let bank_name = require_column(&headers, PRODUCT_TABLE, &BANK_NAME)?;
    let fi_type = require_column(&headers, PRODUCT_TABLE, &FI_TYPE)?;
    let product_type = require_column(&headers, PRODUCT_TABLE, &PRODUCT_TYPE)?;
    let product_name = require_column(&headers, PRODUCT_TABLE, &PRODUCT_NAME)?;
    let url = require_column(&headers, PRODUCT_TABLE, &URL)?;
    let status = require_column(&headers, PRODUCT_TABLE, &STATUS)?;
    let fetch = find_column(&headers, &FETCH);

    let mut products = Vec::new();

    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        let row = line_of(&record, idx + 2);

        let strategy = match fetch {
            Some(col) => {
                let raw = cell(&record, col);
                FetchStrategy::parse(&raw).ok_or_else(|| Error::InvalidRecord {
                    table: PRODUCT_TABLE.to_string(),
                    row,
                    reason: format!("unknown fetch strategy '{raw}'"),
                })?
            }
            None => FetchStrategy::default(),
        };

        let product = ProductRecord {
            group: cell(&record, group),
            bank_abb: cell(&record, bank_abb),
            bank_name: cell(&record, bank_name),
            fi_type: cell(&record, fi_type),
            product_type: cell(&record, product_type),
            product_name: cell(&record, product_name),
            url: cell(&record, url),
            status: cell(&record, status),
            fetch: strategy,
        };

        if product.is_kept() {
            if product.url.is_empty() {
                return Err(Error::InvalidRecord {
                    table: PRODUCT_TABLE.to_string(),
                    row,
                    reason: "URL is required for rows marked keep".to_string(),
                });
            }
            if product.product_name.is_empty() {
                return Err(Error::InvalidRecord {
                    table: PRODUCT_TABLE.to_string(),
                    row,
                    reason: "Product_Name is required for rows marked keep".to_string(),
                });
            }
        }

        products.push(product);
    }

    tracing::debug!(rows = products.len(), kept = products.iter().filter(|p| p.is_kept()).count(), "loaded products");

    Ok(products)
}

/// Load the product table from a CSV file.
pub fn load_products_path(path: impl AsRef<Path>) -> Result<Vec<ProductRecord>, Error> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| Error::Table(format!("{}: {e}", path.display())))?;
    load_products(file)
}

/// Load the pattern table.
///
/// Patterns are not compiled here; hand the result to `build_registry`.
pub fn load_patterns<R: io::Read>(reader: R) -> Result<Vec<PatternDefinition>, Error> {
    let mut rdr = table_reader(reader);
    let headers = rdr.headers()?.clone();

    let set = require_column(&headers, PATTERN_TABLE, &SET)?;
    let topic = require_column(&headers, PATTERN_TABLE, &TOPIC)?;
    let pattern = require_column(&headers, PATTERN_TABLE, &PATTERN)?;

    let mut definitions = Vec::new();

    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        let row = line_of(&record, idx + 2);

        let def = PatternDefinition::new(cell(&record, set), cell(&record, topic), raw_cell(&record, pattern));
        for (value, name) in [(&def.set, SET.name), (&def.topic, TOPIC.name)] {
            if value.is_empty() {
                return Err(Error::InvalidRecord {
                    table: PATTERN_TABLE.to_string(),
                    row,
                    reason: format!("'{name}' is empty"),
                });
            }
        }

        definitions.push(def);
    }

    tracing::debug!(definitions = definitions.len(), "loaded pattern definitions");

    Ok(definitions)
}

/// Load the pattern table from a CSV file.
pub fn load_patterns_path(path: impl AsRef<Path>) -> Result<Vec<PatternDefinition>, Error> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| Error::Table(format!("{}: {e}", path.display())))?;
    load_patterns(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCTS: &str = "\
Group,Bank_abb,Bank_name,FI_type,Product_type,Product_Name,URL,Status
Bank,AB,Alpha Bank,commercial,card,Card A,https://a.test/card,keep
Bank,AB,Alpha Bank,commercial,loan,Loan B,WIP,keep
Bank,AB,Alpha Bank,commercial,loan,Loan C,https://a.test/loan,discard
";

    #[test]
    fn test_load_products() {
        let products = load_products(PRODUCTS.as_bytes()).unwrap();
        assert_eq!(products.len(), 3);
        assert_eq!(products[0].product_name, "Card A");
        assert_eq!(products[0].fetch, FetchStrategy::Http);
        assert!(products[0].is_kept());
        assert!(products[1].has_placeholder_url());
        assert!(!products[2].is_kept());
    }

    #[test]
    fn test_load_products_accepts_aliases_and_any_order() {
        let csv = "\
Note,URL,Product_Name,Product_type,type,Bank_name,Bank_abb,Group,Fetch
keep,https://a.test/x,X,card,commercial,Alpha,AB,Bank,browser
";
        let products = load_products(csv.as_bytes()).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].status, "keep");
        assert_eq!(products[0].fi_type, "commercial");
        assert_eq!(products[0].fetch, FetchStrategy::Browser);
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "Group,Bank_abb,Bank_name,FI_type,Product_type,Product_Name,Status\n";
        match load_products(csv.as_bytes()).unwrap_err() {
            Error::MissingColumn { table, column } => {
                assert_eq!(table, "product");
                assert_eq!(column, "URL");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_kept_row_without_url_is_rejected() {
        let csv = "\
Group,Bank_abb,Bank_name,FI_type,Product_type,Product_Name,URL,Status
Bank,AB,Alpha,commercial,card,Card A,,keep
";
        match load_products(csv.as_bytes()).unwrap_err() {
            Error::InvalidRecord { row, reason, .. } => {
                assert_eq!(row, 2);
                assert!(reason.contains("URL"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_discarded_row_without_url_is_accepted() {
        let csv = "\
Group,Bank_abb,Bank_name,FI_type,Product_type,Product_Name,URL,Status
Bank,AB,Alpha,commercial,card,Card A,,discard
";
        assert_eq!(load_products(csv.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_fetch_strategy_is_rejected() {
        let csv = "\
Group,Bank_abb,Bank_name,FI_type,Product_type,Product_Name,URL,Status,Fetch
Bank,AB,Alpha,commercial,card,Card A,https://a.test,keep,telnet
";
        assert!(matches!(load_products(csv.as_bytes()), Err(Error::InvalidRecord { .. })));
    }

    #[test]
    fn test_load_patterns() {
        let csv = "\
set,mc,pattern
rates,apr,\\d+%
fees,annual,\"annual fee \\d+, waived\"

rates,monthly,per month
";
        let defs = load_patterns(csv.as_bytes()).unwrap();
        assert_eq!(defs.len(), 3);
        assert_eq!(defs[0], PatternDefinition::new("rates", "apr", r"\d+%"));
        assert_eq!(defs[1].pattern, r"annual fee \d+, waived");
        assert_eq!(defs[2].topic, "monthly");
    }

    #[test]
    fn test_pattern_whitespace_is_preserved() {
        let csv = "set,topic,pattern\n fees , fee ,\"fee \"\n";
        let defs = load_patterns(csv.as_bytes()).unwrap();
        assert_eq!(defs[0], PatternDefinition::new("fees", "fee", "fee "));

        let registry = crate::patterns::build_registry(&defs).unwrap();
        let set = registry.get("fees").unwrap();
        let matches = crate::matcher::extract("feed the fee now", set);
        assert_eq!(matches.get("fee"), Some(&["fee ".to_string()][..]));
    }

    #[test]
    fn test_pattern_row_without_topic_is_rejected() {
        let csv = "set,topic,pattern\nrates,,\\d+%\n";
        match load_patterns(csv.as_bytes()).unwrap_err() {
            Error::InvalidRecord { table, reason, .. } => {
                assert_eq!(table, "pattern");
                assert!(reason.contains("topic"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bom_prefixed_header() {
        let csv = "\u{feff}set,topic,pattern\nrates,apr,x\n";
        assert_eq!(load_patterns(csv.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_file_is_table_error() {
        let err = load_patterns_path("/nonexistent/discwatch/patterns.csv").unwrap_err();
        assert!(matches!(err, Error::Table(_)));
    }
}
