//! Core types and pipeline stages for discwatch.
//!
//! This crate provides:
//! - Pattern registry and match extraction
//! - Product aggregation over a pluggable page fetcher
//! - Flattening, faceted filtering and export of report rows
//! - Product/pattern table ingestion
//! - Run store with SQLite backend
//! - Unified error types and configuration

pub mod aggregate;
pub mod cache;
pub mod clean;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod flatten;
pub mod matcher;
pub mod models;
pub mod patterns;
pub mod report;
pub mod workbook;

pub use aggregate::{AggregateOptions, LogProgress, NullProgress, Pacing, ProgressSink, aggregate};
pub use cache::{CacheDb, RunRecord, RunSummary};
pub use config::AppConfig;
pub use error::Error;
pub use fetcher::PageFetcher;
pub use flatten::flatten;
pub use models::{FetchStrategy, FetchedPage, KeywordFinding, OutputRow, ProductAggregate, ProductRecord};
pub use patterns::{PatternDefinition, PatternRegistry, PatternSet, build_registry};
pub use report::{ExportFormat, Facets, ReportFilter};
