//! SQLite-backed store for completed monitoring runs.
//!
//! A run's flattened report rows are persisted so filtering and export can operate on an
//! earlier run without re-scraping. Storage uses tokio-rusqlite with:
//!
//! - Run ids derived from a SHA-256 digest of the inputs and creation time
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Age and LRU purge strategies

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod runs;

pub use crate::Error;

pub use connection::CacheDb;
pub use runs::{RunRecord, RunSummary};
