//! Run CRUD operations.

use chrono::{Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::hash::compute_run_id;
use crate::Error;
use crate::models::{OutputRow, ProductRecord};
use crate::patterns::PatternDefinition;

/// Store timestamp: fixed-width UTC RFC 3339, so text ordering matches time ordering.
pub fn store_timestamp(at: chrono::DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A completed run with its flattened report rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RunRecord {
    pub id: String,
    pub created_at: String,
    /// Products visited by the run (after keep/placeholder filtering).
    pub product_count: usize,
    pub rows: Vec<OutputRow>,
}

impl RunRecord {
    /// A new run stamped with the current time and an id derived from its inputs.
    pub fn new(
        products: &[ProductRecord], patterns: &[PatternDefinition], product_count: usize, rows: Vec<OutputRow>,
    ) -> Self {
        let created_at = store_timestamp(Utc::now());
        let id = compute_run_id(products, patterns, &created_at);
        Self { id, created_at, product_count, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            id: self.id.clone(),
            created_at: self.created_at.clone(),
            product_count: self.product_count,
            row_count: self.rows.len(),
        }
    }
}

/// Run metadata without the rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RunSummary {
    pub id: String,
    pub created_at: String,
    pub product_count: usize,
    pub row_count: usize,
}

impl CacheDb {
    /// Insert or replace a run.
    pub async fn insert_run(&self, run: &RunRecord) -> Result<(), Error> {
        let rows_json = serde_json::to_string(&run.rows)?;
        let id = run.id.clone();
        let created_at = run.created_at.clone();
        let product_count = run.product_count as i64;
        let row_count = run.rows.len() as i64;
        let accessed_at = store_timestamp(Utc::now());

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO runs (id, created_at, accessed_at, product_count, row_count, rows_json)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(id) DO UPDATE SET
                        created_at = excluded.created_at,
                        accessed_at = excluded.accessed_at,
                        product_count = excluded.product_count,
                        row_count = excluded.row_count,
                        rows_json = excluded.rows_json",
                    params![id, created_at, accessed_at, product_count, row_count, rows_json],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        tracing::debug!(run_id = %run.id, rows = run.rows.len(), "stored run");
        Ok(())
    }

    /// Get a run by id and mark it as recently used.
    ///
    /// Returns None if no run is stored under `id`.
    pub async fn get_run(&self, id: &str) -> Result<Option<RunRecord>, Error> {
        let id = id.to_string();
        let now = store_timestamp(Utc::now());

        let row = self
            .conn
            .call(move |conn| -> Result<Option<(String, String, i64, String)>, Error> {
                let result = conn.query_row::<(String, String, i64, String), _, _>(
                    "SELECT id, created_at, product_count, rows_json FROM runs WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                );

                match result {
                    Ok(found) => {
                        conn.execute("UPDATE runs SET accessed_at = ?1 WHERE id = ?2", params![now, found.0])?;
                        Ok(Some(found))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        match row {
            Some((id, created_at, product_count, rows_json)) => Ok(Some(RunRecord {
                id,
                created_at,
                product_count: product_count.max(0) as usize,
                rows: serde_json::from_str(&rows_json)?,
            })),
            None => Ok(None),
        }
    }

    /// Get a run by id, failing with `RunNotFound` when absent.
    pub async fn require_run(&self, id: &str) -> Result<RunRecord, Error> {
        self.get_run(id).await?.ok_or_else(|| Error::RunNotFound(id.to_string()))
    }

    /// Stored runs, newest first.
    pub async fn list_runs(&self, limit: usize) -> Result<Vec<RunSummary>, Error> {
        let limit = limit as i64;
        self.conn
            .call(move |conn| -> Result<Vec<RunSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, created_at, product_count, row_count FROM runs
                     ORDER BY created_at DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit], |row| {
                    Ok(RunSummary {
                        id: row.get(0)?,
                        created_at: row.get(1)?,
                        product_count: row.get::<_, i64>(2)?.max(0) as usize,
                        row_count: row.get::<_, i64>(3)?.max(0) as usize,
                    })
                })?;

                let mut runs = Vec::new();
                for run in rows {
                    runs.push(run?);
                }
                Ok(runs)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete runs created more than `days` days ago.
    ///
    /// Returns the number of deleted runs.
    pub async fn purge_runs_older_than(&self, days: u32) -> Result<u64, Error> {
        let cutoff = store_timestamp(Utc::now() - Duration::days(i64::from(days)));
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM runs WHERE created_at < ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge least recently used runs until count <= max_entries.
    ///
    /// Returns the number of deleted runs.
    pub async fn purge_lru_runs(&self, max_entries: usize) -> Result<u64, Error> {
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM runs WHERE id IN (
                    SELECT id FROM runs ORDER BY accessed_at ASC, created_at ASC LIMIT ?1
                )",
                    params![to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(product: &str) -> OutputRow {
        OutputRow {
            group: "Bank".into(),
            abbreviation: "AB".into(),
            fi: "Alpha".into(),
            fi_type: "commercial".into(),
            product: product.into(),
            product_type: "card".into(),
            url: "https://a.test".into(),
            pdf: "none found".into(),
            timestamp: "2024-01-01 07:00:00".into(),
            keyword_set: "rates".into(),
            keyword: "apr".into(),
            sentences_found: "found".into(),
            sentences: "16%".into(),
            fetch_error: None,
            summary_relevant: Some("relevant summary".into()),
            summary: Some("summary".into()),
        }
    }

    fn run(id: &str, created_at: chrono::DateTime<Utc>) -> RunRecord {
        RunRecord { id: id.into(), created_at: store_timestamp(created_at), product_count: 1, rows: vec![row(id)] }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let record = run("r1", Utc::now());

        db.insert_run(&record).await.unwrap();

        let retrieved = db.get_run("r1").await.unwrap().unwrap();
        assert_eq!(retrieved, record);
        assert_eq!(retrieved.row_count(), 1);
    }

    #[tokio::test]
    async fn test_new_run_gets_hex_id() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let record = RunRecord::new(&[], &[PatternDefinition::new("rates", "apr", "x")], 0, vec![]);
        assert_eq!(record.id.len(), 64);
        assert_eq!(record.summary().row_count, 0);

        db.insert_run(&record).await.unwrap();
        assert_eq!(db.require_run(&record.id).await.unwrap().created_at, record.created_at);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.get_run("nonexistent").await.unwrap().is_none());
        assert!(matches!(db.require_run("nonexistent").await, Err(Error::RunNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_runs_newest_first() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now();
        db.insert_run(&run("old", now - Duration::hours(2))).await.unwrap();
        db.insert_run(&run("new", now)).await.unwrap();

        let runs = db.list_runs(10).await.unwrap();
        let ids: Vec<&str> = runs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(runs[0].row_count, 1);

        assert_eq!(db.list_runs(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now();
        db.insert_run(&run("ancient", now - Duration::days(40))).await.unwrap();
        db.insert_run(&run("recent", now - Duration::days(1))).await.unwrap();

        let deleted = db.purge_runs_older_than(30).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_run("ancient").await.unwrap().is_none());
        assert!(db.get_run("recent").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_lru_keeps_recently_read() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now();
        db.insert_run(&run("a", now - Duration::hours(3))).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        db.insert_run(&run("b", now - Duration::hours(2))).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        db.insert_run(&run("c", now - Duration::hours(1))).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        db.get_run("a").await.unwrap();

        let deleted = db.purge_lru_runs(2).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_run("a").await.unwrap().is_some());
        assert!(db.get_run("b").await.unwrap().is_none());
        assert!(db.get_run("c").await.unwrap().is_some());

        assert_eq!(db.purge_lru_runs(5).await.unwrap(), 0);
    }
}
