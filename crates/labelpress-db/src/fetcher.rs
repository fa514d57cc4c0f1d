//! # Label Data Fetcher
//!
//! Pulls product rows out of MySQL and maps them to [`LabelRecord`]s.
//!
//! ## Fetch Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  FetchCriteria (SKU list | name pattern)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate ──► InvalidRequest (before any connection is touched)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  acquire connection ──► SELECT in chunks of MAX_QUERY_PARAMS            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  merge: requested order preserved, absent SKUs listed, duplicates       │
//! │  collapsed to the first occurrence                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  FetchOutcome { records, missing }                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The SQL is built with `?` placeholders and bound per SKU; nothing from
//! the request is ever interpolated into the statement text.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use sqlx::mysql::MySqlConnection;
use sqlx::{FromRow, MySql};
use tokio::time::timeout;
use tracing::{debug, info};

use labelpress_core::LabelRecord;

use crate::config::DatabaseConfig;
use crate::connector::MySqlConnector;
use crate::error::{DbError, DbResult};
use crate::manager::ConnectionManager;

/// Upper bound on bound parameters per statement. Chunking keeps huge
/// SKU lists inside the server's prepared-statement limits.
pub const MAX_QUERY_PARAMS: usize = 500;

const SELECT_COLUMNS: &str =
    "SELECT sku, name, price_cents, barcode, stock_qty, size, composition, manufacturer \
     FROM products";

const SELECT_ATTRIBUTES: &str = "SELECT sku, name, value FROM product_attributes";

// =============================================================================
// Fetch Criteria & Outcome
// =============================================================================

/// What to fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchCriteria {
    /// Exact SKUs, in the order labels should print.
    Skus(Vec<String>),
    /// Substring match against the product name.
    NameLike(String),
}

/// Fetch result: the records found plus the requested SKUs that were not.
///
/// A missing SKU is not an error; the caller decides whether a partial
/// batch is acceptable. `records` follows the request order for SKU
/// fetches and name order (by SKU) for pattern fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub records: Vec<LabelRecord>,
    pub missing: Vec<String>,
}

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw row shape. Every column except the SKU is nullable in the upstream
/// schema; mapping decides which NULLs are tolerable.
#[derive(Debug, Clone, FromRow)]
struct LabelRow {
    sku: String,
    name: Option<String>,
    price_cents: Option<i64>,
    barcode: Option<String>,
    stock_qty: Option<i64>,
    size: Option<String>,
    composition: Option<String>,
    manufacturer: Option<String>,
}

/// One free-form attribute row (color, pattern, ...). Attached to the
/// matching record after the product rows are mapped.
#[derive(Debug, Clone, FromRow)]
struct AttributeRow {
    sku: String,
    name: String,
    value: String,
}

impl TryFrom<LabelRow> for LabelRecord {
    type Error = DbError;

    fn try_from(row: LabelRow) -> DbResult<LabelRecord> {
        let missing = |column: &str| DbError::Mapping {
            sku: row.sku.clone(),
            column: column.to_string(),
        };

        Ok(LabelRecord {
            name: row.name.clone().ok_or_else(|| missing("name"))?,
            price_cents: row.price_cents.ok_or_else(|| missing("price_cents"))?,
            barcode: row.barcode,
            // No stock on record prints as quantity zero, not as a failure.
            stock_qty: row.stock_qty.unwrap_or(0),
            size: row.size,
            composition: row.composition,
            manufacturer: row.manufacturer,
            attributes: Default::default(),
            sku: row.sku,
        })
    }
}

// =============================================================================
// Label Fetcher
// =============================================================================

/// Fetches label data through the connection manager.
pub struct LabelFetcher {
    manager: ConnectionManager<MySqlConnector>,
    query_timeout: Duration,
}

impl LabelFetcher {
    /// Builds a fetcher from a validated configuration. No connection is
    /// opened until the first fetch.
    pub fn new(config: &DatabaseConfig) -> DbResult<Self> {
        config.validate()?;
        Ok(LabelFetcher {
            manager: ConnectionManager::from_config(config),
            query_timeout: config.query_timeout(),
        })
    }

    /// Fetches label records for the given criteria.
    ///
    /// Request validation happens before any connection is acquired, so
    /// an empty request never touches the pool.
    pub async fn fetch(&self, criteria: &FetchCriteria) -> DbResult<FetchOutcome> {
        validate_criteria(criteria)?;

        let mut handle = self.manager.acquire().await?;
        let mut outcome = match criteria {
            FetchCriteria::Skus(skus) => {
                let requested = dedupe_preserving_order(skus);
                let mut rows = Vec::new();
                for chunk in requested.chunks(MAX_QUERY_PARAMS) {
                    rows.extend(self.select_by_skus(handle.conn(), chunk).await?);
                }
                merge_in_request_order(&requested, rows)?
            }
            FetchCriteria::NameLike(pattern) => {
                let rows = self.select_by_name(handle.conn(), pattern).await?;
                let records = rows
                    .into_iter()
                    .map(LabelRecord::try_from)
                    .collect::<DbResult<Vec<_>>>()?;
                FetchOutcome {
                    records,
                    missing: Vec::new(),
                }
            }
        };
        self.load_attributes(handle.conn(), &mut outcome.records)
            .await?;
        handle.release();

        info!(
            found = outcome.records.len(),
            missing = outcome.missing.len(),
            "label fetch complete"
        );
        Ok(outcome)
    }

    /// Probes the database with a trivial query. Used by `labelpress check`
    /// to verify the configuration end to end.
    pub async fn check_connection(&self) -> DbResult<()> {
        let mut handle = self.manager.acquire().await?;
        self.with_timeout(sqlx::query("SELECT 1").execute(handle.conn()))
            .await?;
        Ok(())
    }

    async fn select_by_skus(
        &self,
        conn: &mut MySqlConnection,
        skus: &[String],
    ) -> DbResult<Vec<LabelRow>> {
        debug!(count = skus.len(), "selecting label rows by SKU");
        let placeholders = vec!["?"; skus.len()].join(", ");
        let sql = format!("{} WHERE sku IN ({})", SELECT_COLUMNS, placeholders);

        let mut query = sqlx::query_as::<MySql, LabelRow>(&sql);
        for sku in skus {
            query = query.bind(sku);
        }

        let rows = self.with_timeout(query.fetch_all(conn)).await?;
        Ok(rows)
    }

    /// Loads free-form attributes for the fetched records and attaches
    /// them by SKU. Records without attribute rows keep an empty map.
    async fn load_attributes(
        &self,
        conn: &mut MySqlConnection,
        records: &mut [LabelRecord],
    ) -> DbResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let skus: Vec<String> = records.iter().map(|r| r.sku.clone()).collect();

        let mut rows = Vec::new();
        for chunk in skus.chunks(MAX_QUERY_PARAMS) {
            debug!(count = chunk.len(), "selecting attribute rows");
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("{} WHERE sku IN ({})", SELECT_ATTRIBUTES, placeholders);

            let mut query = sqlx::query_as::<MySql, AttributeRow>(&sql);
            for sku in chunk {
                query = query.bind(sku);
            }
            rows.extend(self.with_timeout(query.fetch_all(&mut *conn)).await?);
        }

        attach_attributes(records, rows);
        Ok(())
    }

    async fn select_by_name(
        &self,
        conn: &mut MySqlConnection,
        pattern: &str,
    ) -> DbResult<Vec<LabelRow>> {
        debug!(pattern, "selecting label rows by name");
        let sql = format!("{} WHERE name LIKE ? ORDER BY sku", SELECT_COLUMNS);
        let rows = self
            .with_timeout(
                sqlx::query_as::<MySql, LabelRow>(&sql)
                    .bind(format!("%{}%", pattern))
                    .fetch_all(conn),
            )
            .await?;
        Ok(rows)
    }

    /// A query that outlives the timeout counts as a transport failure:
    /// the server may be up but the link is not usable for this run.
    async fn with_timeout<T, E>(
        &self,
        fut: impl std::future::Future<Output = Result<T, E>>,
    ) -> DbResult<T>
    where
        DbError: From<E>,
    {
        match timeout(self.query_timeout, fut).await {
            Ok(result) => result.map_err(DbError::from),
            Err(_) => Err(DbError::Transport(format!(
                "query timed out after {} s",
                self.query_timeout.as_secs()
            ))),
        }
    }
}

// =============================================================================
// Pure Helpers
// =============================================================================

fn validate_criteria(criteria: &FetchCriteria) -> DbResult<()> {
    match criteria {
        FetchCriteria::Skus(skus) => {
            if skus.is_empty() {
                return Err(DbError::InvalidRequest("SKU list is empty".into()));
            }
            if skus.iter().any(|s| s.trim().is_empty()) {
                return Err(DbError::InvalidRequest("SKU list contains blanks".into()));
            }
        }
        FetchCriteria::NameLike(pattern) => {
            if pattern.trim().is_empty() {
                return Err(DbError::InvalidRequest("name pattern is empty".into()));
            }
        }
    }
    Ok(())
}

fn dedupe_preserving_order(skus: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    skus.iter()
        .filter(|sku| seen.insert(sku.as_str()))
        .cloned()
        .collect()
}

/// Reassembles rows into the requested order and records which SKUs the
/// database did not know.
fn merge_in_request_order(requested: &[String], rows: Vec<LabelRow>) -> DbResult<FetchOutcome> {
    let mut by_sku: HashMap<String, LabelRow> = rows
        .into_iter()
        .map(|row| (row.sku.clone(), row))
        .collect();

    let mut records = Vec::with_capacity(requested.len());
    let mut missing = Vec::new();
    for sku in requested {
        match by_sku.remove(sku) {
            Some(row) => records.push(LabelRecord::try_from(row)?),
            None => missing.push(sku.clone()),
        }
    }

    Ok(FetchOutcome { records, missing })
}

/// Inserts attribute rows into the matching records' maps. Rows for SKUs
/// not in the batch are ignored.
fn attach_attributes(records: &mut [LabelRecord], rows: Vec<AttributeRow>) {
    let index: HashMap<&str, usize> = records
        .iter()
        .enumerate()
        .map(|(i, record)| (record.sku.as_str(), i))
        .collect();

    // Two passes keep the borrow checker happy: index by &str first,
    // resolve to positions, then mutate.
    let resolved: Vec<(usize, String, String)> = rows
        .into_iter()
        .filter_map(|row| index.get(row.sku.as_str()).map(|&i| (i, row.name, row.value)))
        .collect();

    for (i, name, value) in resolved {
        records[i].attributes.insert(name, value);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
