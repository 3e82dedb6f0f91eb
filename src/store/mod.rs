//! Store Module
//!
//! The backing relational store consumed by the sequence layer.
//!
//! ## Responsibilities
//! - Execute statements and queries with bound parameters
//! - Run a locking read and a write inside one transaction
//! - Answer "does this table exist" in the backend's own dialect
//!
//! ## Persisted Layout
//! ```text
//!   atlasid_catalog (k VARCHAR(255) PRIMARY KEY)   one row per known key
//!   seq_<key>       (id BIGINT PRIMARY KEY)        one counter row per key
//! ```
//!
//! Identifiers are only ever built from a validated
//! [`SequenceKey`](crate::sequence::SequenceKey); values are always bound
//! as parameters.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::{AtlasError, Result};

/// A single column value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Text(String),
}

impl SqlValue {
    /// Integer payload, or a store error naming what was found instead
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            SqlValue::Integer(n) => Ok(*n),
            other => Err(AtlasError::Store(format!(
                "expected integer column, got {:?}",
                other
            ))),
        }
    }

    /// Text payload, or a store error naming what was found instead
    pub fn as_str(&self) -> Result<&str> {
        match self {
            SqlValue::Text(s) => Ok(s),
            other => Err(AtlasError::Store(format!(
                "expected text column, got {:?}",
                other
            ))),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Integer(n)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

/// A result row
pub type Row = Vec<SqlValue>;

/// A transactional, SQL-capable backing store
///
/// Implementations must be safe to share between connection threads.
pub trait Store: Send + Sync {
    /// Execute a statement, returning the number of affected rows
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize>;

    /// Run a query and collect all rows
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Begin a transaction on a single session
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>>;

    /// Suffix that turns a `SELECT` into a locking read inside a transaction
    /// (`" FOR UPDATE"` on MySQL/PostgreSQL)
    fn locking_read_suffix(&self) -> &'static str;

    /// Whether a table with this exact name exists
    fn table_exists(&self, table: &str) -> Result<bool>;
}

/// An open transaction
///
/// Dropping a transaction without calling [`commit`](Self::commit) rolls it
/// back.
pub trait StoreTransaction {
    /// Execute a statement inside the transaction
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<usize>;

    /// Run a query inside the transaction
    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Commit and end the transaction
    fn commit(self: Box<Self>) -> Result<()>;
}
