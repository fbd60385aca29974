//! Connection capability consumed by builders.
//!
//! Adapters (see `oxide-query-sqlite`) implement [`Connection`] and
//! [`Statement`]; the builder only ever talks to these traits. Async members
//! return boxed futures so the traits stay object safe and a builder can hold
//! an `Arc<dyn Connection>`.

use std::fmt;
use std::time::Instant;

use futures::future::BoxFuture;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use crate::error::Result;
use crate::log::{QueryLog, QueryLogEntry};
use crate::value::SqlValue;

/// A fetched row: column names with their values, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Appends a column.
    pub fn push(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.push((column.into(), value));
    }

    /// Returns the value of a column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Returns the value at a position.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&SqlValue> {
        self.columns.get(index).map(|(_, value)| value)
    }

    /// Returns the column names.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the values in column order.
    #[must_use]
    pub fn values(&self) -> Vec<SqlValue> {
        self.columns.iter().map(|(_, value)| value.clone()).collect()
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true when the row has no column.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Consumes the row into its column/value pairs.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(String, SqlValue)> {
        self.columns
    }
}

impl<K: Into<String>> FromIterator<(K, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, SqlValue)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Shape of a fetched row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Column name to value.
    #[default]
    Associative,
    /// Values only, in column order.
    Numeric,
}

/// A row fetched in a given [`FetchMode`].
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// Associative row.
    Associative(Row),
    /// Positional values.
    Numeric(Vec<SqlValue>),
}

/// Materialized outcome of one statement.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    rows: Vec<Row>,
    cursor: usize,
    rows_affected: u64,
    last_insert_id: Option<SqlValue>,
}

impl ResultSet {
    /// Creates a result holding fetched rows.
    #[must_use]
    pub const fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            cursor: 0,
            rows_affected: 0,
            last_insert_id: None,
        }
    }

    /// Creates a result for a statement that returned no rows.
    #[must_use]
    pub const fn affected(rows_affected: u64) -> Self {
        Self {
            rows: Vec::new(),
            cursor: 0,
            rows_affected,
            last_insert_id: None,
        }
    }

    /// Records the id generated by the statement.
    #[must_use]
    pub fn with_last_insert_id(mut self, id: SqlValue) -> Self {
        self.last_insert_id = Some(id);
        self
    }

    /// Returns the id generated by the statement, if the adapter reported one.
    #[must_use]
    pub const fn last_insert_id(&self) -> Option<&SqlValue> {
        self.last_insert_id.as_ref()
    }

    /// Fetches the next row, advancing the cursor.
    pub fn fetch(&mut self, mode: FetchMode) -> Option<Fetched> {
        let row = self.rows.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(match mode {
            FetchMode::Associative => Fetched::Associative(row),
            FetchMode::Numeric => Fetched::Numeric(row.values()),
        })
    }

    /// Fetches every remaining row.
    pub fn fetch_all(&mut self, mode: FetchMode) -> Vec<Fetched> {
        std::iter::from_fn(|| self.fetch(mode)).collect()
    }

    /// Fetches the next row as an associative row.
    pub fn fetch_first(&mut self) -> Option<Row> {
        match self.fetch(FetchMode::Associative)? {
            Fetched::Associative(row) => Some(row),
            Fetched::Numeric(_) => None,
        }
    }

    /// Fetches every remaining row as associative rows.
    pub fn fetch_all_associative(&mut self) -> Vec<Row> {
        let rows = self.rows.split_off(self.cursor.min(self.rows.len()));
        self.cursor = self.rows.len();
        rows
    }

    /// Fetches the first column of every remaining row.
    pub fn fetch_first_column(&mut self) -> Vec<SqlValue> {
        self.fetch_all_associative()
            .into_iter()
            .filter_map(|row| row.get_index(0).cloned())
            .collect()
    }

    /// Returns the affected rows, or the fetched row count for queries.
    #[must_use]
    pub fn row_count(&self) -> u64 {
        if self.rows_affected > 0 || self.rows.is_empty() {
            self.rows_affected
        } else {
            self.rows.len() as u64
        }
    }

    /// Returns the number of columns in the result.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Row::len)
    }

    /// Releases the fetched rows.
    pub fn free(&mut self) {
        self.rows = Vec::new();
        self.cursor = 0;
    }
}

/// A prepared statement.
pub trait Statement: Send {
    /// Returns the statement SQL.
    fn sql(&self) -> &str;

    /// Binds the values for the placeholders, in order.
    fn bind_params(&mut self, values: Vec<SqlValue>);

    /// Dumps the bound parameters through `tracing` before execution.
    fn set_debug(&mut self, debug: bool);

    /// Executes the statement.
    fn execute(self: Box<Self>) -> BoxFuture<'static, Result<ResultSet>>;
}

/// A database connection.
pub trait Connection: fmt::Debug + Send + Sync {
    /// Prepares a statement.
    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>>;

    /// Prepares, binds and executes in one call.
    fn exec(&self, sql: &str, bindings: Vec<SqlValue>) -> BoxFuture<'_, Result<ResultSet>> {
        let prepared = self.prepare(sql);
        Box::pin(async move {
            let mut statement = prepared?;
            statement.bind_params(bindings);
            statement.execute().await
        })
    }

    /// Starts a transaction.
    fn begin_transaction(&self) -> BoxFuture<'_, Result<()>>;

    /// Commits the active transaction.
    fn commit(&self) -> BoxFuture<'_, Result<()>>;

    /// Rolls back the active transaction.
    fn rollback(&self) -> BoxFuture<'_, Result<()>>;

    /// Returns whether a transaction is active.
    fn in_transaction(&self) -> bool;

    /// Returns the id generated by the last insert, optionally for a named
    /// sequence on drivers that need one.
    fn last_insert_id(&self, sequence: Option<&str>) -> Result<SqlValue>;

    /// Returns the configured database name.
    fn database(&self) -> Option<&str>;

    /// Returns the query log.
    fn query_log(&self) -> &QueryLog;
}

/// Prepares, binds and executes `sql`, recording it in the connection's
/// query log when logging is enabled.
pub(crate) async fn run(
    connection: &dyn Connection,
    sql: String,
    bindings: Vec<SqlValue>,
    debug_statement: bool,
) -> Result<ResultSet> {
    debug!(sql = %sql, bindings = ?bindings, "Executing query");
    let started = Instant::now();

    let mut statement = connection.prepare(&sql)?;
    statement.set_debug(debug_statement);
    statement.bind_params(bindings.clone());
    let result = statement.execute().await?;

    let log = connection.query_log();
    if log.logging() {
        let time_ms = started.elapsed().as_secs_f64() * 1000.0;
        log.set_query_log(QueryLogEntry::new(sql, bindings, time_ms));
    }
    Ok(result)
}
