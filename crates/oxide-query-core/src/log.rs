//! Query log kept by a connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::trace;

use crate::value::SqlValue;

/// One executed statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryLogEntry {
    /// The SQL sent to the connection.
    pub query: String,
    /// The values bound to its placeholders.
    pub bindings: Vec<SqlValue>,
    /// Execution time in milliseconds.
    pub time_ms: f64,
}

impl QueryLogEntry {
    /// Creates a log entry.
    #[must_use]
    pub fn new(query: impl Into<String>, bindings: Vec<SqlValue>, time_ms: f64) -> Self {
        Self {
            query: query.into(),
            bindings,
            time_ms,
        }
    }

    /// Returns the query with its placeholders substituted.
    #[must_use]
    pub fn to_parsed_sql(&self) -> String {
        parse_query(&self.query, &self.bindings)
    }
}

/// Substitutes each `?` with the next binding, for display only.
///
/// Numbers are inlined bare, text is quoted and escaped. Placeholders without
/// a matching binding are left as `?`.
#[must_use]
pub fn parse_query(query: &str, bindings: &[SqlValue]) -> String {
    let mut values = bindings.iter();
    let mut sql = String::with_capacity(query.len());
    for ch in query.chars() {
        if ch != '?' {
            sql.push(ch);
            continue;
        }
        match values.next() {
            Some(value) => sql.push_str(&value.to_sql_inline()),
            None => sql.push('?'),
        }
    }
    sql
}

/// Thread-safe query log. Disabled until [`QueryLog::enable_query_log`].
#[derive(Debug, Default)]
pub struct QueryLog {
    enabled: AtomicBool,
    entries: Mutex<Vec<QueryLogEntry>>,
}

impl QueryLog {
    /// Creates a log, optionally enabled.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            entries: Mutex::new(Vec::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<QueryLogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts recording queries.
    pub fn enable_query_log(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Stops recording queries.
    pub fn disable_query_log(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Returns whether queries are being recorded.
    #[must_use]
    pub fn logging(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Appends an entry.
    pub fn set_query_log(&self, entry: QueryLogEntry) {
        trace!(query = %entry.query, time_ms = entry.time_ms, "query logged");
        self.entries().push(entry);
    }

    /// Returns every recorded entry.
    #[must_use]
    pub fn get_query_log(&self) -> Vec<QueryLogEntry> {
        self.entries().clone()
    }

    /// Returns the most recent entry.
    #[must_use]
    pub fn get_last_query_log(&self) -> Option<QueryLogEntry> {
        self.entries().last().cloned()
    }

    /// Drops every recorded entry.
    pub fn flush_query_log(&self) {
        self.entries().clear();
    }

    /// Returns the recorded queries with their bindings substituted.
    #[must_use]
    pub fn get_parse_query_log(&self) -> Vec<String> {
        self.entries()
            .iter()
            .map(QueryLogEntry::to_parsed_sql)
            .collect()
    }
}
