//! Shared helpers for integration tests: a connection that records every
//! statement and replays scripted results.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use oxide_query_core::{
    Connection, Database, MySqlGrammar, QueryLog, ResultSet, Row, SqlValue, Statement,
};

/// A statement as it reached the connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub sql: String,
    pub bindings: Vec<SqlValue>,
    pub debug: bool,
}

#[derive(Debug, Default)]
struct Shared {
    executed: Mutex<Vec<Executed>>,
    results: Mutex<VecDeque<ResultSet>>,
    events: Mutex<Vec<&'static str>>,
}

impl Shared {
    fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Default)]
pub struct RecordingConnection {
    shared: Arc<Shared>,
    in_transaction: AtomicBool,
    last_insert_id: Mutex<Option<SqlValue>>,
    database: Option<String>,
    log: QueryLog,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_database(database: &str) -> Self {
        Self {
            database: Some(String::from(database)),
            ..Self::default()
        }
    }

    /// Queues the result returned by the next executed statement.
    pub fn push_result(&self, result: ResultSet) {
        Shared::lock(&self.shared.results).push_back(result);
    }

    /// Queues a result holding `rows`.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.push_result(ResultSet::from_rows(rows));
    }

    /// Queues a single-value result, as aggregate queries return.
    pub fn push_scalar(&self, column: &str, value: SqlValue) {
        self.push_rows(vec![row(&[(column, value)])]);
    }

    pub fn set_last_insert_id(&self, id: SqlValue) {
        *Shared::lock(&self.last_insert_id) = Some(id);
    }

    pub fn executed(&self) -> Vec<Executed> {
        Shared::lock(&self.shared.executed).clone()
    }

    pub fn last(&self) -> Executed {
        self.executed()
            .pop()
            .unwrap_or_else(|| panic!("no statement executed"))
    }

    pub fn sqls(&self) -> Vec<String> {
        self.executed().into_iter().map(|e| e.sql).collect()
    }

    pub fn events(&self) -> Vec<&'static str> {
        Shared::lock(&self.shared.events).clone()
    }
}

struct RecordingStatement {
    sql: String,
    bindings: Vec<SqlValue>,
    debug: bool,
    shared: Arc<Shared>,
}

impl Statement for RecordingStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn bind_params(&mut self, values: Vec<SqlValue>) {
        self.bindings = values;
    }

    fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    fn execute(self: Box<Self>) -> BoxFuture<'static, oxide_query_core::Result<ResultSet>> {
        Box::pin(async move {
            Shared::lock(&self.shared.executed).push(Executed {
                sql: self.sql.clone(),
                bindings: self.bindings.clone(),
                debug: self.debug,
            });
            let result = Shared::lock(&self.shared.results).pop_front();
            Ok(result.unwrap_or_default())
        })
    }
}

impl Connection for RecordingConnection {
    fn prepare(&self, sql: &str) -> oxide_query_core::Result<Box<dyn Statement>> {
        Ok(Box::new(RecordingStatement {
            sql: String::from(sql),
            bindings: Vec::new(),
            debug: false,
            shared: Arc::clone(&self.shared),
        }))
    }

    fn begin_transaction(&self) -> BoxFuture<'_, oxide_query_core::Result<()>> {
        Box::pin(async move {
            self.in_transaction.store(true, Ordering::SeqCst);
            Shared::lock(&self.shared.events).push("BEGIN");
            Ok(())
        })
    }

    fn commit(&self) -> BoxFuture<'_, oxide_query_core::Result<()>> {
        Box::pin(async move {
            self.in_transaction.store(false, Ordering::SeqCst);
            Shared::lock(&self.shared.events).push("COMMIT");
            Ok(())
        })
    }

    fn rollback(&self) -> BoxFuture<'_, oxide_query_core::Result<()>> {
        Box::pin(async move {
            self.in_transaction.store(false, Ordering::SeqCst);
            Shared::lock(&self.shared.events).push("ROLLBACK");
            Ok(())
        })
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction.load(Ordering::SeqCst)
    }

    fn last_insert_id(&self, _sequence: Option<&str>) -> oxide_query_core::Result<SqlValue> {
        Ok(Shared::lock(&self.last_insert_id)
            .clone()
            .unwrap_or(SqlValue::Int(0)))
    }

    fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn query_log(&self) -> &QueryLog {
        &self.log
    }
}

/// Builds a row from column/value pairs.
pub fn row(columns: &[(&str, SqlValue)]) -> Row {
    columns
        .iter()
        .map(|(name, value)| (*name, value.clone()))
        .collect()
}

pub fn text(value: &str) -> SqlValue {
    SqlValue::Text(String::from(value))
}

/// A MySQL database over a fresh recording connection.
pub fn setup() -> (Database, Arc<RecordingConnection>) {
    let connection = Arc::new(RecordingConnection::new());
    let db = Database::new(
        Arc::clone(&connection) as Arc<dyn Connection>,
        Arc::new(MySqlGrammar),
    );
    (db, connection)
}
