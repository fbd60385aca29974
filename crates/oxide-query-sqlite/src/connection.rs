//! sqlx-backed connection.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use oxide_query_core::{
    Connection, Database, QueryError, QueryLog, ResultSet, Row, SqlValue, Statement,
};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteRow};
use sqlx::{Column, ConnectOptions, Row as _, Sqlite, TypeInfo, ValueRef};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::SqliteConfig;
use crate::error::{Result, SqliteError};
use crate::grammar::SqliteGrammar;

type Query<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// State shared by the connection and the statements it prepares.
#[derive(Debug)]
struct Session {
    conn: Mutex<sqlx::SqliteConnection>,
    last_insert_id: AtomicI64,
}

/// One SQLite session.
///
/// Statements run one at a time on the same underlying connection, so
/// transactions and the last insert id are observed consistently.
#[derive(Debug)]
pub struct SqliteConnection {
    session: Arc<Session>,
    in_transaction: AtomicBool,
    database: Option<String>,
    debug_statements: bool,
    log: QueryLog,
}

impl SqliteConnection {
    /// Opens a connection.
    pub async fn connect(config: &SqliteConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|source| SqliteError::InvalidUrl {
                url: config.url.clone(),
                source,
            })?
            .create_if_missing(config.create_if_missing);
        let conn = options.connect().await?;
        info!(url = %config.url, "SQLite connection opened");

        Ok(Self {
            session: Arc::new(Session {
                conn: Mutex::new(conn),
                last_insert_id: AtomicI64::new(0),
            }),
            in_transaction: AtomicBool::new(false),
            database: config.database.clone(),
            debug_statements: config.debug_statements,
            log: QueryLog::new(config.log_queries),
        })
    }

    /// Opens a connection and wires it to the SQLite grammar.
    pub async fn database(config: &SqliteConfig) -> Result<Database> {
        let connection = Self::connect(config).await?;
        Ok(Database::new(Arc::new(connection), Arc::new(SqliteGrammar)))
    }

    async fn run_control(&self, sql: &'static str) -> oxide_query_core::Result<()> {
        let mut conn = self.session.conn.lock().await;
        sqlx::query(sql)
            .execute(&mut *conn)
            .await
            .map_err(QueryError::database)?;
        Ok(())
    }
}

impl Connection for SqliteConnection {
    fn prepare(&self, sql: &str) -> oxide_query_core::Result<Box<dyn Statement>> {
        Ok(Box::new(SqliteStatement {
            sql: String::from(sql),
            bindings: Vec::new(),
            debug: self.debug_statements,
            session: Arc::clone(&self.session),
        }))
    }

    fn begin_transaction(&self) -> BoxFuture<'_, oxide_query_core::Result<()>> {
        Box::pin(async move {
            self.run_control("BEGIN").await?;
            self.in_transaction.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn commit(&self) -> BoxFuture<'_, oxide_query_core::Result<()>> {
        Box::pin(async move {
            self.run_control("COMMIT").await?;
            self.in_transaction.store(false, Ordering::SeqCst);
            Ok(())
        })
    }

    fn rollback(&self) -> BoxFuture<'_, oxide_query_core::Result<()>> {
        Box::pin(async move {
            self.run_control("ROLLBACK").await?;
            self.in_transaction.store(false, Ordering::SeqCst);
            Ok(())
        })
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction.load(Ordering::SeqCst)
    }

    fn last_insert_id(&self, _sequence: Option<&str>) -> oxide_query_core::Result<SqlValue> {
        Ok(SqlValue::Int(
            self.session.last_insert_id.load(Ordering::SeqCst),
        ))
    }

    fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn query_log(&self) -> &QueryLog {
        &self.log
    }
}

/// A statement bound to its session.
struct SqliteStatement {
    sql: String,
    bindings: Vec<SqlValue>,
    debug: bool,
    session: Arc<Session>,
}

impl Statement for SqliteStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn bind_params(&mut self, values: Vec<SqlValue>) {
        self.bindings = values;
    }

    fn set_debug(&mut self, debug: bool) {
        self.debug = self.debug || debug;
    }

    fn execute(self: Box<Self>) -> BoxFuture<'static, oxide_query_core::Result<ResultSet>> {
        Box::pin(async move {
            if self.debug {
                debug!(sql = %self.sql, params = ?self.bindings, "Statement parameters");
            }
            let yields_rows = returns_rows(&self.sql);
            let Self {
                sql,
                bindings,
                session,
                ..
            } = *self;

            let query = bindings.into_iter().fold(sqlx::query(&sql), bind_param);
            let mut conn = session.conn.lock().await;
            if yields_rows {
                let rows = query
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(QueryError::database)?;
                let rows = rows.iter().map(decode_row).collect::<Result<Vec<_>>>()?;
                return Ok(ResultSet::from_rows(rows));
            }

            let done = query
                .execute(&mut *conn)
                .await
                .map_err(QueryError::database)?;
            let id = done.last_insert_rowid();
            session.last_insert_id.store(id, Ordering::SeqCst);
            Ok(ResultSet::affected(done.rows_affected()).with_last_insert_id(SqlValue::Int(id)))
        })
    }
}

/// Returns true when `sql` yields rows.
fn returns_rows(sql: &str) -> bool {
    let head = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        head.as_str(),
        "SELECT" | "WITH" | "PRAGMA" | "VALUES" | "EXPLAIN"
    ) || sql.to_ascii_uppercase().contains(" RETURNING ")
}

/// Binds a `SqlValue` parameter to a query.
fn bind_param(query: Query<'_>, value: SqlValue) -> Query<'_> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
    }
}

/// Decodes a row by the storage class of each value.
fn decode_row(row: &SqliteRow) -> Result<Row> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "INT8" | "BIGINT" => SqlValue::Int(row.try_get_unchecked(index)?),
                "BOOLEAN" => SqlValue::Bool(row.try_get_unchecked(index)?),
                "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
                    SqlValue::Float(row.try_get_unchecked(index)?)
                }
                "BLOB" => SqlValue::Blob(row.try_get_unchecked(index)?),
                _ => SqlValue::Text(row.try_get_unchecked(index)?),
            }
        };
        decoded.push(column.name(), value);
    }
    Ok(decoded)
}
