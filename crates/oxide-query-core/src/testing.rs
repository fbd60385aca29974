//! In-crate test doubles.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::builder::Builder;
use crate::connection::{Connection, ResultSet, Statement};
use crate::error::Result;
use crate::grammar::MySqlGrammar;
use crate::log::QueryLog;
use crate::processor::DefaultProcessor;
use crate::value::SqlValue;

#[derive(Debug, Default)]
pub struct NullConnection {
    database: Option<String>,
    log: QueryLog,
}

impl NullConnection {
    pub fn named(database: &str) -> Self {
        Self {
            database: Some(String::from(database)),
            log: QueryLog::default(),
        }
    }
}

struct NullStatement(String);

impl Statement for NullStatement {
    fn sql(&self) -> &str {
        &self.0
    }

    fn bind_params(&mut self, _values: Vec<SqlValue>) {}

    fn set_debug(&mut self, _debug: bool) {}

    fn execute(self: Box<Self>) -> BoxFuture<'static, Result<ResultSet>> {
        Box::pin(async { Ok(ResultSet::default()) })
    }
}

impl Connection for NullConnection {
    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>> {
        Ok(Box::new(NullStatement(String::from(sql))))
    }

    fn begin_transaction(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn commit(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn rollback(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn in_transaction(&self) -> bool {
        false
    }

    fn last_insert_id(&self, _sequence: Option<&str>) -> Result<SqlValue> {
        Ok(SqlValue::Int(0))
    }

    fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn query_log(&self) -> &QueryLog {
        &self.log
    }
}

fn wired(connection: NullConnection) -> Builder {
    Builder::new(
        Arc::new(connection),
        Arc::new(MySqlGrammar),
        Arc::new(DefaultProcessor),
    )
}

/// A MySQL builder over a connection that executes nothing.
pub fn builder() -> Builder {
    wired(NullConnection::default())
}

/// Like [`builder`], with the connection bound to `database`.
pub fn builder_on(database: &str) -> Builder {
    wired(NullConnection::named(database))
}
