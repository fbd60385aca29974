//! Entry point tying a connection to its grammar and processor.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::builder::Builder;
use crate::connection::{self, Connection, Row};
use crate::error::{QueryError, Result};
use crate::expression::Expression;
use crate::grammar::Grammar;
use crate::processor::{DefaultProcessor, Processor};
use crate::value::SqlValue;

/// A connection with its dialect, handing out query builders.
///
/// Clones share the connection and the transaction depth.
#[derive(Debug, Clone)]
pub struct Database {
    connection: Arc<dyn Connection>,
    grammar: Arc<dyn Grammar>,
    processor: Arc<dyn Processor>,
    transactions: Arc<AtomicUsize>,
}

impl Database {
    /// Creates a database using the [`DefaultProcessor`].
    #[must_use]
    pub fn new(connection: Arc<dyn Connection>, grammar: Arc<dyn Grammar>) -> Self {
        Self::with_processor(connection, grammar, Arc::new(DefaultProcessor))
    }

    /// Creates a database with a custom processor.
    #[must_use]
    pub fn with_processor(
        connection: Arc<dyn Connection>,
        grammar: Arc<dyn Grammar>,
        processor: Arc<dyn Processor>,
    ) -> Self {
        Self {
            connection,
            grammar,
            processor,
            transactions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns a fresh builder.
    #[must_use]
    pub fn query(&self) -> Builder {
        Builder::new(
            Arc::clone(&self.connection),
            Arc::clone(&self.grammar),
            Arc::clone(&self.processor),
        )
    }

    /// Returns a fresh builder reading from `table`.
    #[must_use]
    pub fn table(&self, table: &str) -> Builder {
        self.query().from(table)
    }

    /// Wraps literal SQL in an [`Expression`].
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn raw(&self, value: impl Into<String>) -> Expression {
        Expression::new(value)
    }

    /// Returns the connection.
    #[must_use]
    pub const fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Returns the grammar.
    #[must_use]
    pub fn grammar(&self) -> &dyn Grammar {
        self.grammar.as_ref()
    }

    /// Runs a literal SELECT and returns its rows.
    pub async fn select(&self, sql: &str, bindings: Vec<SqlValue>) -> Result<Vec<Row>> {
        let mut result =
            connection::run(self.connection.as_ref(), String::from(sql), bindings, false).await?;
        let rows = result.fetch_all_associative();
        result.free();
        Ok(rows)
    }

    /// Runs a literal statement and returns the affected row count.
    pub async fn statement(&self, sql: &str, bindings: Vec<SqlValue>) -> Result<u64> {
        let result =
            connection::run(self.connection.as_ref(), String::from(sql), bindings, false).await?;
        Ok(result.row_count())
    }

    /// Returns the number of open transactions, savepoints included.
    #[must_use]
    pub fn transaction_level(&self) -> usize {
        self.transactions.load(Ordering::SeqCst)
    }

    fn savepoint_name(level: usize) -> String {
        format!("trans{level}")
    }

    fn require_savepoints(&self, action: &str) -> Result<()> {
        if self.grammar.supports_savepoints() {
            return Ok(());
        }
        Err(QueryError::Transaction(format!(
            "{action} needs savepoints, which the {} grammar does not support",
            self.grammar.name()
        )))
    }

    /// Opens a transaction, or a savepoint inside an open one.
    ///
    /// Nesting on a grammar without savepoints is a
    /// [`QueryError::Transaction`] and leaves the level unchanged.
    pub async fn begin_transaction(&self) -> Result<()> {
        let level = self.transaction_level();
        if level == 0 {
            self.connection.begin_transaction().await?;
        } else {
            self.require_savepoints("nested begin")?;
            let sql = self
                .grammar
                .compile_savepoint(&Self::savepoint_name(level + 1));
            self.statement(&sql, Vec::new()).await?;
        }
        self.transactions.fetch_add(1, Ordering::SeqCst);
        debug!(level = level + 1, "Transaction started");
        Ok(())
    }

    /// Commits the outermost transaction. Inner levels only close their
    /// savepoint scope.
    pub async fn commit(&self) -> Result<()> {
        let level = self.transaction_level();
        if level == 0 {
            return Err(QueryError::Transaction(String::from(
                "commit without an active transaction",
            )));
        }
        if level == 1 {
            self.connection.commit().await?;
        }
        self.transactions.fetch_sub(1, Ordering::SeqCst);
        debug!(level = level - 1, "Transaction committed");
        Ok(())
    }

    /// Rolls back the current level: the whole transaction at level 1, the
    /// innermost savepoint above it.
    ///
    /// A nested rollback on a grammar without savepoints is a
    /// [`QueryError::Transaction`] and leaves the level unchanged.
    pub async fn rollback(&self) -> Result<()> {
        let level = self.transaction_level();
        if level == 0 {
            return Err(QueryError::Transaction(String::from(
                "rollback without an active transaction",
            )));
        }
        if level == 1 {
            self.connection.rollback().await?;
        } else {
            self.require_savepoints("nested rollback")?;
            let sql = self
                .grammar
                .compile_savepoint_rollback(&Self::savepoint_name(level));
            self.statement(&sql, Vec::new()).await?;
        }
        self.transactions.fetch_sub(1, Ordering::SeqCst);
        warn!(level, "Transaction rolled back");
        Ok(())
    }

    /// Runs `f` inside a transaction level, committing on success and rolling
    /// back on error.
    pub async fn transaction<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Self) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        self.begin_transaction().await?;
        match f(self.clone()).await {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(e) => {
                self.rollback().await?;
                Err(e)
            }
        }
    }
}
