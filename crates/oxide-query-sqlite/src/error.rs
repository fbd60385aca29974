//! Error types for the SQLite adapter.

use oxide_query_core::QueryError;

/// Errors raised while opening a connection.
#[derive(Debug, thiserror::Error)]
pub enum SqliteError {
    /// The connection URL could not be parsed.
    #[error("Invalid connection URL '{url}': {source}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// The parse error.
        source: sqlx::Error,
    },

    /// Database error while connecting.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<SqliteError> for QueryError {
    fn from(error: SqliteError) -> Self {
        Self::database(error)
    }
}

/// Result type for adapter setup.
pub type Result<T> = std::result::Result<T, SqliteError>;
