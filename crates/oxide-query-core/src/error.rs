//! Error types for query building and execution.

use thiserror::Error;

/// Errors raised while a query is being built.
///
/// Fluent methods cannot return a `Result` without breaking the chain, so a
/// builder records the first `BuildError` it hits and every terminal call
/// returns it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A sub-query argument had an unusable shape.
    #[error("invalid subquery type: expected a query builder instance, a closure, or a string ({0})")]
    InvalidSubquery(String),

    /// A NULL value was compared with something other than `=`, `<>` or `!=`.
    #[error("illegal operator and value combination: `{operator}` cannot be used with NULL")]
    IllegalOperatorAndValue {
        /// The rejected operator.
        operator: String,
    },

    /// The comparison operator is not a known SQL operator.
    #[error("illegal operator: `{0}`")]
    InvalidOperator(String),

    /// The call has no implementation for the active grammar.
    #[error("method `{method}` not found for the {grammar} grammar")]
    MethodNotFound {
        /// Name of the builder method.
        method: String,
        /// Name of the grammar.
        grammar: String,
    },

    /// An argument was missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Errors returned by terminal builder calls.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The query could not be built.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// The result was empty and the builder was told to fail on empty results.
    #[error("{0}")]
    NotFound(String),

    /// Commit or rollback without an open transaction.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Error reported by the connection, passed through untouched.
    #[error("database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl QueryError {
    /// Wraps an error raised by a connection adapter.
    #[must_use]
    pub fn database<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Database(Box::new(error))
    }

    /// Returns the build error, if this is one.
    #[must_use]
    pub const fn as_build(&self) -> Option<&BuildError> {
        match self {
            Self::Build(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
