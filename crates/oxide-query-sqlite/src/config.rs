//! Connection settings.

use serde::Deserialize;

/// Settings for [`SqliteConnection::connect`](crate::SqliteConnection::connect).
///
/// Every field has a default, so a partial document deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// sqlx connection URL, `sqlite::memory:` by default.
    pub url: String,
    /// Name reported as the connection's database, used to prefix
    /// sub-selects that target another database.
    pub database: Option<String>,
    /// Creates the database file when it does not exist.
    pub create_if_missing: bool,
    /// Starts with the query log enabled.
    pub log_queries: bool,
    /// Dumps bound parameters of every statement through `tracing`.
    pub debug_statements: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            url: String::from("sqlite::memory:"),
            database: None,
            create_if_missing: true,
            log_queries: false,
            debug_statements: false,
        }
    }
}

impl SqliteConfig {
    /// Creates a configuration for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Creates a configuration for a private in-memory database.
    #[must_use]
    pub fn memory() -> Self {
        Self::default()
    }
}
