//! SQLite grammar.

use oxide_query_core::Grammar;

/// SQLite grammar.
///
/// Identifiers are double-quoted. SQLite has no row-level locks, so both lock
/// hooks return `None` and the builder records a method-not-found error.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteGrammar;

impl SqliteGrammar {
    /// Creates a new SQLite grammar.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Grammar for SqliteGrammar {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn identifier_quote(&self) -> char {
        '"' // SQLite also accepts backticks, but double quotes are standard
    }

    fn lock_for_update(&self) -> Option<&'static str> {
        None
    }

    fn shared_lock(&self) -> Option<&'static str> {
        None
    }
}
