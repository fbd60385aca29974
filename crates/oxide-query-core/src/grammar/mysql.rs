//! MySQL grammar.

use super::Grammar;

/// MySQL dialect: backtick quoting, `FOR UPDATE` / `LOCK IN SHARE MODE`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlGrammar;

impl MySqlGrammar {
    /// Creates a new MySQL grammar.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Grammar for MySqlGrammar {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn lock_for_update(&self) -> Option<&'static str> {
        Some("FOR UPDATE")
    }

    fn shared_lock(&self) -> Option<&'static str> {
        Some("LOCK IN SHARE MODE")
    }
}
