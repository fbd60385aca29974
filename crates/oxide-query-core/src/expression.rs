//! Raw SQL expressions.

use std::fmt;

use crate::value::{SqlValue, ToSqlValue};

/// A piece of SQL that is inlined verbatim, never quoted or escaped.
///
/// An expression may carry one bound value for a `?` inside its text. The
/// owning clause is responsible for pushing that value to its bindings.
///
/// Two expressions are equal when their text is equal; the bound value does
/// not take part in the comparison.
#[derive(Debug, Clone)]
pub struct Expression {
    value: String,
    bind_value: Option<SqlValue>,
}

impl Expression {
    /// Creates an expression without a bound value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            bind_value: None,
        }
    }

    /// Creates an expression whose text holds one `?` for `bind_value`.
    #[must_use]
    pub fn with_binding<T: ToSqlValue>(value: impl Into<String>, bind_value: T) -> Self {
        Self {
            value: value.into(),
            bind_value: Some(bind_value.to_sql_value()),
        }
    }

    /// Returns the SQL text.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the bound value, if any.
    #[must_use]
    pub const fn bind_value(&self) -> Option<&SqlValue> {
        self.bind_value.as_ref()
    }

    /// Splits the expression into its text and bound value.
    #[must_use]
    pub fn into_parts(self) -> (String, Option<SqlValue>) {
        (self.value, self.bind_value)
    }
}

/// Shorthand for [`Expression::new`].
#[must_use]
pub fn raw(value: impl Into<String>) -> Expression {
    Expression::new(value)
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Expression {}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Expression {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_display() {
        let expr = raw("COUNT(*)");
        assert_eq!(expr.to_string(), "COUNT(*)");
        assert_eq!(expr.value(), "COUNT(*)");
        assert!(expr.bind_value().is_none());
    }

    #[test]
    fn test_equality_ignores_binding() {
        let a = Expression::with_binding("`votes` = `votes` + ?", 1);
        let b = Expression::with_binding("`votes` = `votes` + ?", 5);
        assert_eq!(a, b);
        assert_ne!(a, raw("`votes` = `votes` - ?"));
    }

    #[test]
    fn test_into_parts() {
        let (text, value) = Expression::with_binding("? + 1", "x").into_parts();
        assert_eq!(text, "? + 1");
        assert_eq!(value, Some(SqlValue::Text(String::from("x"))));
    }
}
