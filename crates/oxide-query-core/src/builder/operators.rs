//! Operators, connectives and condition tuples.

use std::fmt;

use crate::error::BuildError;
use crate::value::{SqlValue, ToSqlValue};

/// Comparison and pattern operators accepted in conditions.
pub const OPERATORS: &[&str] = &[
    "=",
    "<",
    ">",
    "<=",
    ">=",
    "<>",
    "!=",
    "<=>",
    "like",
    "like binary",
    "not like",
    "ilike",
    "not ilike",
    "&",
    "|",
    "^",
    "<<",
    ">>",
    "&~",
    "is",
    "is not",
    "rlike",
    "not rlike",
    "regexp",
    "not regexp",
    "~",
    "~*",
    "!~",
    "!~*",
    "similar to",
    "not similar to",
];

/// Returns true unless `operator` is a known SQL operator (any case).
#[must_use]
pub fn invalid_operator(operator: &str) -> bool {
    let operator = operator.trim().to_lowercase();
    !OPERATORS.contains(&operator.as_str())
}

/// Returns true when a NULL value is compared with anything but `=`, `<>`
/// or `!=`.
#[must_use]
pub fn invalid_operator_and_value(operator: &str, value: &SqlValue) -> bool {
    value.is_null() && !matches!(operator.trim(), "=" | "<>" | "!=")
}

/// Normalizes a value/operator pair.
///
/// With `use_default` (or no operator at all) the operator defaults to `=`.
/// Otherwise the operator must be known, and NULL may only be compared for
/// (in)equality.
pub fn prepare_value_and_operator(
    value: SqlValue,
    operator: Option<&str>,
    use_default: bool,
) -> Result<(SqlValue, String), BuildError> {
    let operator = match operator {
        Some(op) if !use_default => op.trim(),
        _ => return Ok((value, String::from("="))),
    };
    if invalid_operator(operator) {
        return Err(BuildError::InvalidOperator(String::from(operator)));
    }
    if invalid_operator_and_value(operator, &value) {
        return Err(BuildError::IllegalOperatorAndValue {
            operator: String::from(operator),
        });
    }
    Ok((value, String::from(operator)))
}

/// Connective placed in front of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Boolean {
    /// `AND`
    #[default]
    And,
    /// `OR`
    Or,
}

impl Boolean {
    /// Returns the upper-case keyword used by structured conditions.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    /// Returns the lower-case keyword used in front of raw conditions.
    #[must_use]
    pub const fn raw_prefix(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

impl fmt::Display for Boolean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending order (ASC)
    #[default]
    Asc,
    /// Descending order (DESC)
    Desc,
}

impl Direction {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Parses `asc`/`desc` in any case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One condition of a batch call such as
/// [`Builder::where_many`](super::Builder::where_many).
///
/// Built from `(column, value)` (operator `=`) or `(column, operator, value)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Column path.
    pub column: String,
    /// Comparison operator, `=` when absent.
    pub operator: Option<String>,
    /// Compared value.
    pub value: SqlValue,
}

impl Condition {
    /// Creates a condition with an explicit operator.
    #[must_use]
    pub fn new<V: ToSqlValue>(column: impl Into<String>, operator: &str, value: V) -> Self {
        Self {
            column: column.into(),
            operator: Some(String::from(operator)),
            value: value.to_sql_value(),
        }
    }

    /// Creates an equality condition.
    #[must_use]
    pub fn eq<V: ToSqlValue>(column: impl Into<String>, value: V) -> Self {
        Self {
            column: column.into(),
            operator: None,
            value: value.to_sql_value(),
        }
    }

    pub(crate) fn prepare(self) -> Result<(String, String, SqlValue), BuildError> {
        let use_default = self.operator.is_none();
        let (value, operator) =
            prepare_value_and_operator(self.value, self.operator.as_deref(), use_default)?;
        Ok((self.column, operator, value))
    }
}

impl<C: Into<String>, V: ToSqlValue> From<(C, V)> for Condition {
    fn from((column, value): (C, V)) -> Self {
        Self::eq(column, value)
    }
}

impl<C: Into<String>, V: ToSqlValue> From<(C, &str, V)> for Condition {
    fn from((column, operator, value): (C, &str, V)) -> Self {
        Self::new(column, operator, value)
    }
}
