//! Column/value records for INSERT and UPDATE.

use super::{Builder, Subquery};
use crate::expression::Expression;
use crate::value::{SqlValue, ToSqlValue};

/// The value side of a column assignment.
#[derive(Debug)]
pub enum Assignment {
    /// A bound value.
    Value(SqlValue),
    /// Literal SQL.
    ///
    /// The expression is the value of its column in both INSERT and UPDATE
    /// (`` `votes` = `votes` + ? `` from the expression `` `votes` + ? ``).
    Raw(Expression),
    /// A sub-select whose result is assigned.
    Sub(Subquery),
}

impl<T: ToSqlValue> From<T> for Assignment {
    fn from(value: T) -> Self {
        Self::Value(value.to_sql_value())
    }
}

impl From<Expression> for Assignment {
    fn from(value: Expression) -> Self {
        Self::Raw(value)
    }
}

impl From<Subquery> for Assignment {
    fn from(value: Subquery) -> Self {
        Self::Sub(value)
    }
}

impl From<Builder> for Assignment {
    fn from(value: Builder) -> Self {
        Self::Sub(Subquery::from(value))
    }
}

/// An ordered list of column assignments.
///
/// ```ignore
/// let user = Record::new().set("name", "Ada").set("age", 36);
/// let same = Record::from([("name", "Ada")]);
/// ```
#[derive(Debug, Default)]
pub struct Record {
    entries: Vec<(String, Assignment)>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Sets a column, replacing an earlier assignment to the same column.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Assignment>) -> Self {
        self.push(column, value);
        self
    }

    /// Sets a column in place.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Assignment>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    /// Returns the assignment of a column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Assignment> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Returns the column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no column is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends the assignments of `other`; its columns win on conflict.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        for (column, value) in other.entries {
            self.push(column, value);
        }
        self
    }

    pub(crate) fn take(&mut self, column: &str) -> Option<Assignment> {
        let index = self.entries.iter().position(|(name, _)| name == column)?;
        Some(self.entries.remove(index).1)
    }

    pub(crate) fn into_entries(self) -> Vec<(String, Assignment)> {
        self.entries
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Assignment>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (column, value) in iter {
            record.push(column, value);
        }
        record
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Record
where
    K: Into<String>,
    V: Into<Assignment>,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}
