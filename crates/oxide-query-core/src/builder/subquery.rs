//! Sub-query sources accepted by the fluent API.

use std::fmt;

use super::Builder;
use crate::expression::Expression;

/// Anything that can stand in for a sub-query.
///
/// Every variant resolves through [`Builder::parse_sub`] into SQL text and
/// its bindings.
pub enum Subquery {
    /// Raw SQL text.
    Text(String),
    /// A literal expression, with its bound value if it carries one.
    Raw(Expression),
    /// A fully built query.
    Query(Box<Builder>),
    /// A closure that receives a fresh builder wired to the same connection.
    Closure(Box<dyn FnOnce(Builder) -> Builder + Send>),
}

/// Wraps a closure as a [`Subquery`].
///
/// ```ignore
/// db.table("users").where_in_sub("id", sub(|q| q.from("admins").select(["user_id"])));
/// ```
pub fn sub<F>(f: F) -> Subquery
where
    F: FnOnce(Builder) -> Builder + Send + 'static,
{
    Subquery::Closure(Box::new(f))
}

impl fmt::Debug for Subquery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Raw(e) => f.debug_tuple("Raw").field(e).finish(),
            Self::Query(b) => f.debug_tuple("Query").field(b).finish(),
            Self::Closure(_) => f.write_str("Closure(..)"),
        }
    }
}

impl From<&str> for Subquery {
    fn from(value: &str) -> Self {
        Self::Text(String::from(value))
    }
}

impl From<String> for Subquery {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Expression> for Subquery {
    fn from(value: Expression) -> Self {
        Self::Raw(value)
    }
}

impl From<Builder> for Subquery {
    fn from(value: Builder) -> Self {
        Self::Query(Box::new(value))
    }
}

/// The left-hand side of a condition: a column or a sub-query.
#[derive(Debug)]
pub enum Operand {
    /// A column path, quoted by the grammar.
    Column(String),
    /// A sub-query or literal expression.
    Sub(Subquery),
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Self::Column(String::from(value))
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Self::Column(value)
    }
}

impl From<&String> for Operand {
    fn from(value: &String) -> Self {
        Self::Column(value.clone())
    }
}

impl From<Expression> for Operand {
    fn from(value: Expression) -> Self {
        Self::Sub(Subquery::Raw(value))
    }
}

impl From<Builder> for Operand {
    fn from(value: Builder) -> Self {
        Self::Sub(Subquery::from(value))
    }
}

impl From<Subquery> for Operand {
    fn from(value: Subquery) -> Self {
        Self::Sub(value)
    }
}
