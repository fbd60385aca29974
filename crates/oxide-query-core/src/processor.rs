//! Post-processing of statement results.

use std::fmt;

use futures::future::BoxFuture;
use serde::Serialize;

use crate::builder::{Builder, Record};
use crate::error::Result;
use crate::value::SqlValue;

/// Identifier generated by an insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InsertId {
    /// Integer key, the common case.
    Int(i64),
    /// Non-numeric key such as a UUID sequence value.
    Text(String),
}

impl From<SqlValue> for InsertId {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Self::Int(0),
            SqlValue::Text(text) => text
                .trim()
                .parse()
                .map_or_else(|_| Self::Text(text), Self::Int),
            other => other
                .as_i64()
                .map_or_else(|| Self::Text(other.to_string()), Self::Int),
        }
    }
}

impl fmt::Display for InsertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

/// Turns raw statement results into what terminal calls return.
///
/// Dialects with their own way of reporting generated keys override
/// [`Processor::process_insert_get_id`].
pub trait Processor: fmt::Debug + Send + Sync {
    /// Inserts `values` and reads back the generated id.
    fn process_insert_get_id<'a>(
        &'a self,
        builder: &'a Builder,
        values: Record,
        sequence: Option<&'a str>,
    ) -> BoxFuture<'a, Result<InsertId>> {
        Box::pin(async move {
            builder.insert(values).await?;
            let id = builder.connection().last_insert_id(sequence)?;
            Ok(InsertId::from(id))
        })
    }
}

/// Processor that relies on the connection's last insert id.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultProcessor;

impl Processor for DefaultProcessor {}
