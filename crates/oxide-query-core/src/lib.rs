//! # oxide-query-core
//!
//! A fluent SQL query builder with parameterized bindings and pluggable
//! dialects.
//!
//! This crate provides:
//! - `Builder` for chainable SELECT, INSERT, UPDATE and DELETE construction
//! - `Grammar` for dialect-specific compilation, with `MySqlGrammar`
//! - `Expression` for literal SQL that is never quoted
//! - `Connection` and `Statement`, the capability adapters implement
//! - `Database` for wiring a connection to its grammar, with nested
//!   transactions
//!
//! Values never appear in the generated SQL: each one becomes a `?`
//! placeholder and is returned in the binding list, in placeholder order.
//!
//! ## Quick Start
//!
//! ```ignore
//! use oxide_query_core::{Database, Direction, Record};
//!
//! async fn example(db: &Database) -> oxide_query_core::Result<()> {
//!     // Select with conditions
//!     let users = db
//!         .table("users")
//!         .where_eq("active", true)
//!         .where_in("role", ["admin", "editor"])
//!         .order_by("created_at", Direction::Desc)
//!         .limit(10)
//!         .get()
//!         .await?;
//!
//!     // Insert and read back the id
//!     let id = db
//!         .table("users")
//!         .insert_get_id(Record::from([("name", "ada")]), None)
//!         .await?;
//!
//!     // Update through a join
//!     db.table("users")
//!         .join("teams", "teams.id", "=", "users.team_id")
//!         .where_eq("teams.name", "core")
//!         .update(Record::from([("active", false)]))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Sub-queries
//!
//! Closures receive a fresh builder sharing the parent's connection and
//! grammar:
//!
//! ```ignore
//! use oxide_query_core::sub;
//!
//! let (sql, bindings) = db
//!     .table("users")
//!     .where_in_sub("id", sub(|q| q.from("orders").select(["user_id"]).where_cmp("total", ">", 100)))
//!     .build()?;
//! ```

pub mod builder;
pub mod connection;
mod database;
mod error;
mod expression;
pub mod grammar;
mod log;
mod processor;
pub mod query;
mod value;

#[cfg(test)]
mod testing;

pub use builder::{
    sub, Assignment, Boolean, Builder, Condition, Direction, JoinClause, JoinType, Operand, Page,
    Record, Subquery, DEFAULT_PER_PAGE,
};
pub use connection::{Connection, FetchMode, Fetched, ResultSet, Row, Statement};
pub use database::Database;
pub use error::{BuildError, QueryError, Result};
pub use expression::{raw, Expression};
pub use grammar::{first_join_replace, Grammar, MySqlGrammar};
pub use log::{parse_query, QueryLog, QueryLogEntry};
pub use processor::{DefaultProcessor, InsertId, Processor};
pub use query::{Clause, ClauseState, Fragment, Query};
pub use value::{SqlValue, ToSqlValue};
