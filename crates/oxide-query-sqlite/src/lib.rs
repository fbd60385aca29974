//! # oxide-query-sqlite
//!
//! SQLite adapter for `oxide-query-core`, backed by [sqlx].
//!
//! # How SQLite differs from other dialects
//!
//! - **Identifier quoting**: SQLite uses double quotes (`"`) as
//!   the standard quoting style, though it also accepts backticks
//!   and square brackets. See [SQLite keywords].
//! - **No row locks**: SQLite locks the whole database file, so
//!   `lock_for_update` and `shared_lock` record a method-not-found error
//!   instead of compiling.
//! - **[Savepoints]**: nested transactions map to
//!   `SAVEPOINT` / `ROLLBACK TO SAVEPOINT`.
//! - **[Type affinity]**: any column can store any value, so rows are
//!   decoded by the storage class of each value rather than the declared
//!   column type.
//!
//! [sqlx]: https://docs.rs/sqlx
//! [SQLite keywords]: https://www.sqlite.org/lang_keywords.html
//! [Savepoints]: https://www.sqlite.org/lang_savepoint.html
//! [Type affinity]: https://www.sqlite.org/datatype3.html
//!
//! ## Example
//!
//! ```rust,no_run
//! use oxide_query_core::Record;
//! use oxide_query_sqlite::{SqliteConfig, SqliteConnection};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = SqliteConnection::database(&SqliteConfig::memory()).await?;
//! db.statement("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", vec![])
//!     .await?;
//!
//! let id = db
//!     .table("users")
//!     .insert_get_id(Record::from([("name", "ada")]), None)
//!     .await?;
//! let name = db.table("users").where_eq("id", id.to_string()).value("name").await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod error;
mod grammar;

pub use config::SqliteConfig;
pub use connection::SqliteConnection;
pub use error::{Result, SqliteError};
pub use grammar::SqliteGrammar;
