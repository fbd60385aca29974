//! Fluent query builder.
//!
//! A [`Builder`] accumulates a [`Query`] through chained calls and compiles it
//! with its grammar. Every fluent method consumes and returns the builder:
//!
//! ```ignore
//! let (sql, bindings) = db
//!     .table("users")
//!     .select(["id", "name"])
//!     .where_eq("status", "active")
//!     .or_where_cmp("votes", ">", 100)
//!     .order_by_desc(["created_at"])
//!     .limit(10)
//!     .build()?;
//!
//! assert_eq!(
//!     sql,
//!     "SELECT `id`, `name` FROM `users` WHERE `status` = ? OR `votes` > ? \
//!      ORDER BY `created_at` DESC LIMIT ?"
//! );
//! ```
//!
//! Fluent methods cannot return a `Result` without breaking the chain. The
//! first [`BuildError`] is recorded on the builder instead, and returned by
//! [`Builder::build`] and by every terminal call.

mod conditions;
mod execute;
mod join;
mod operators;
mod ordering;
mod record;
mod subquery;

use std::sync::Arc;

use crate::connection::Connection;
use crate::error::{BuildError, Result};
use crate::expression::Expression;
use crate::grammar::{first_join_replace, Grammar};
use crate::processor::Processor;
use crate::query::{Clause, Fragment, Query};
use crate::value::{SqlValue, ToSqlValue};

pub use execute::{Page, DEFAULT_PER_PAGE};
pub use join::{JoinClause, JoinType};
pub use operators::{
    invalid_operator, invalid_operator_and_value, prepare_value_and_operator, Boolean, Condition,
    Direction, OPERATORS,
};
pub use record::{Assignment, Record};
pub use subquery::{sub, Operand, Subquery};

pub(crate) type BuildResult<T> = std::result::Result<T, BuildError>;

/// Fluent SQL query builder.
///
/// The connection, grammar and processor are shared with every sub-builder
/// the builder creates; the query itself is owned.
#[derive(Debug, Clone)]
pub struct Builder {
    connection: Arc<dyn Connection>,
    grammar: Arc<dyn Grammar>,
    processor: Arc<dyn Processor>,
    query: Query,
    error: Option<BuildError>,
    not_found: Option<String>,
    current_page: Option<u64>,
    per_page: Option<u64>,
    debug: bool,
}

impl Builder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(
        connection: Arc<dyn Connection>,
        grammar: Arc<dyn Grammar>,
        processor: Arc<dyn Processor>,
    ) -> Self {
        Self {
            connection,
            grammar,
            processor,
            query: Query::new(),
            error: None,
            not_found: None,
            current_page: None,
            per_page: None,
            debug: false,
        }
    }

    /// Returns the accumulated query.
    #[must_use]
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Returns the grammar.
    #[must_use]
    pub fn grammar(&self) -> &dyn Grammar {
        self.grammar.as_ref()
    }

    /// Returns the connection.
    #[must_use]
    pub const fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Returns the processor.
    #[must_use]
    pub const fn processor(&self) -> &Arc<dyn Processor> {
        &self.processor
    }

    /// Returns the first error recorded while building.
    #[must_use]
    pub const fn error(&self) -> Option<&BuildError> {
        self.error.as_ref()
    }

    /// Makes `get`, `first` and `find` fail with [`QueryError::NotFound`]
    /// carrying `message` when no row comes back.
    ///
    /// [`QueryError::NotFound`]: crate::QueryError::NotFound
    #[must_use]
    pub fn throws(mut self, message: impl Into<String>) -> Self {
        self.not_found = Some(message.into());
        self
    }

    /// Asks the statement to dump its parameters before execution.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub(crate) fn fail(&mut self, error: BuildError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn absorb(&mut self, nested: &mut Self) {
        if let Some(error) = nested.error.take() {
            self.fail(error);
        }
    }

    pub(crate) fn append(
        &mut self,
        clause: Clause,
        fragment: Fragment,
        bindings: impl IntoIterator<Item = SqlValue>,
    ) {
        let state = self.query.clause_mut(clause);
        state.queries.push(fragment);
        state.bindings.extend(bindings);
    }

    /// Appends an expression and its bound value, if any.
    pub(crate) fn append_expression(&mut self, clause: Clause, expression: Expression) {
        let (sql, bind_value) = expression.into_parts();
        self.append(clause, Fragment::Raw(Expression::new(sql)), bind_value);
    }

    // Primitives

    /// Appends a fragment to a clause.
    #[must_use]
    pub fn push_query(mut self, clause: Clause, fragment: impl Into<Fragment>) -> Self {
        self.append(clause, fragment.into(), []);
        self
    }

    /// Appends several fragments to a clause.
    #[must_use]
    pub fn push_queries<I>(mut self, clause: Clause, fragments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Fragment>,
    {
        self.query
            .clause_mut(clause)
            .queries
            .extend(fragments.into_iter().map(Into::into));
        self
    }

    /// Appends a binding to a clause.
    #[must_use]
    pub fn push_binding(mut self, clause: Clause, value: impl ToSqlValue) -> Self {
        self.query
            .clause_mut(clause)
            .bindings
            .push(value.to_sql_value());
        self
    }

    /// Appends several bindings to a clause.
    #[must_use]
    pub fn push_bindings<I>(mut self, clause: Clause, values: I) -> Self
    where
        I: IntoIterator<Item = SqlValue>,
    {
        self.query.clause_mut(clause).bindings.extend(values);
        self
    }

    // Compilation

    /// Compiles the SELECT statement for the current state.
    #[must_use]
    pub fn to_sql(&self) -> String {
        self.grammar.compile_select(&self.query)
    }

    /// Returns the bindings of the SELECT statement, in placeholder order.
    #[must_use]
    pub fn get_bindings(&self) -> Vec<SqlValue> {
        self.query.flatten_bindings()
    }

    /// Compiles the SELECT statement, or returns the recorded build error.
    pub fn build(&self) -> Result<(String, Vec<SqlValue>)> {
        Ok(self.compile()?)
    }

    pub(crate) fn check(&self) -> BuildResult<()> {
        self.error.clone().map_or(Ok(()), Err)
    }

    fn compile(&self) -> BuildResult<(String, Vec<SqlValue>)> {
        self.check()?;
        Ok((self.to_sql(), self.get_bindings()))
    }

    // Sub-queries

    /// Resolves a sub-query source into SQL text and its bindings.
    ///
    /// A closure receives a fresh builder sharing this builder's connection,
    /// grammar and processor. A raw expression contributes its bound value,
    /// if any.
    pub fn parse_sub(&self, query: Subquery) -> BuildResult<(String, Vec<SqlValue>)> {
        match query {
            Subquery::Text(sql) if sql.trim().is_empty() => Err(BuildError::InvalidSubquery(
                String::from("empty SQL text"),
            )),
            Subquery::Text(sql) => Ok((sql, Vec::new())),
            Subquery::Raw(expression) => {
                let (sql, bind_value) = expression.into_parts();
                Ok((sql, bind_value.into_iter().collect()))
            }
            Subquery::Query(builder) => builder.compile(),
            Subquery::Closure(f) => f(self.for_nested()).compile(),
        }
    }

    /// Runs `f` on a fresh sub-builder and compiles the result.
    pub fn create_sub<F>(&self, f: F) -> BuildResult<(String, Vec<SqlValue>)>
    where
        F: FnOnce(Self) -> Self,
    {
        f(self.for_nested()).compile()
    }

    /// Resolves a sub-query, recording the error on failure.
    pub(crate) fn resolve_sub(&mut self, query: Subquery) -> Option<(String, Vec<SqlValue>)> {
        match self.parse_sub(query) {
            Ok(resolved) => Some(resolved),
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    /// Resolves a sub-query used as a table, prefixing the database of a
    /// builder that targets another database.
    pub(crate) fn resolve_table_sub(&mut self, query: Subquery) -> Option<(String, Vec<SqlValue>)> {
        let query = match query {
            Subquery::Query(builder) => Subquery::Query(Box::new(
                self.prepend_database_name_if_cross_database_query(*builder),
            )),
            other => other,
        };
        self.resolve_sub(query)
    }

    /// Resolves the left-hand side of a condition.
    pub(crate) fn resolve_operand(&mut self, operand: Operand) -> Option<(String, Vec<SqlValue>)> {
        match operand {
            Operand::Column(column) => Some((self.grammar.quote_column(&column), Vec::new())),
            Operand::Sub(Subquery::Raw(expression)) => {
                let (sql, bind_value) = expression.into_parts();
                Some((sql, bind_value.into_iter().collect()))
            }
            Operand::Sub(query) => self
                .resolve_sub(query)
                .map(|(sql, bindings)| (format!("({sql})"), bindings)),
        }
    }

    /// Returns an empty builder wired to the same connection, grammar and
    /// processor.
    #[must_use]
    pub fn for_nested(&self) -> Self {
        Self::new(
            Arc::clone(&self.connection),
            Arc::clone(&self.grammar),
            Arc::clone(&self.processor),
        )
    }

    /// Same as [`Builder::for_nested`].
    #[must_use]
    pub fn new_query(&self) -> Self {
        self.for_nested()
    }

    /// Runs `f` on a fresh sub-builder and returns it.
    #[must_use]
    pub fn nested<F>(&self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        f(self.for_nested())
    }

    /// Merges one clause of a nested builder as a parenthesized group.
    ///
    /// The nested fragments lose their leading connective and are wrapped as
    /// `<boolean> (<fragments>)`. Their bindings follow the parent's.
    #[must_use]
    pub fn add_nested_query(mut self, nested: Self, clause: Clause, boolean: Boolean) -> Self {
        self.merge_nested(nested, clause, boolean);
        self
    }

    pub(crate) fn merge_nested(&mut self, mut nested: Self, clause: Clause, boolean: Boolean) {
        self.absorb(&mut nested);
        let state = nested.query.clause(clause);
        if state.is_empty() {
            return;
        }
        let sql = first_join_replace(&state.sql().collect::<Vec<_>>().join(" "));
        let bindings = state.bindings.clone();
        self.append(clause, Fragment::Text(format!("{boolean} ({sql})")), bindings);
    }

    /// Prefixes the FROM target of `query` with its database name when that
    /// database differs from this builder's.
    #[must_use]
    pub fn prepend_database_name_if_cross_database_query(&self, mut query: Self) -> Self {
        let Some(database) = query.connection.database().map(String::from) else {
            return query;
        };
        if self.connection.database() == Some(database.as_str()) {
            return query;
        }
        let prefix = format!("{}.", self.grammar.quote_identifier(&database));
        let froms = query.query.clause_mut(Clause::Froms);
        if let Some(Fragment::Text(table)) = froms.queries.first_mut() {
            if !table.starts_with(&prefix) {
                table.insert_str(0, &prefix);
            }
        }
        query
    }

    // FROM

    /// Adds a table to the FROM clause. `"users as u"` is aliased.
    ///
    /// Repeated calls add more sources; they never replace.
    #[must_use]
    pub fn from(mut self, table: &str) -> Self {
        let table = self.grammar.quote_table(table);
        self.append(Clause::Froms, Fragment::Text(table), []);
        self
    }

    /// Adds an aliased table to the FROM clause.
    #[must_use]
    pub fn from_as(mut self, table: &str, alias: &str) -> Self {
        let sql = format!(
            "{} AS {}",
            self.grammar.quote_table(table),
            self.grammar.quote_identifier(alias)
        );
        self.append(Clause::Froms, Fragment::Text(sql), []);
        self
    }

    /// Adds several tables to the FROM clause.
    #[must_use]
    pub fn from_many<I, S>(self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tables
            .into_iter()
            .fold(self, |builder, table| builder.from(table.as_ref()))
    }

    /// Adds raw SQL to the FROM clause with its bindings.
    #[must_use]
    pub fn from_raw<I>(mut self, sql: impl Into<Expression>, bindings: I) -> Self
    where
        I: IntoIterator<Item = SqlValue>,
    {
        self.append_expression(Clause::Froms, sql.into());
        self.query.clause_mut(Clause::Froms).bindings.extend(bindings);
        self
    }

    /// Adds a derived table: `(<sub-select>) AS alias`.
    #[must_use]
    pub fn from_sub(mut self, query: impl Into<Subquery>, alias: &str) -> Self {
        if let Some((sql, bindings)) = self.resolve_table_sub(query.into()) {
            let sql = format!("({sql}) AS {}", self.grammar.quote_identifier(alias));
            self.append(Clause::Froms, Fragment::Text(sql), bindings);
        }
        self
    }

    /// Adds an expression to the FROM clause, unquoted.
    #[must_use]
    pub fn from_expr(mut self, expression: Expression) -> Self {
        self.append_expression(Clause::Froms, expression);
        self
    }

    /// Appends a pre-built FROM fragment without any quoting.
    #[must_use]
    pub fn set_from(mut self, value: impl Into<Fragment>) -> Self {
        self.append(Clause::Froms, value.into(), []);
        self
    }

    /// Same as [`Builder::from`].
    #[must_use]
    pub fn table(self, table: &str) -> Self {
        self.from(table)
    }

    /// Same as [`Builder::set_from`].
    #[must_use]
    pub fn set_table(self, value: impl Into<Fragment>) -> Self {
        self.set_from(value)
    }

    // SELECT

    /// Adds columns to the select list. `*` stays bare, `"a as b"` is
    /// aliased, and an empty list selects `*`.
    ///
    /// Repeated calls add columns.
    #[must_use]
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut empty = true;
        for column in columns {
            empty = false;
            let column = self.grammar.quote_column(column.as_ref());
            self.append(Clause::Columns, Fragment::Text(column), []);
        }
        if empty {
            self.append(Clause::Columns, Fragment::from("*"), []);
        }
        self
    }

    /// Adds an aliased column.
    #[must_use]
    pub fn select_as(mut self, column: &str, alias: &str) -> Self {
        let sql = format!(
            "{} AS {}",
            self.grammar.quote_column(column),
            self.grammar.quote_identifier(alias)
        );
        self.append(Clause::Columns, Fragment::Text(sql), []);
        self
    }

    /// Adds an aliased expression: `expr AS alias`.
    #[must_use]
    pub fn select_expr(mut self, expression: Expression, alias: &str) -> Self {
        let (sql, bind_value) = expression.into_parts();
        let sql = format!("{sql} AS {}", self.grammar.quote_identifier(alias));
        self.append(Clause::Columns, Fragment::Raw(Expression::new(sql)), bind_value);
        self
    }

    /// Adds raw SQL to the select list.
    #[must_use]
    pub fn select_raw(mut self, sql: impl Into<Expression>) -> Self {
        self.append_expression(Clause::Columns, sql.into());
        self
    }

    /// Adds a sub-select, `(<sql>)` with an optional alias.
    ///
    /// Plain text is treated as SQL to wrap, never as a column name.
    #[must_use]
    pub fn select_sub(mut self, query: impl Into<Subquery>, alias: Option<&str>) -> Self {
        if let Some((sql, bindings)) = self.resolve_sub(query.into()) {
            let sql = match alias {
                Some(alias) => format!("({sql}) AS {}", self.grammar.quote_identifier(alias)),
                None => format!("({sql})"),
            };
            self.append(Clause::Columns, Fragment::Text(sql), bindings);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{builder, builder_on};

    #[test]
    fn test_select_defaults_to_star() {
        assert_eq!(builder().from("users").to_sql(), "SELECT * FROM `users`");
        assert_eq!(builder().to_sql(), "SELECT *");
        assert_eq!(
            builder().from("users").select(Vec::<&str>::new()).to_sql(),
            "SELECT * FROM `users`"
        );
    }

    #[test]
    fn test_select_columns_accumulate() {
        let sql = builder()
            .from("users as u")
            .select(["u.id", "name as n"])
            .select_as("email", "mail")
            .select_raw("COUNT(*)")
            .to_sql();
        assert_eq!(
            sql,
            "SELECT `u`.`id`, `name` AS `n`, `email` AS `mail`, COUNT(*) FROM `users` AS `u`"
        );
    }

    #[test]
    fn test_select_expr_keeps_binding() {
        let (sql, bindings) = builder()
            .from("t")
            .select_expr(Expression::with_binding("price * ?", 2), "doubled")
            .where_eq("id", 1)
            .build()
            .unwrap();
        assert_eq!(sql, "SELECT price * ? AS `doubled` FROM `t` WHERE `id` = ?");
        assert_eq!(bindings, vec![SqlValue::Int(2), SqlValue::Int(1)]);
    }

    #[test]
    fn test_select_sub_bindings_come_first() {
        let (sql, bindings) = builder()
            .from("users")
            .select(["id"])
            .select_sub(
                sub(|q| q.from("posts").select_raw("COUNT(*)").where_eq("kind", "a")),
                Some("posts"),
            )
            .where_eq("active", true)
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT `id`, (SELECT COUNT(*) FROM `posts` WHERE `kind` = ?) AS `posts` FROM `users` WHERE `active` = ?"
        );
        assert_eq!(bindings, vec!["a".to_sql_value(), SqlValue::Bool(true)]);
    }

    #[test]
    fn test_from_variants() {
        let (sql, bindings) = builder()
            .from_as("users", "u")
            .from_many(["roles", "teams"])
            .from_raw("generate_series(1, ?) AS s", [SqlValue::Int(3)])
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `users` AS `u`, `roles`, `teams`, generate_series(1, ?) AS s"
        );
        assert_eq!(bindings, vec![SqlValue::Int(3)]);

        let sql = builder().set_table("dual").table("x").to_sql();
        assert_eq!(sql, "SELECT * FROM dual, `x`");
    }

    #[test]
    fn test_from_sub() {
        let b = builder();
        let inner = b.for_nested().from("orders").where_cmp("total", ">", 10);
        let (sql, bindings) = b.from_sub(inner, "o").where_eq("o.paid", 1).build().unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM (SELECT * FROM `orders` WHERE `total` > ?) AS `o` WHERE `o`.`paid` = ?"
        );
        assert_eq!(bindings, vec![SqlValue::Int(10), SqlValue::Int(1)]);
    }

    #[test]
    fn test_empty_text_subquery_is_recorded() {
        let b = builder().from("t").select_sub("  ", None);
        assert!(matches!(b.error(), Some(BuildError::InvalidSubquery(_))));
        assert!(b.build().is_err());
    }

    #[test]
    fn test_first_error_wins() {
        let b = builder()
            .from("t")
            .where_cmp("a", "===", 1)
            .where_cmp("b", ">", SqlValue::Null);
        assert_eq!(b.error(), Some(&BuildError::InvalidOperator(String::from("==="))));
    }

    #[test]
    fn test_nested_error_propagates() {
        let b = builder()
            .from("t")
            .where_group(|q| q.where_cmp("a", "nope", 1));
        assert!(matches!(b.error(), Some(BuildError::InvalidOperator(_))));
    }

    #[test]
    fn test_add_nested_query() {
        let b = builder().from("t").where_eq("a", 1);
        let nested = b.nested(|q| q.where_eq("b", 2).or_where_eq("c", 3));
        let (sql, bindings) = b
            .add_nested_query(nested, Clause::Wheres, Boolean::Or)
            .build()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM `t` WHERE `a` = ? OR (`b` = ? OR `c` = ?)");
        assert_eq!(
            bindings,
            vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]
        );
    }

    #[test]
    fn test_cross_database_prefix() {
        let parent = builder_on("app");
        let other = builder_on("archive").from("users");
        let sql = parent.from_sub(other, "u").to_sql();
        assert_eq!(sql, "SELECT * FROM (SELECT * FROM `archive`.`users`) AS `u`");

        let parent = builder_on("app");
        let same = builder_on("app").from("users");
        let sql = parent.from_sub(same, "u").to_sql();
        assert_eq!(sql, "SELECT * FROM (SELECT * FROM `users`) AS `u`");
    }

    #[test]
    fn test_push_primitives() {
        let (sql, bindings) = builder()
            .from("t")
            .push_query(Clause::Wheres, "AND a = ?")
            .push_binding(Clause::Wheres, 4)
            .push_queries(Clause::Wheres, ["OR b = ?", "OR c = ?"])
            .push_bindings(Clause::Wheres, [SqlValue::Int(5), SqlValue::Int(6)])
            .build()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM `t` WHERE a = ? OR b = ? OR c = ?");
        assert_eq!(
            bindings,
            vec![SqlValue::Int(4), SqlValue::Int(5), SqlValue::Int(6)]
        );
    }

    #[test]
    fn test_builder_is_reusable() {
        let b = builder().from("t").where_eq("id", 1);
        assert_eq!(b.to_sql(), b.to_sql());
        assert_eq!(b.get_bindings(), b.get_bindings());
    }
}
