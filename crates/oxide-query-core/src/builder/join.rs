//! JOIN clauses.

use super::operators::{invalid_operator, prepare_value_and_operator};
use super::{Boolean, Builder, Subquery};
use crate::error::BuildError;
use crate::grammar::first_join_replace;
use crate::query::{Clause, Fragment};
use crate::value::{SqlValue, ToSqlValue};

/// Join kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    /// `INNER JOIN`
    #[default]
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `RIGHT JOIN`
    Right,
    /// `CROSS JOIN`
    Cross,
    /// `FULL OUTER JOIN`
    FullOuter,
}

impl JoinType {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Cross => "CROSS JOIN",
            Self::FullOuter => "FULL OUTER JOIN",
        }
    }
}

/// ON conditions of one join, built inside a `*_join_on` closure.
///
/// Columns given to [`JoinClause::on`] are quoted. Values given to the
/// `where_*` methods are bound.
///
/// ```ignore
/// builder.join_on("contacts", |j| {
///     j.on("users.id", "=", "contacts.user_id").where_eq("contacts.kind", "email")
/// });
/// ```
#[derive(Debug, Clone)]
pub struct JoinClause {
    kind: JoinType,
    table: String,
    builder: Builder,
}

impl JoinClause {
    fn new(parent: &Builder, kind: JoinType, table: String) -> Self {
        Self {
            kind,
            table,
            builder: parent.for_nested(),
        }
    }

    /// Returns the join kind.
    #[must_use]
    pub const fn kind(&self) -> JoinType {
        self.kind
    }

    /// Returns the joined table, already quoted.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    fn add_on(&mut self, boolean: Boolean, first: &str, operator: &str, second: &str) {
        if invalid_operator(operator) {
            self.builder
                .fail(BuildError::InvalidOperator(String::from(operator)));
            return;
        }
        let grammar = self.builder.grammar();
        let sql = format!(
            "{} {} {}",
            grammar.quote_column(first),
            operator.trim(),
            grammar.quote_column(second)
        );
        self.builder
            .add_condition(Clause::Joins, boolean, &sql, Vec::new());
    }

    /// `ON first <op> second`.
    #[must_use]
    pub fn on(mut self, first: &str, operator: &str, second: &str) -> Self {
        self.add_on(Boolean::And, first, operator, second);
        self
    }

    /// `OR first <op> second`.
    #[must_use]
    pub fn or_on(mut self, first: &str, operator: &str, second: &str) -> Self {
        self.add_on(Boolean::Or, first, operator, second);
        self
    }

    /// `AND col = ?`.
    #[must_use]
    pub fn where_eq(mut self, column: &str, value: impl ToSqlValue) -> Self {
        self.builder.add_comparison(
            Clause::Joins,
            Boolean::And,
            column,
            None,
            value.to_sql_value(),
        );
        self
    }

    /// `OR col = ?`.
    #[must_use]
    pub fn or_where_eq(mut self, column: &str, value: impl ToSqlValue) -> Self {
        self.builder.add_comparison(
            Clause::Joins,
            Boolean::Or,
            column,
            None,
            value.to_sql_value(),
        );
        self
    }

    /// `AND col <op> ?`.
    #[must_use]
    pub fn where_cmp(mut self, column: &str, operator: &str, value: impl ToSqlValue) -> Self {
        self.builder.add_comparison(
            Clause::Joins,
            Boolean::And,
            column,
            Some(operator),
            value.to_sql_value(),
        );
        self
    }

    /// `OR col <op> ?`.
    #[must_use]
    pub fn or_where_cmp(mut self, column: &str, operator: &str, value: impl ToSqlValue) -> Self {
        self.builder.add_comparison(
            Clause::Joins,
            Boolean::Or,
            column,
            Some(operator),
            value.to_sql_value(),
        );
        self
    }

    /// `AND col IS NULL`.
    #[must_use]
    pub fn where_null(mut self, column: &str) -> Self {
        self.builder
            .add_null(Clause::Joins, Boolean::And, column, false);
        self
    }

    /// `AND col IS NOT NULL`.
    #[must_use]
    pub fn where_not_null(mut self, column: &str) -> Self {
        self.builder
            .add_null(Clause::Joins, Boolean::And, column, true);
        self
    }

    /// `AND col IN (?, ...)`.
    #[must_use]
    pub fn where_in<I>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToSqlValue,
    {
        let values = values.into_iter().map(|v| v.to_sql_value()).collect();
        self.builder
            .add_in(Clause::Joins, Boolean::And, column, values, false);
        self
    }
}

// Engine

impl Builder {
    fn add_join(
        &mut self,
        kind: JoinType,
        table: &str,
        condition: Option<(&str, &str)>,
        bindings: Vec<SqlValue>,
    ) {
        let sql = match condition {
            Some((keyword, condition)) => format!("{} {table} {keyword} {condition}", kind.as_str()),
            None => format!("{} {table}", kind.as_str()),
        };
        self.append(Clause::Joins, Fragment::Text(sql), bindings);
    }

    /// `first` and `second` are inlined as given.
    fn join_columns(
        &mut self,
        kind: JoinType,
        table: &str,
        bindings: Vec<SqlValue>,
        (first, operator, second): (&str, &str, &str),
    ) {
        if invalid_operator(operator) {
            return self.fail(BuildError::InvalidOperator(String::from(operator)));
        }
        let condition = format!("{first} {} {second}", operator.trim());
        self.add_join(kind, table, Some(("ON", &condition)), bindings);
    }

    fn join_closure<F>(&mut self, kind: JoinType, table: String, mut bindings: Vec<SqlValue>, f: F)
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        let JoinClause {
            table,
            builder: mut nested,
            ..
        } = f(JoinClause::new(self, kind, table));
        if let Some(error) = nested.error.take() {
            self.fail(error);
        }
        let state = nested.query.clause(Clause::Joins);
        if state.is_empty() {
            return self.add_join(kind, &table, None, bindings);
        }
        let condition = first_join_replace(&state.sql().collect::<Vec<_>>().join(" "));
        bindings.extend(state.bindings.iter().cloned());
        self.add_join(kind, &table, Some(("ON", &condition)), bindings);
    }

    fn join_value(
        &mut self,
        kind: JoinType,
        table: &str,
        column: &str,
        operator: &str,
        value: SqlValue,
    ) {
        let (value, operator) =
            match prepare_value_and_operator(value, Some(operator), false) {
                Ok(prepared) => prepared,
                Err(e) => return self.fail(e),
            };
        let condition = format!("{} {operator} ?", self.grammar.quote_column(column));
        self.add_join(kind, table, Some(("WHERE", &condition)), vec![value]);
    }

    /// Renders `(<sub-select>) AS alias`, returning the sub-select bindings.
    fn join_sub_table(&mut self, query: Subquery, alias: &str) -> Option<(String, Vec<SqlValue>)> {
        let (sql, bindings) = self.resolve_table_sub(query)?;
        Some((
            format!("({sql}) AS {}", self.grammar.quote_identifier(alias)),
            bindings,
        ))
    }

    fn join_on_columns(
        mut self,
        kind: JoinType,
        table: &str,
        condition: (&str, &str, &str),
    ) -> Self {
        let table = self.grammar.quote_table(table);
        self.join_columns(kind, &table, Vec::new(), condition);
        self
    }

    fn join_with<F>(mut self, kind: JoinType, table: &str, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        let table = self.grammar.quote_table(table);
        self.join_closure(kind, table, Vec::new(), f);
        self
    }

    fn join_against_value(
        mut self,
        kind: JoinType,
        table: &str,
        column: &str,
        operator: &str,
        value: SqlValue,
    ) -> Self {
        let table = self.grammar.quote_table(table);
        self.join_value(kind, &table, column, operator, value);
        self
    }

    fn join_sub_columns(
        mut self,
        kind: JoinType,
        query: Subquery,
        alias: &str,
        condition: (&str, &str, &str),
    ) -> Self {
        if let Some((table, bindings)) = self.join_sub_table(query, alias) {
            self.join_columns(kind, &table, bindings, condition);
        }
        self
    }

    fn join_sub_with<F>(mut self, kind: JoinType, query: Subquery, alias: &str, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        if let Some((table, bindings)) = self.join_sub_table(query, alias) {
            self.join_closure(kind, table, bindings, f);
        }
        self
    }
}

// Public API

impl Builder {
    /// `INNER JOIN table ON first <op> second`.
    ///
    /// `first` and `second` are inlined as written, unquoted. Use
    /// [`Builder::join_on`] with [`JoinClause::on`] for quoted columns.
    #[must_use]
    pub fn join(self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join_on_columns(JoinType::Inner, table, (first, operator, second))
    }

    /// `LEFT JOIN table ON first <op> second`.
    #[must_use]
    pub fn left_join(self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join_on_columns(JoinType::Left, table, (first, operator, second))
    }

    /// `RIGHT JOIN table ON first <op> second`.
    #[must_use]
    pub fn right_join(self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join_on_columns(JoinType::Right, table, (first, operator, second))
    }

    /// `FULL OUTER JOIN table ON first <op> second`.
    #[must_use]
    pub fn full_outer_join(self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join_on_columns(JoinType::FullOuter, table, (first, operator, second))
    }

    /// `CROSS JOIN table`.
    #[must_use]
    pub fn cross_join(mut self, table: &str) -> Self {
        let table = self.grammar.quote_table(table);
        self.add_join(JoinType::Cross, &table, None, Vec::new());
        self
    }

    /// `INNER JOIN table ON <conditions built by f>`.
    #[must_use]
    pub fn join_on<F>(self, table: &str, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.join_with(JoinType::Inner, table, f)
    }

    /// `LEFT JOIN table ON <conditions built by f>`.
    #[must_use]
    pub fn left_join_on<F>(self, table: &str, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.join_with(JoinType::Left, table, f)
    }

    /// `RIGHT JOIN table ON <conditions built by f>`.
    #[must_use]
    pub fn right_join_on<F>(self, table: &str, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.join_with(JoinType::Right, table, f)
    }

    /// `FULL OUTER JOIN table ON <conditions built by f>`.
    #[must_use]
    pub fn full_outer_join_on<F>(self, table: &str, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.join_with(JoinType::FullOuter, table, f)
    }

    /// `INNER JOIN table WHERE col <op> ?`, joining against a bound value.
    #[must_use]
    pub fn join_where(
        self,
        table: &str,
        column: &str,
        operator: &str,
        value: impl ToSqlValue,
    ) -> Self {
        self.join_against_value(JoinType::Inner, table, column, operator, value.to_sql_value())
    }

    /// `LEFT JOIN table WHERE col <op> ?`.
    #[must_use]
    pub fn left_join_where(
        self,
        table: &str,
        column: &str,
        operator: &str,
        value: impl ToSqlValue,
    ) -> Self {
        self.join_against_value(JoinType::Left, table, column, operator, value.to_sql_value())
    }

    /// `RIGHT JOIN table WHERE col <op> ?`.
    #[must_use]
    pub fn right_join_where(
        self,
        table: &str,
        column: &str,
        operator: &str,
        value: impl ToSqlValue,
    ) -> Self {
        self.join_against_value(JoinType::Right, table, column, operator, value.to_sql_value())
    }

    /// `FULL OUTER JOIN table WHERE col <op> ?`.
    #[must_use]
    pub fn full_outer_join_where(
        self,
        table: &str,
        column: &str,
        operator: &str,
        value: impl ToSqlValue,
    ) -> Self {
        self.join_against_value(
            JoinType::FullOuter,
            table,
            column,
            operator,
            value.to_sql_value(),
        )
    }

    /// `INNER JOIN (<sub-select>) AS alias ON first <op> second`.
    ///
    /// The sub-select bindings come before any ON binding.
    #[must_use]
    pub fn join_sub(
        self,
        query: impl Into<Subquery>,
        alias: &str,
        first: &str,
        operator: &str,
        second: &str,
    ) -> Self {
        self.join_sub_columns(JoinType::Inner, query.into(), alias, (first, operator, second))
    }

    /// `LEFT JOIN (<sub-select>) AS alias ON first <op> second`.
    #[must_use]
    pub fn left_join_sub(
        self,
        query: impl Into<Subquery>,
        alias: &str,
        first: &str,
        operator: &str,
        second: &str,
    ) -> Self {
        self.join_sub_columns(JoinType::Left, query.into(), alias, (first, operator, second))
    }

    /// `RIGHT JOIN (<sub-select>) AS alias ON first <op> second`.
    #[must_use]
    pub fn right_join_sub(
        self,
        query: impl Into<Subquery>,
        alias: &str,
        first: &str,
        operator: &str,
        second: &str,
    ) -> Self {
        self.join_sub_columns(JoinType::Right, query.into(), alias, (first, operator, second))
    }

    /// `FULL OUTER JOIN (<sub-select>) AS alias ON first <op> second`.
    #[must_use]
    pub fn full_outer_join_sub(
        self,
        query: impl Into<Subquery>,
        alias: &str,
        first: &str,
        operator: &str,
        second: &str,
    ) -> Self {
        self.join_sub_columns(
            JoinType::FullOuter,
            query.into(),
            alias,
            (first, operator, second),
        )
    }

    /// `INNER JOIN (<sub-select>) AS alias ON <conditions built by f>`.
    #[must_use]
    pub fn join_sub_on<F>(self, query: impl Into<Subquery>, alias: &str, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.join_sub_with(JoinType::Inner, query.into(), alias, f)
    }

    /// `LEFT JOIN (<sub-select>) AS alias ON <conditions built by f>`.
    #[must_use]
    pub fn left_join_sub_on<F>(self, query: impl Into<Subquery>, alias: &str, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.join_sub_with(JoinType::Left, query.into(), alias, f)
    }

    /// `RIGHT JOIN (<sub-select>) AS alias ON <conditions built by f>`.
    #[must_use]
    pub fn right_join_sub_on<F>(self, query: impl Into<Subquery>, alias: &str, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.join_sub_with(JoinType::Right, query.into(), alias, f)
    }

    /// `FULL OUTER JOIN (<sub-select>) AS alias ON <conditions built by f>`.
    #[must_use]
    pub fn full_outer_join_sub_on<F>(self, query: impl Into<Subquery>, alias: &str, f: F) -> Self
    where
        F: FnOnce(JoinClause) -> JoinClause,
    {
        self.join_sub_with(JoinType::FullOuter, query.into(), alias, f)
    }

    /// `CROSS JOIN (<sub-select>) AS alias`.
    #[must_use]
    pub fn cross_join_sub(mut self, query: impl Into<Subquery>, alias: &str) -> Self {
        if let Some((table, bindings)) = self.join_sub_table(query.into(), alias) {
            self.add_join(JoinType::Cross, &table, None, bindings);
        }
        self
    }
}
