//! WHERE and HAVING conditions.
//!
//! Both clauses share one engine parametrized by the target [`Clause`]; join
//! conditions reuse it with [`Clause::Joins`]. Every condition is stored as
//! `<AND|OR> <predicate>` and the grammar strips the first connective.

use super::operators::{invalid_operator, prepare_value_and_operator};
use super::{Boolean, Builder, Condition, Operand, Subquery};
use crate::error::BuildError;
use crate::expression::Expression;
use crate::query::{Clause, Fragment};
use crate::value::{SqlValue, ToSqlValue};

// Engine

impl Builder {
    pub(crate) fn add_condition(
        &mut self,
        clause: Clause,
        boolean: Boolean,
        sql: &str,
        bindings: Vec<SqlValue>,
    ) {
        self.append(clause, Fragment::Text(format!("{boolean} {sql}")), bindings);
    }

    fn checked_operator(&mut self, operator: &str) -> Option<String> {
        if invalid_operator(operator) {
            self.fail(BuildError::InvalidOperator(String::from(operator)));
            return None;
        }
        Some(String::from(operator.trim()))
    }

    /// `col <op> ?`. NULL compares as `IS NULL` / `IS NOT NULL`.
    pub(crate) fn add_comparison(
        &mut self,
        clause: Clause,
        boolean: Boolean,
        column: &str,
        operator: Option<&str>,
        value: SqlValue,
    ) {
        let (value, operator) =
            match prepare_value_and_operator(value, operator, operator.is_none()) {
                Ok(prepared) => prepared,
                Err(e) => return self.fail(e),
            };
        let column = self.grammar.quote_column(column);
        if value.is_null() {
            let test = if operator == "=" { "IS NULL" } else { "IS NOT NULL" };
            return self.add_condition(clause, boolean, &format!("{column} {test}"), Vec::new());
        }
        self.add_condition(clause, boolean, &format!("{column} {operator} ?"), vec![value]);
    }

    fn add_many<I>(&mut self, clause: Clause, boolean: Boolean, conditions: I)
    where
        I: IntoIterator,
        I::Item: Into<Condition>,
    {
        for condition in conditions {
            match condition.into().prepare() {
                Ok((column, operator, value)) => {
                    self.add_comparison(clause, boolean, &column, Some(&operator), value);
                }
                Err(e) => self.fail(e),
            }
        }
    }

    /// A closure-built group: `(<conditions>)`, or `EXISTS (<select>)` when the
    /// nested builder selects from a table.
    fn add_group<F>(&mut self, clause: Clause, boolean: Boolean, f: F)
    where
        F: FnOnce(Self) -> Self,
    {
        let nested = f(self.for_nested());
        if nested.query.is_empty(Clause::Froms) {
            return self.merge_nested(nested, clause, boolean);
        }
        match nested.compile() {
            Ok((sql, bindings)) => {
                self.add_condition(clause, boolean, &format!("EXISTS ({sql})"), bindings);
            }
            Err(e) => self.fail(e),
        }
    }

    /// `col <op> (<sub-select>)`.
    fn add_sub_comparison(
        &mut self,
        clause: Clause,
        boolean: Boolean,
        column: &str,
        operator: &str,
        query: Subquery,
    ) {
        let Some(operator) = self.checked_operator(operator) else {
            return;
        };
        if let Some((sql, bindings)) = self.resolve_sub(query) {
            let column = self.grammar.quote_column(column);
            self.add_condition(clause, boolean, &format!("{column} {operator} ({sql})"), bindings);
        }
    }

    /// `(<sub-select>) <op> ?`.
    fn add_sub_value_comparison(
        &mut self,
        clause: Clause,
        boolean: Boolean,
        query: Subquery,
        operator: &str,
        value: SqlValue,
    ) {
        let (value, operator) = match prepare_value_and_operator(value, Some(operator), false) {
            Ok(prepared) => prepared,
            Err(e) => return self.fail(e),
        };
        if let Some((sql, mut bindings)) = self.resolve_sub(query) {
            bindings.push(value);
            self.add_condition(clause, boolean, &format!("({sql}) {operator} ?"), bindings);
        }
    }

    /// `col [NOT] IN (?, ...)`. An empty list never matches for `IN` and
    /// always matches for `NOT IN`.
    pub(crate) fn add_in(
        &mut self,
        clause: Clause,
        boolean: Boolean,
        column: &str,
        values: Vec<SqlValue>,
        not: bool,
    ) {
        if values.is_empty() {
            let sql = if not { "1 = 1" } else { "0 = 1" };
            return self.add_condition(clause, boolean, sql, Vec::new());
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        let keyword = if not { "NOT IN" } else { "IN" };
        let column = self.grammar.quote_column(column);
        self.add_condition(
            clause,
            boolean,
            &format!("{column} {keyword} ({placeholders})"),
            values,
        );
    }

    fn add_in_sub(
        &mut self,
        clause: Clause,
        boolean: Boolean,
        column: &str,
        query: Subquery,
        not: bool,
    ) {
        if let Some((sql, bindings)) = self.resolve_sub(query) {
            let keyword = if not { "NOT IN" } else { "IN" };
            let column = self.grammar.quote_column(column);
            self.add_condition(clause, boolean, &format!("{column} {keyword} ({sql})"), bindings);
        }
    }

    pub(crate) fn add_null(&mut self, clause: Clause, boolean: Boolean, column: &str, not: bool) {
        let test = if not { "IS NOT NULL" } else { "IS NULL" };
        let column = self.grammar.quote_column(column);
        self.add_condition(clause, boolean, &format!("{column} {test}"), Vec::new());
    }

    fn add_between(
        &mut self,
        clause: Clause,
        boolean: Boolean,
        column: &str,
        range: [SqlValue; 2],
        not: bool,
    ) {
        let keyword = if not { "NOT BETWEEN" } else { "BETWEEN" };
        let column = self.grammar.quote_column(column);
        self.add_condition(
            clause,
            boolean,
            &format!("{column} {keyword} ? AND ?"),
            range.into(),
        );
    }

    fn add_like(
        &mut self,
        clause: Clause,
        boolean: Boolean,
        lhs: Operand,
        pattern: SqlValue,
        not: bool,
    ) {
        if let Some((sql, mut bindings)) = self.resolve_operand(lhs) {
            bindings.push(pattern);
            let keyword = if not { "NOT LIKE" } else { "LIKE" };
            self.add_condition(clause, boolean, &format!("{sql} {keyword} ?"), bindings);
        }
    }

    fn add_exists(&mut self, clause: Clause, boolean: Boolean, query: Subquery, not: bool) {
        if let Some((sql, bindings)) = self.resolve_sub(query) {
            let keyword = if not { "NOT EXISTS" } else { "EXISTS" };
            self.add_condition(clause, boolean, &format!("{keyword} ({sql})"), bindings);
        }
    }

    /// `col <op> ANY|ALL|SOME (<sub-select>)`.
    fn add_quantified(
        &mut self,
        boolean: Boolean,
        column: &str,
        operator: &str,
        quantifier: &str,
        query: Subquery,
    ) {
        let Some(operator) = self.checked_operator(operator) else {
            return;
        };
        if let Some((sql, bindings)) = self.resolve_sub(query) {
            let column = self.grammar.quote_column(column);
            self.add_condition(
                Clause::Wheres,
                boolean,
                &format!("{column} {operator} {quantifier} ({sql})"),
                bindings,
            );
        }
    }

    /// Raw predicates keep a lower-case connective.
    fn add_raw<I>(&mut self, clause: Clause, boolean: Boolean, sql: Expression, bindings: I)
    where
        I: IntoIterator<Item = SqlValue>,
    {
        let (sql, bind_value) = sql.into_parts();
        let fragment = Fragment::Raw(Expression::new(format!("{} {sql}", boolean.raw_prefix())));
        self.append(clause, fragment, bind_value.into_iter().chain(bindings));
    }
}

fn to_values<I>(values: I) -> Vec<SqlValue>
where
    I: IntoIterator,
    I::Item: ToSqlValue,
{
    values.into_iter().map(|v| v.to_sql_value()).collect()
}

// WHERE

impl Builder {
    /// `WHERE col = ?`. A NULL value renders `col IS NULL`.
    #[must_use]
    pub fn where_eq(mut self, column: &str, value: impl ToSqlValue) -> Self {
        self.add_comparison(Clause::Wheres, Boolean::And, column, None, value.to_sql_value());
        self
    }

    /// `OR col = ?`.
    #[must_use]
    pub fn or_where_eq(mut self, column: &str, value: impl ToSqlValue) -> Self {
        self.add_comparison(Clause::Wheres, Boolean::Or, column, None, value.to_sql_value());
        self
    }

    /// `WHERE col <op> ?`.
    ///
    /// Unknown operators and NULL compared with anything but `=`, `<>` or
    /// `!=` record a build error.
    #[must_use]
    pub fn where_cmp(mut self, column: &str, operator: &str, value: impl ToSqlValue) -> Self {
        self.add_comparison(
            Clause::Wheres,
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
        self.add_comparison(
            Clause::Wheres,
            Boolean::Or,
            column,
            Some(operator),
            value.to_sql_value(),
        );
        self
    }

    /// Adds one AND condition per tuple.
    ///
    /// ```ignore
    /// builder.where_many([("status", "=", "active"), ("age", ">", "18")]);
    /// builder.where_many([("status", "active")]);
    /// ```
    #[must_use]
    pub fn where_many<I>(mut self, conditions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Condition>,
    {
        self.add_many(Clause::Wheres, Boolean::And, conditions);
        self
    }

    /// Adds one OR condition per tuple.
    #[must_use]
    pub fn or_where_many<I>(mut self, conditions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Condition>,
    {
        self.add_many(Clause::Wheres, Boolean::Or, conditions);
        self
    }

    /// Groups the conditions built by `f` in parentheses.
    ///
    /// When the nested builder has a FROM clause it is a sub-select instead,
    /// rendered as `EXISTS (<select>)`.
    #[must_use]
    pub fn where_group<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.add_group(Clause::Wheres, Boolean::And, f);
        self
    }

    /// `OR (<conditions>)`.
    #[must_use]
    pub fn or_where_group<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.add_group(Clause::Wheres, Boolean::Or, f);
        self
    }

    /// `WHERE col <op> (<sub-select>)`.
    #[must_use]
    pub fn where_sub(mut self, column: &str, operator: &str, query: impl Into<Subquery>) -> Self {
        self.add_sub_comparison(Clause::Wheres, Boolean::And, column, operator, query.into());
        self
    }

    /// `OR col <op> (<sub-select>)`.
    #[must_use]
    pub fn or_where_sub(mut self, column: &str, operator: &str, query: impl Into<Subquery>) -> Self {
        self.add_sub_comparison(Clause::Wheres, Boolean::Or, column, operator, query.into());
        self
    }

    /// `WHERE (<sub-select>) <op> ?`.
    #[must_use]
    pub fn where_sub_value(
        mut self,
        query: impl Into<Subquery>,
        operator: &str,
        value: impl ToSqlValue,
    ) -> Self {
        self.add_sub_value_comparison(
            Clause::Wheres,
            Boolean::And,
            query.into(),
            operator,
            value.to_sql_value(),
        );
        self
    }

    /// `OR (<sub-select>) <op> ?`.
    #[must_use]
    pub fn or_where_sub_value(
        mut self,
        query: impl Into<Subquery>,
        operator: &str,
        value: impl ToSqlValue,
    ) -> Self {
        self.add_sub_value_comparison(
            Clause::Wheres,
            Boolean::Or,
            query.into(),
            operator,
            value.to_sql_value(),
        );
        self
    }

    /// Adds a raw predicate with its bindings.
    #[must_use]
    pub fn where_raw<I>(mut self, sql: impl Into<Expression>, bindings: I) -> Self
    where
        I: IntoIterator<Item = SqlValue>,
    {
        self.add_raw(Clause::Wheres, Boolean::And, sql.into(), bindings);
        self
    }

    /// Adds a raw OR predicate with its bindings.
    #[must_use]
    pub fn or_where_raw<I>(mut self, sql: impl Into<Expression>, bindings: I) -> Self
    where
        I: IntoIterator<Item = SqlValue>,
    {
        self.add_raw(Clause::Wheres, Boolean::Or, sql.into(), bindings);
        self
    }

    /// `WHERE col IN (?, ...)`.
    #[must_use]
    pub fn where_in<I>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToSqlValue,
    {
        self.add_in(Clause::Wheres, Boolean::And, column, to_values(values), false);
        self
    }

    /// `OR col IN (?, ...)`.
    #[must_use]
    pub fn or_where_in<I>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToSqlValue,
    {
        self.add_in(Clause::Wheres, Boolean::Or, column, to_values(values), false);
        self
    }

    /// `WHERE col NOT IN (?, ...)`.
    #[must_use]
    pub fn where_not_in<I>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToSqlValue,
    {
        self.add_in(Clause::Wheres, Boolean::And, column, to_values(values), true);
        self
    }

    /// `OR col NOT IN (?, ...)`.
    #[must_use]
    pub fn or_where_not_in<I>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToSqlValue,
    {
        self.add_in(Clause::Wheres, Boolean::Or, column, to_values(values), true);
        self
    }

    /// Adds one `col IN (...)` condition per `(column, values)` pair.
    #[must_use]
    pub fn where_in_many<I, S>(mut self, lists: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<SqlValue>)>,
        S: AsRef<str>,
    {
        for (column, values) in lists {
            self.add_in(Clause::Wheres, Boolean::And, column.as_ref(), values, false);
        }
        self
    }

    /// `WHERE col IN (<sub-select>)`, followed by the sub-select's bindings.
    #[must_use]
    pub fn where_in_sub(mut self, column: &str, query: impl Into<Subquery>) -> Self {
        self.add_in_sub(Clause::Wheres, Boolean::And, column, query.into(), false);
        self
    }

    /// `OR col IN (<sub-select>)`.
    #[must_use]
    pub fn or_where_in_sub(mut self, column: &str, query: impl Into<Subquery>) -> Self {
        self.add_in_sub(Clause::Wheres, Boolean::Or, column, query.into(), false);
        self
    }

    /// `WHERE col NOT IN (<sub-select>)`.
    #[must_use]
    pub fn where_not_in_sub(mut self, column: &str, query: impl Into<Subquery>) -> Self {
        self.add_in_sub(Clause::Wheres, Boolean::And, column, query.into(), true);
        self
    }

    /// `OR col NOT IN (<sub-select>)`.
    #[must_use]
    pub fn or_where_not_in_sub(mut self, column: &str, query: impl Into<Subquery>) -> Self {
        self.add_in_sub(Clause::Wheres, Boolean::Or, column, query.into(), true);
        self
    }

    /// `WHERE col IS NULL`.
    #[must_use]
    pub fn where_null(mut self, column: &str) -> Self {
        self.add_null(Clause::Wheres, Boolean::And, column, false);
        self
    }

    /// `OR col IS NULL`.
    #[must_use]
    pub fn or_where_null(mut self, column: &str) -> Self {
        self.add_null(Clause::Wheres, Boolean::Or, column, false);
        self
    }

    /// `WHERE col IS NOT NULL`.
    #[must_use]
    pub fn where_not_null(mut self, column: &str) -> Self {
        self.add_null(Clause::Wheres, Boolean::And, column, true);
        self
    }

    /// `OR col IS NOT NULL`.
    #[must_use]
    pub fn or_where_not_null(mut self, column: &str) -> Self {
        self.add_null(Clause::Wheres, Boolean::Or, column, true);
        self
    }

    /// `col IS NULL` for each column.
    #[must_use]
    pub fn where_null_many<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for column in columns {
            self.add_null(Clause::Wheres, Boolean::And, column.as_ref(), false);
        }
        self
    }

    /// `col IS NOT NULL` for each column.
    #[must_use]
    pub fn where_not_null_many<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for column in columns {
            self.add_null(Clause::Wheres, Boolean::And, column.as_ref(), true);
        }
        self
    }

    /// `WHERE col BETWEEN ? AND ?`.
    #[must_use]
    pub fn where_between(
        mut self,
        column: &str,
        low: impl ToSqlValue,
        high: impl ToSqlValue,
    ) -> Self {
        let range = [low.to_sql_value(), high.to_sql_value()];
        self.add_between(Clause::Wheres, Boolean::And, column, range, false);
        self
    }

    /// `OR col BETWEEN ? AND ?`.
    #[must_use]
    pub fn or_where_between(
        mut self,
        column: &str,
        low: impl ToSqlValue,
        high: impl ToSqlValue,
    ) -> Self {
        let range = [low.to_sql_value(), high.to_sql_value()];
        self.add_between(Clause::Wheres, Boolean::Or, column, range, false);
        self
    }

    /// `WHERE col NOT BETWEEN ? AND ?`.
    #[must_use]
    pub fn where_not_between(
        mut self,
        column: &str,
        low: impl ToSqlValue,
        high: impl ToSqlValue,
    ) -> Self {
        let range = [low.to_sql_value(), high.to_sql_value()];
        self.add_between(Clause::Wheres, Boolean::And, column, range, true);
        self
    }

    /// `OR col NOT BETWEEN ? AND ?`.
    #[must_use]
    pub fn or_where_not_between(
        mut self,
        column: &str,
        low: impl ToSqlValue,
        high: impl ToSqlValue,
    ) -> Self {
        let range = [low.to_sql_value(), high.to_sql_value()];
        self.add_between(Clause::Wheres, Boolean::Or, column, range, true);
        self
    }

    /// `WHERE <lhs> LIKE ?`. The left-hand side is a column or a sub-query.
    #[must_use]
    pub fn where_like(mut self, lhs: impl Into<Operand>, pattern: impl ToSqlValue) -> Self {
        self.add_like(
            Clause::Wheres,
            Boolean::And,
            lhs.into(),
            pattern.to_sql_value(),
            false,
        );
        self
    }

    /// `OR <lhs> LIKE ?`.
    #[must_use]
    pub fn or_where_like(mut self, lhs: impl Into<Operand>, pattern: impl ToSqlValue) -> Self {
        self.add_like(
            Clause::Wheres,
            Boolean::Or,
            lhs.into(),
            pattern.to_sql_value(),
            false,
        );
        self
    }

    /// `WHERE <lhs> NOT LIKE ?`.
    #[must_use]
    pub fn where_not_like(mut self, lhs: impl Into<Operand>, pattern: impl ToSqlValue) -> Self {
        self.add_like(
            Clause::Wheres,
            Boolean::And,
            lhs.into(),
            pattern.to_sql_value(),
            true,
        );
        self
    }

    /// `OR <lhs> NOT LIKE ?`.
    #[must_use]
    pub fn or_where_not_like(mut self, lhs: impl Into<Operand>, pattern: impl ToSqlValue) -> Self {
        self.add_like(
            Clause::Wheres,
            Boolean::Or,
            lhs.into(),
            pattern.to_sql_value(),
            true,
        );
        self
    }

    /// `WHERE EXISTS (<sub-select>)`.
    #[must_use]
    pub fn where_exists(mut self, query: impl Into<Subquery>) -> Self {
        self.add_exists(Clause::Wheres, Boolean::And, query.into(), false);
        self
    }

    /// `OR EXISTS (<sub-select>)`.
    #[must_use]
    pub fn or_where_exists(mut self, query: impl Into<Subquery>) -> Self {
        self.add_exists(Clause::Wheres, Boolean::Or, query.into(), false);
        self
    }

    /// `WHERE NOT EXISTS (<sub-select>)`.
    #[must_use]
    pub fn where_not_exists(mut self, query: impl Into<Subquery>) -> Self {
        self.add_exists(Clause::Wheres, Boolean::And, query.into(), true);
        self
    }

    /// `OR NOT EXISTS (<sub-select>)`.
    #[must_use]
    pub fn or_where_not_exists(mut self, query: impl Into<Subquery>) -> Self {
        self.add_exists(Clause::Wheres, Boolean::Or, query.into(), true);
        self
    }

    /// `WHERE col <op> ANY (<sub-select>)`.
    #[must_use]
    pub fn where_any(mut self, column: &str, operator: &str, query: impl Into<Subquery>) -> Self {
        self.add_quantified(Boolean::And, column, operator, "ANY", query.into());
        self
    }

    /// `OR col <op> ANY (<sub-select>)`.
    #[must_use]
    pub fn or_where_any(mut self, column: &str, operator: &str, query: impl Into<Subquery>) -> Self {
        self.add_quantified(Boolean::Or, column, operator, "ANY", query.into());
        self
    }

    /// `WHERE col <op> ALL (<sub-select>)`.
    #[must_use]
    pub fn where_all(mut self, column: &str, operator: &str, query: impl Into<Subquery>) -> Self {
        self.add_quantified(Boolean::And, column, operator, "ALL", query.into());
        self
    }

    /// `OR col <op> ALL (<sub-select>)`.
    #[must_use]
    pub fn or_where_all(mut self, column: &str, operator: &str, query: impl Into<Subquery>) -> Self {
        self.add_quantified(Boolean::Or, column, operator, "ALL", query.into());
        self
    }

    /// `WHERE col <op> SOME (<sub-select>)`.
    #[must_use]
    pub fn where_some(mut self, column: &str, operator: &str, query: impl Into<Subquery>) -> Self {
        self.add_quantified(Boolean::And, column, operator, "SOME", query.into());
        self
    }

    /// `OR col <op> SOME (<sub-select>)`.
    #[must_use]
    pub fn or_where_some(
        mut self,
        column: &str,
        operator: &str,
        query: impl Into<Subquery>,
    ) -> Self {
        self.add_quantified(Boolean::Or, column, operator, "SOME", query.into());
        self
    }
}

// HAVING

impl Builder {
    /// `HAVING col = ?`.
    #[must_use]
    pub fn having_eq(mut self, column: &str, value: impl ToSqlValue) -> Self {
        self.add_comparison(Clause::Havings, Boolean::And, column, None, value.to_sql_value());
        self
    }

    /// `OR col = ?` in HAVING.
    #[must_use]
    pub fn or_having_eq(mut self, column: &str, value: impl ToSqlValue) -> Self {
        self.add_comparison(Clause::Havings, Boolean::Or, column, None, value.to_sql_value());
        self
    }

    /// `HAVING col <op> ?`.
    #[must_use]
    pub fn having_cmp(mut self, column: &str, operator: &str, value: impl ToSqlValue) -> Self {
        self.add_comparison(
            Clause::Havings,
            Boolean::And,
            column,
            Some(operator),
            value.to_sql_value(),
        );
        self
    }

    /// `OR col <op> ?` in HAVING.
    #[must_use]
    pub fn or_having_cmp(mut self, column: &str, operator: &str, value: impl ToSqlValue) -> Self {
        self.add_comparison(
            Clause::Havings,
            Boolean::Or,
            column,
            Some(operator),
            value.to_sql_value(),
        );
        self
    }

    /// Adds one AND HAVING condition per tuple.
    #[must_use]
    pub fn having_many<I>(mut self, conditions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Condition>,
    {
        self.add_many(Clause::Havings, Boolean::And, conditions);
        self
    }

    /// Adds one OR HAVING condition per tuple.
    #[must_use]
    pub fn or_having_many<I>(mut self, conditions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Condition>,
    {
        self.add_many(Clause::Havings, Boolean::Or, conditions);
        self
    }

    /// Groups the HAVING conditions built by `f` in parentheses.
    #[must_use]
    pub fn having_group<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.add_group(Clause::Havings, Boolean::And, f);
        self
    }

    /// `OR (<conditions>)` in HAVING.
    #[must_use]
    pub fn or_having_group<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        self.add_group(Clause::Havings, Boolean::Or, f);
        self
    }

    /// `HAVING col <op> (<sub-select>)`.
    #[must_use]
    pub fn having_sub(mut self, column: &str, operator: &str, query: impl Into<Subquery>) -> Self {
        self.add_sub_comparison(Clause::Havings, Boolean::And, column, operator, query.into());
        self
    }

    /// `OR col <op> (<sub-select>)` in HAVING.
    #[must_use]
    pub fn or_having_sub(
        mut self,
        column: &str,
        operator: &str,
        query: impl Into<Subquery>,
    ) -> Self {
        self.add_sub_comparison(Clause::Havings, Boolean::Or, column, operator, query.into());
        self
    }

    /// `HAVING col IN (?, ...)`.
    #[must_use]
    pub fn having_in<I>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToSqlValue,
    {
        self.add_in(Clause::Havings, Boolean::And, column, to_values(values), false);
        self
    }

    /// `OR col IN (?, ...)` in HAVING.
    #[must_use]
    pub fn or_having_in<I>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToSqlValue,
    {
        self.add_in(Clause::Havings, Boolean::Or, column, to_values(values), false);
        self
    }

    /// `HAVING col NOT IN (?, ...)`.
    #[must_use]
    pub fn having_not_in<I>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToSqlValue,
    {
        self.add_in(Clause::Havings, Boolean::And, column, to_values(values), true);
        self
    }

    /// `HAVING col IS NULL`.
    #[must_use]
    pub fn having_null(mut self, column: &str) -> Self {
        self.add_null(Clause::Havings, Boolean::And, column, false);
        self
    }

    /// `OR col IS NULL` in HAVING.
    #[must_use]
    pub fn or_having_null(mut self, column: &str) -> Self {
        self.add_null(Clause::Havings, Boolean::Or, column, false);
        self
    }

    /// `HAVING col IS NOT NULL`.
    #[must_use]
    pub fn having_not_null(mut self, column: &str) -> Self {
        self.add_null(Clause::Havings, Boolean::And, column, true);
        self
    }

    /// `HAVING col BETWEEN ? AND ?`.
    #[must_use]
    pub fn having_between(
        mut self,
        column: &str,
        low: impl ToSqlValue,
        high: impl ToSqlValue,
    ) -> Self {
        let range = [low.to_sql_value(), high.to_sql_value()];
        self.add_between(Clause::Havings, Boolean::And, column, range, false);
        self
    }

    /// `OR col BETWEEN ? AND ?` in HAVING.
    #[must_use]
    pub fn or_having_between(
        mut self,
        column: &str,
        low: impl ToSqlValue,
        high: impl ToSqlValue,
    ) -> Self {
        let range = [low.to_sql_value(), high.to_sql_value()];
        self.add_between(Clause::Havings, Boolean::Or, column, range, false);
        self
    }

    /// Adds a raw HAVING predicate with its bindings.
    #[must_use]
    pub fn having_raw<I>(mut self, sql: impl Into<Expression>, bindings: I) -> Self
    where
        I: IntoIterator<Item = SqlValue>,
    {
        self.add_raw(Clause::Havings, Boolean::And, sql.into(), bindings);
        self
    }

    /// Adds a raw OR HAVING predicate with its bindings.
    #[must_use]
    pub fn or_having_raw<I>(mut self, sql: impl Into<Expression>, bindings: I) -> Self
    where
        I: IntoIterator<Item = SqlValue>,
    {
        self.add_raw(Clause::Havings, Boolean::Or, sql.into(), bindings);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::builder;

    #[test]
    fn test_first_connective_is_stripped_once() {
        let (sql, bindings) = builder()
            .from("users")
            .where_eq("a", 1)
            .or_where_eq("b", 2)
            .build()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM `users` WHERE `a` = ? OR `b` = ?");
        assert_eq!(bindings, vec![SqlValue::Int(1), SqlValue::Int(2)]);
    }

    #[test]
    fn test_or_first_is_stripped() {
        let sql = builder().or_where_eq("a", 1).where_eq("b", 2).to_sql();
        assert_eq!(sql, "SELECT * WHERE `a` = ? AND `b` = ?");
    }

    #[test]
    fn test_nested_group() {
        let (sql, bindings) = builder()
            .from("users")
            .where_group(|q| q.where_eq("a", 1).or_where_eq("b", 2))
            .build()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM `users` WHERE (`a` = ? OR `b` = ?)");
        assert_eq!(bindings, vec![SqlValue::Int(1), SqlValue::Int(2)]);
    }

    #[test]
    fn test_group_with_from_is_exists() {
        let sql = builder()
            .from("users")
            .where_eq("active", true)
            .or_where_group(|q| q.from("admins").where_eq("admins.id", 3))
            .to_sql();
        assert_eq!(
            sql,
            "SELECT * FROM `users` WHERE `active` = ? OR EXISTS (SELECT * FROM `admins` WHERE `admins`.`id` = ?)"
        );
    }

    #[test]
    fn test_empty_group_adds_nothing() {
        let sql = builder().from("t").where_group(|q| q).to_sql();
        assert_eq!(sql, "SELECT * FROM `t`");
    }

    #[test]
    fn test_null_comparisons() {
        let sql = builder()
            .from("t")
            .where_eq("a", SqlValue::Null)
            .where_cmp("b", "<>", None::<i64>)
            .where_null("c")
            .or_where_not_null("d")
            .to_sql();
        assert_eq!(
            sql,
            "SELECT * FROM `t` WHERE `a` IS NULL AND `b` IS NOT NULL AND `c` IS NULL OR `d` IS NOT NULL"
        );
    }

    #[test]
    fn test_illegal_null_operator_is_recorded() {
        let result = builder().from("t").where_cmp("a", ">", SqlValue::Null).build();
        assert_eq!(
            result.unwrap_err().as_build(),
            Some(&BuildError::IllegalOperatorAndValue {
                operator: String::from(">")
            })
        );
    }

    #[test]
    fn test_invalid_operator_is_recorded() {
        let b = builder().from("t").where_cmp("a", "===", 1).where_eq("b", 2);
        assert_eq!(
            b.error(),
            Some(&BuildError::InvalidOperator(String::from("===")))
        );
        assert_eq!(b.to_sql(), "SELECT * FROM `t` WHERE `b` = ?");
    }

    #[test]
    fn test_where_many() {
        let (sql, bindings) = builder()
            .from("t")
            .where_many([("a", "=", 1), ("b", ">", 2)])
            .or_where_many([("c", 3)])
            .build()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM `t` WHERE `a` = ? AND `b` > ? OR `c` = ?");
        assert_eq!(
            bindings,
            vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]
        );
    }

    #[test]
    fn test_raw_conditions_keep_bindings() {
        let (sql, bindings) = builder()
            .from("t")
            .where_eq("a", 1)
            .where_raw("b > ?", [SqlValue::Int(2)])
            .or_where_raw(Expression::with_binding("c = ?", 3), [])
            .build()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM `t` WHERE `a` = ? and b > ? or c = ?");
        assert_eq!(
            bindings,
            vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]
        );
    }

    #[test]
    fn test_leading_raw_loses_prefix() {
        let sql = builder().from("t").where_raw("x = 1", []).to_sql();
        assert_eq!(sql, "SELECT * FROM `t` WHERE x = 1");
    }

    #[test]
    fn test_where_in_lists() {
        let (sql, bindings) = builder()
            .from("t")
            .where_in("id", [1, 2, 3])
            .or_where_not_in("status", ["x"])
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `t` WHERE `id` IN (?, ?, ?) OR `status` NOT IN (?)"
        );
        assert_eq!(bindings.len(), 4);
    }

    #[test]
    fn test_where_in_empty_lists() {
        let sql = builder()
            .from("t")
            .where_in("id", Vec::<i64>::new())
            .where_not_in("id", Vec::<i64>::new())
            .to_sql();
        assert_eq!(sql, "SELECT * FROM `t` WHERE 0 = 1 AND 1 = 1");
    }

    #[test]
    fn test_where_in_many() {
        let sql = builder()
            .from("t")
            .where_in_many([("a", vec![SqlValue::Int(1)]), ("b", vec![SqlValue::Int(2)])])
            .to_sql();
        assert_eq!(sql, "SELECT * FROM `t` WHERE `a` IN (?) AND `b` IN (?)");
    }

    #[test]
    fn test_where_in_sub_appends_sub_bindings() {
        let base = builder();
        let inner = base.for_nested().from("admins").select(["user_id"]).where_eq("level", 9);
        let (sql, bindings) = base
            .from("users")
            .where_eq("active", 1)
            .where_in_sub("id", inner)
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `users` WHERE `active` = ? AND `id` IN (SELECT `user_id` FROM `admins` WHERE `level` = ?)"
        );
        assert_eq!(bindings, vec![SqlValue::Int(1), SqlValue::Int(9)]);
    }

    #[test]
    fn test_where_in_sub_closure_and_text() {
        let sql = builder()
            .from("users")
            .where_in_sub("id", crate::sub(|q| q.from("admins").select(["id"])))
            .where_not_in_sub("id", "SELECT id FROM banned")
            .to_sql();
        assert_eq!(
            sql,
            "SELECT * FROM `users` WHERE `id` IN (SELECT `id` FROM `admins`) AND `id` NOT IN (SELECT id FROM banned)"
        );
    }

    #[test]
    fn test_empty_text_subquery_is_invalid() {
        let result = builder().from("t").where_in_sub("id", "  ").build();
        assert!(matches!(
            result.unwrap_err().as_build(),
            Some(BuildError::InvalidSubquery(_))
        ));
    }

    #[test]
    fn test_between() {
        let (sql, bindings) = builder()
            .from("t")
            .where_between("age", 18, 30)
            .or_where_not_between("score", 1.5, 2.5)
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `t` WHERE `age` BETWEEN ? AND ? OR `score` NOT BETWEEN ? AND ?"
        );
        assert_eq!(
            bindings,
            vec![
                SqlValue::Int(18),
                SqlValue::Int(30),
                SqlValue::Float(1.5),
                SqlValue::Float(2.5)
            ]
        );
    }

    #[test]
    fn test_like_with_column_and_sub() {
        let base = builder();
        let name = base.for_nested().from("profiles").select(["name"]).limit(1);
        let (sql, bindings) = base
            .from("t")
            .where_like("title", "%rust%")
            .or_where_like(name, "A%")
            .where_not_like(crate::raw("LOWER(tag)"), "x%")
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `t` WHERE `title` LIKE ? OR (SELECT `name` FROM `profiles` LIMIT ?) LIKE ? AND LOWER(tag) NOT LIKE ?"
        );
        assert_eq!(
            bindings,
            vec![
                "%rust%".to_sql_value(),
                SqlValue::Int(1),
                "A%".to_sql_value(),
                "x%".to_sql_value()
            ]
        );
    }

    #[test]
    fn test_exists() {
        let sql = builder()
            .from("users")
            .where_exists(crate::sub(|q| {
                q.from("posts").where_raw("posts.user_id = users.id", [])
            }))
            .or_where_not_exists("SELECT 1")
            .to_sql();
        assert_eq!(
            sql,
            "SELECT * FROM `users` WHERE EXISTS (SELECT * FROM `posts` WHERE posts.user_id = users.id) OR NOT EXISTS (SELECT 1)"
        );
    }

    #[test]
    fn test_quantified() {
        let sql = builder()
            .from("t")
            .where_any("a", "=", "SELECT x FROM u")
            .or_where_all("b", ">", "SELECT y FROM v")
            .where_some("c", "<", "SELECT z FROM w")
            .to_sql();
        assert_eq!(
            sql,
            "SELECT * FROM `t` WHERE `a` = ANY (SELECT x FROM u) OR `b` > ALL (SELECT y FROM v) AND `c` < SOME (SELECT z FROM w)"
        );
    }

    #[test]
    fn test_sub_comparisons() {
        let base = builder();
        let max = base.for_nested().from("t2").select_raw("MAX(v)").where_eq("k", 1);
        let (sql, bindings) = base
            .from("t")
            .where_sub("v", "=", max)
            .where_sub_value("SELECT COUNT(*) FROM t3", ">", 5)
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `t` WHERE `v` = (SELECT MAX(v) FROM `t2` WHERE `k` = ?) AND (SELECT COUNT(*) FROM t3) > ?"
        );
        assert_eq!(bindings, vec![SqlValue::Int(1), SqlValue::Int(5)]);
    }

    #[test]
    fn test_having_family() {
        let (sql, bindings) = builder()
            .from("orders")
            .select(["user_id"])
            .group_by("user_id")
            .having_cmp("total", ">", 100)
            .or_having_group(|q| q.having_eq("vip", 1).having_null("banned_at"))
            .having_raw("COUNT(*) > ?", [SqlValue::Int(2)])
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT `user_id` FROM `orders` GROUP BY `user_id` HAVING `total` > ? OR (`vip` = ? AND `banned_at` IS NULL) and COUNT(*) > ?"
        );
        assert_eq!(
            bindings,
            vec![SqlValue::Int(100), SqlValue::Int(1), SqlValue::Int(2)]
        );
    }

    #[test]
    fn test_having_lists_and_ranges() {
        let sql = builder()
            .from("t")
            .group_by("k")
            .having_in("k", [1, 2])
            .having_not_in("k", [3])
            .or_having_between("s", 1, 2)
            .having_many([("c", ">=", 1)])
            .to_sql();
        assert_eq!(
            sql,
            "SELECT * FROM `t` GROUP BY `k` HAVING `k` IN (?, ?) AND `k` NOT IN (?) OR `s` BETWEEN ? AND ? AND `c` >= ?"
        );
    }
}
