//! GROUP BY, ORDER BY, paging, unions and row locks.

use super::{Builder, Direction, Subquery};
use crate::error::BuildError;
use crate::expression::Expression;
use crate::query::{Clause, Fragment};
use crate::value::{SqlValue, ToSqlValue};

impl Builder {
    fn add_column_entry(&mut self, clause: Clause, column: &str, direction: Option<Direction>) {
        let column = self.grammar.quote_column(column);
        let sql = match direction {
            Some(direction) => format!("{column} {direction}"),
            None => column,
        };
        self.append(clause, Fragment::Text(sql), []);
    }

    fn add_sub_entry(&mut self, clause: Clause, query: Subquery, direction: Option<Direction>) {
        if let Some((sql, bindings)) = self.resolve_sub(query) {
            let sql = match direction {
                Some(direction) => format!("({sql}) {direction}"),
                None => format!("({sql})"),
            };
            self.append(clause, Fragment::Text(sql), bindings);
        }
    }

    fn add_raw_entry<I>(&mut self, clause: Clause, sql: Expression, bindings: I)
    where
        I: IntoIterator<Item = SqlValue>,
    {
        self.append_expression(clause, sql);
        self.query.clause_mut(clause).bindings.extend(bindings);
    }

    fn replace_single(&mut self, clause: Clause, fragment: Fragment, bindings: Vec<SqlValue>) {
        self.query.reset(clause);
        self.append(clause, fragment, bindings);
    }

    // GROUP BY

    /// `GROUP BY col`.
    #[must_use]
    pub fn group_by(mut self, column: &str) -> Self {
        self.add_column_entry(Clause::Groups, column, None);
        self
    }

    /// `GROUP BY col ASC|DESC`.
    #[must_use]
    pub fn group_by_dir(mut self, column: &str, direction: Direction) -> Self {
        self.add_column_entry(Clause::Groups, column, Some(direction));
        self
    }

    /// `GROUP BY col ASC` for each column.
    #[must_use]
    pub fn group_by_asc<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        columns.into_iter().fold(self, |builder, column| {
            builder.group_by_dir(column.as_ref(), Direction::Asc)
        })
    }

    /// `GROUP BY col DESC` for each column.
    #[must_use]
    pub fn group_by_desc<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        columns.into_iter().fold(self, |builder, column| {
            builder.group_by_dir(column.as_ref(), Direction::Desc)
        })
    }

    /// Adds raw SQL to GROUP BY with its bindings.
    #[must_use]
    pub fn group_by_raw<I>(mut self, sql: impl Into<Expression>, bindings: I) -> Self
    where
        I: IntoIterator<Item = SqlValue>,
    {
        self.add_raw_entry(Clause::Groups, sql.into(), bindings);
        self
    }

    /// `GROUP BY (<sub-select>)`.
    #[must_use]
    pub fn group_by_sub(mut self, query: impl Into<Subquery>) -> Self {
        self.add_sub_entry(Clause::Groups, query.into(), None);
        self
    }

    // ORDER BY

    /// `ORDER BY col ASC|DESC`.
    #[must_use]
    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.add_column_entry(Clause::Orders, column, Some(direction));
        self
    }

    /// `ORDER BY col ASC` for each column.
    #[must_use]
    pub fn order_by_asc<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        columns.into_iter().fold(self, |builder, column| {
            builder.order_by(column.as_ref(), Direction::Asc)
        })
    }

    /// `ORDER BY col DESC` for each column.
    #[must_use]
    pub fn order_by_desc<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        columns.into_iter().fold(self, |builder, column| {
            builder.order_by(column.as_ref(), Direction::Desc)
        })
    }

    /// Adds raw SQL to ORDER BY with its bindings.
    #[must_use]
    pub fn order_by_raw<I>(mut self, sql: impl Into<Expression>, bindings: I) -> Self
    where
        I: IntoIterator<Item = SqlValue>,
    {
        self.add_raw_entry(Clause::Orders, sql.into(), bindings);
        self
    }

    /// `ORDER BY (<sub-select>) ASC|DESC`.
    #[must_use]
    pub fn order_by_sub(mut self, query: impl Into<Subquery>, direction: Direction) -> Self {
        self.add_sub_entry(Clause::Orders, query.into(), Some(direction));
        self
    }

    // Paging

    /// `LIMIT ?`. Replaces an earlier limit.
    #[must_use]
    pub fn limit(mut self, count: u64) -> Self {
        self.replace_single(Clause::Limits, Fragment::from("?"), vec![count.to_sql_value()]);
        self
    }

    /// `LIMIT ?, ?` (offset, count).
    #[must_use]
    pub fn limit_range(mut self, offset: u64, count: u64) -> Self {
        self.replace_single(
            Clause::Limits,
            Fragment::from("?, ?"),
            vec![offset.to_sql_value(), count.to_sql_value()],
        );
        self
    }

    /// `LIMIT <expression>`, inlined.
    #[must_use]
    pub fn limit_raw(mut self, expression: impl Into<Expression>) -> Self {
        let (sql, bind_value) = expression.into().into_parts();
        self.replace_single(
            Clause::Limits,
            Fragment::Raw(Expression::new(sql)),
            bind_value.into_iter().collect(),
        );
        self
    }

    /// `OFFSET ?`. Replaces an earlier offset.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.replace_single(Clause::Offset, Fragment::from("?"), vec![offset.to_sql_value()]);
        self
    }

    /// `OFFSET <expression>`, inlined.
    #[must_use]
    pub fn offset_raw(mut self, expression: impl Into<Expression>) -> Self {
        let (sql, bind_value) = expression.into().into_parts();
        self.replace_single(
            Clause::Offset,
            Fragment::Raw(Expression::new(sql)),
            bind_value.into_iter().collect(),
        );
        self
    }

    /// Sets the page read by [`Builder::get_for_page`], starting at 1.
    #[must_use]
    pub fn current_page(mut self, page: u64) -> Self {
        self.current_page = Some(page);
        self
    }

    /// Sets the page size read by [`Builder::get_for_page`].
    #[must_use]
    pub fn per_page(mut self, per_page: u64) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Limits the query to one page: `LIMIT per_page OFFSET (page - 1) * per_page`.
    #[must_use]
    pub fn for_page(self, page: u64, per_page: u64) -> Self {
        let offset = page.max(1).saturating_sub(1).saturating_mul(per_page);
        self.limit(per_page).offset(offset)
    }

    // UNION

    fn add_union(&mut self, query: Subquery, all: bool) {
        if let Some((sql, bindings)) = self.resolve_sub(query) {
            let keyword = if all { "UNION ALL" } else { "UNION" };
            let fragment = Fragment::Raw(Expression::new(format!("{keyword} {sql}")));
            self.append(Clause::Unions, fragment, bindings);
        }
    }

    /// Appends `UNION <sub-select>`.
    #[must_use]
    pub fn union(mut self, query: impl Into<Subquery>) -> Self {
        self.add_union(query.into(), false);
        self
    }

    /// Appends `UNION ALL <sub-select>`.
    #[must_use]
    pub fn union_all(mut self, query: impl Into<Subquery>) -> Self {
        self.add_union(query.into(), true);
        self
    }

    // Locks

    fn set_grammar_lock(&mut self, method: &str, lock: Option<&'static str>) {
        match lock {
            Some(lock) => self.query.set_lock(Some(String::from(lock))),
            None => {
                let grammar = String::from(self.grammar.name());
                self.fail(BuildError::MethodNotFound {
                    method: String::from(method),
                    grammar,
                });
            }
        }
    }

    /// Appends the grammar's exclusive row lock (`FOR UPDATE` on MySQL).
    ///
    /// Records [`BuildError::MethodNotFound`] on grammars without row locks.
    #[must_use]
    pub fn lock_for_update(mut self) -> Self {
        let lock = self.grammar.lock_for_update();
        self.set_grammar_lock("lock_for_update", lock);
        self
    }

    /// Appends the grammar's shared row lock (`LOCK IN SHARE MODE` on MySQL).
    #[must_use]
    pub fn shared_lock(mut self) -> Self {
        let lock = self.grammar.shared_lock();
        self.set_grammar_lock("shared_lock", lock);
        self
    }

    /// Sets a custom lock clause, such as `FOR UPDATE SKIP LOCKED`.
    #[must_use]
    pub fn lock(mut self, lock: impl Into<String>) -> Self {
        self.query.set_lock(Some(lock.into()));
        self
    }
}
