//! SQL grammars.
//!
//! A grammar is a stateless compiler: it reads a [`Query`] and renders each
//! clause, then assembles the clauses in their canonical order. Clauses that
//! hold nothing are left out of the statement, so a builder never produces an
//! empty `WHERE`. Dialects implement [`Grammar::name`] and override the hooks
//! that differ (quoting, row locks, savepoints).

mod mysql;

use std::fmt;

use crate::query::{Clause, Fragment, Query};

pub use mysql::MySqlGrammar;

/// Strips one leading `AND`/`OR` connective (any case) from a fragment.
///
/// The first predicate of a `WHERE`, `HAVING` or `ON` list needs no
/// connective. Fragments that start with anything else, such as a comma, are
/// returned untouched.
#[must_use]
pub fn first_join_replace(fragment: &str) -> String {
    let trimmed = fragment.trim_start();
    for keyword in ["and", "or"] {
        let Some((head, rest)) = trimmed.split_at_checked(keyword.len()) else {
            continue;
        };
        if head.eq_ignore_ascii_case(keyword) && rest.starts_with(char::is_whitespace) {
            return String::from(rest.trim_start());
        }
    }
    String::from(fragment)
}

fn join_fragments(fragments: &[Fragment], separator: &str) -> String {
    fragments
        .iter()
        .map(Fragment::as_sql)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Trait for dialect-specific SQL compilation.
pub trait Grammar: fmt::Debug + Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character.
    fn identifier_quote(&self) -> char {
        '`'
    }

    /// Quotes a single identifier segment. `*` and already quoted segments
    /// pass through.
    fn quote_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        let name = name.trim();
        if name == "*" || (name.len() > 1 && name.starts_with(quote) && name.ends_with(quote)) {
            return String::from(name);
        }
        let escaped = name.replace(quote, &format!("{quote}{quote}"));
        format!("{quote}{escaped}{quote}")
    }

    /// Quotes a dotted column path: `a.b` becomes `` `a`.`b` ``.
    ///
    /// A trailing `as alias` (any case) is rendered as `` AS `alias` ``.
    fn quote_column(&self, column: &str) -> String {
        if let Some((name, alias)) = split_alias(column) {
            return format!(
                "{} AS {}",
                self.quote_column(name),
                self.quote_identifier(alias)
            );
        }
        column
            .split('.')
            .map(|segment| self.quote_identifier(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quotes a table name, with the same rules as columns.
    fn quote_table(&self, table: &str) -> String {
        self.quote_column(table)
    }

    /// Compiles the selected columns.
    fn compile_columns(&self, query: &Query) -> Option<String> {
        let columns = query.queries(Clause::Columns);
        if columns.is_empty() {
            return None;
        }
        Some(join_fragments(columns, ", "))
    }

    /// Compiles the FROM clause.
    fn compile_froms(&self, query: &Query) -> Option<String> {
        let froms = query.queries(Clause::Froms);
        if froms.is_empty() {
            return None;
        }
        Some(format!("FROM {}", join_fragments(froms, ", ")))
    }

    /// Compiles the JOIN clauses.
    fn compile_joins(&self, query: &Query) -> Option<String> {
        let joins = query.queries(Clause::Joins);
        if joins.is_empty() {
            return None;
        }
        Some(join_fragments(joins, " "))
    }

    /// Compiles the WHERE clause.
    fn compile_wheres(&self, query: &Query) -> Option<String> {
        self.compile_conditions(query, Clause::Wheres, "WHERE")
    }

    /// Compiles the GROUP BY clause.
    fn compile_groups(&self, query: &Query) -> Option<String> {
        self.compile_list(query, Clause::Groups, "GROUP BY")
    }

    /// Compiles the HAVING clause.
    fn compile_havings(&self, query: &Query) -> Option<String> {
        self.compile_conditions(query, Clause::Havings, "HAVING")
    }

    /// Compiles the ORDER BY clause.
    fn compile_orders(&self, query: &Query) -> Option<String> {
        self.compile_list(query, Clause::Orders, "ORDER BY")
    }

    /// Compiles the LIMIT clause.
    fn compile_limits(&self, query: &Query) -> Option<String> {
        let limits = query.queries(Clause::Limits);
        if limits.is_empty() {
            return None;
        }
        Some(format!("LIMIT {}", join_fragments(limits, ", ")))
    }

    /// Compiles the OFFSET clause.
    fn compile_offset(&self, query: &Query) -> Option<String> {
        query
            .queries(Clause::Offset)
            .first()
            .map(|offset| format!("OFFSET {offset}"))
    }

    /// Compiles the lock clause.
    fn compile_lock(&self, query: &Query) -> Option<String> {
        query.lock().map(String::from)
    }

    /// Compiles the UNION parts.
    fn compile_unions(&self, query: &Query) -> Option<String> {
        let unions = query.queries(Clause::Unions);
        if unions.is_empty() {
            return None;
        }
        Some(join_fragments(unions, " "))
    }

    /// Compiles a boolean condition list (`WHERE`, `HAVING`).
    fn compile_conditions(&self, query: &Query, clause: Clause, keyword: &str) -> Option<String> {
        let conditions = query.queries(clause);
        if conditions.is_empty() {
            return None;
        }
        let sql = first_join_replace(&join_fragments(conditions, " "));
        Some(format!("{keyword} {sql}"))
    }

    /// Compiles a comma separated list (`GROUP BY`, `ORDER BY`).
    fn compile_list(&self, query: &Query, clause: Clause, keyword: &str) -> Option<String> {
        let entries = query.queries(clause);
        if entries.is_empty() {
            return None;
        }
        let sql = join_fragments(entries, ", ");
        Some(format!("{keyword} {}", sql.trim_start_matches(", ")))
    }

    /// Compiles a SELECT statement.
    ///
    /// The columns default to `*`; an empty query compiles to `SELECT *`.
    fn compile_select(&self, query: &Query) -> String {
        let components = [
            Some(self.compile_columns(query).unwrap_or_else(|| String::from("*"))),
            self.compile_froms(query),
            self.compile_joins(query),
            self.compile_wheres(query),
            self.compile_groups(query),
            self.compile_havings(query),
            self.compile_orders(query),
            self.compile_limits(query),
            self.compile_offset(query),
            self.compile_lock(query),
        ];
        let mut sql = format!(
            "SELECT {}",
            components.into_iter().flatten().collect::<Vec<_>>().join(" ")
        );
        if let Some(unions) = self.compile_unions(query) {
            sql.push(' ');
            sql.push_str(&unions);
        }
        sql
    }

    /// Compiles an UPDATE statement.
    ///
    /// Each assignment is a column with its value text, rendered `col = value`.
    /// A [`Fragment::Raw`] value is inlined as the right-hand side.
    fn compile_update(&self, query: &Query, assignments: &[(String, Fragment)]) -> String {
        let columns = assignments
            .iter()
            .map(|(column, value)| format!("{} = {}", self.quote_column(column), value.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        let table = self.compile_table(query);
        let wheres = self
            .compile_wheres(query)
            .map_or_else(String::new, |w| format!(" {w}"));

        match self.compile_joins(query) {
            Some(joins) => format!("UPDATE {table} {joins} SET {columns}{wheres}"),
            None => format!("UPDATE {table} SET {columns}{wheres}"),
        }
    }

    /// Compiles an INSERT statement.
    ///
    /// Rows are column/placeholder pairs; the column list is taken from the
    /// first row and every row renders one tuple. No rows compiles to
    /// `DEFAULT VALUES`.
    fn compile_insert(&self, query: &Query, rows: &[Vec<(String, Fragment)>]) -> String {
        let table = self.compile_table(query);
        let Some(first) = rows.first().filter(|row| !row.is_empty()) else {
            return format!("INSERT INTO {table} DEFAULT VALUES");
        };
        let columns = first
            .iter()
            .map(|(column, _)| column.as_str())
            .collect::<Vec<_>>();
        let columns = self.compile_column_list(&columns);
        let tuples = rows
            .iter()
            .map(|row| {
                let values = row
                    .iter()
                    .map(|(_, placeholder)| placeholder.as_sql())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({values})")
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("INSERT INTO {table} ({columns}) VALUES {tuples}")
    }

    /// Compiles an `INSERT ... SELECT` statement.
    fn compile_insert_using(&self, query: &Query, columns: &[String], sub_sql: &str) -> String {
        let table = self.compile_table(query);
        let columns = columns.iter().map(String::as_str).collect::<Vec<_>>();
        let columns = self.compile_column_list(&columns);
        format!("INSERT INTO {table} ({columns}) {sub_sql}")
    }

    /// Compiles a DELETE statement.
    fn compile_delete(&self, query: &Query) -> String {
        let parts = [
            self.compile_froms(query),
            self.compile_joins(query),
            self.compile_wheres(query),
        ];
        format!(
            "DELETE {}",
            parts.into_iter().flatten().collect::<Vec<_>>().join(" ")
        )
    }

    /// Wraps the full SELECT in an aggregate count.
    fn compile_count(&self, query: &Query) -> String {
        format!(
            "SELECT COUNT(*) AS {} FROM ({}) AS {}",
            self.quote_identifier("aggregate"),
            self.compile_select(query),
            self.quote_identifier("aggregate_table")
        )
    }

    /// Renders the FROM sources without the keyword, as UPDATE/INSERT need.
    fn compile_table(&self, query: &Query) -> String {
        join_fragments(query.queries(Clause::Froms), ", ")
    }

    /// Quotes and comma-joins column names.
    fn compile_column_list(&self, columns: &[&str]) -> String {
        columns
            .iter()
            .map(|column| self.quote_column(column))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Returns the exclusive row lock clause, if the dialect has one.
    fn lock_for_update(&self) -> Option<&'static str>;

    /// Returns the shared row lock clause, if the dialect has one.
    fn shared_lock(&self) -> Option<&'static str>;

    /// Returns whether the dialect supports savepoints.
    fn supports_savepoints(&self) -> bool {
        true
    }

    /// Compiles a savepoint creation.
    fn compile_savepoint(&self, name: &str) -> String {
        format!("SAVEPOINT {name}")
    }

    /// Compiles a rollback to a savepoint.
    fn compile_savepoint_rollback(&self, name: &str) -> String {
        format!("ROLLBACK TO SAVEPOINT {name}")
    }
}

/// Splits `expr as alias` (any case) into its parts.
fn split_alias(column: &str) -> Option<(&str, &str)> {
    let lower = column.to_ascii_lowercase();
    let index = lower.rfind(" as ")?;
    let (name, alias) = (column[..index].trim(), column[index + 4..].trim());
    if name.is_empty() || alias.is_empty() {
        return None;
    }
    Some((name, alias))
}
