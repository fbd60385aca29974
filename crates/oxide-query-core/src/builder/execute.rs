//! Statement compilation and execution.

use std::fmt::Write;
use std::sync::Arc;

use chrono::Local;
use serde::Serialize;

use super::{Assignment, BuildResult, Builder, Record, Subquery};
use crate::connection::{self, ResultSet, Row};
use crate::error::{BuildError, QueryError, Result};
use crate::expression::Expression;
use crate::processor::InsertId;
use crate::query::{Clause, Fragment};
use crate::value::{SqlValue, ToSqlValue};

/// Page size used by [`Builder::get_for_page`] when none is set.
pub const DEFAULT_PER_PAGE: u64 = 15;

/// Column written by [`Builder::soft_delete`] and cleared by
/// [`Builder::restore`].
const SOFT_DELETE_COLUMN: &str = "deleted_at";

const SOFT_DELETE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One page of results with the total row count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// Rows of the page.
    pub items: Vec<Row>,
    /// Rows matching the query without paging.
    pub total: u64,
    /// Page number, starting at 1.
    pub current_page: u64,
    /// Page size.
    pub per_page: u64,
    /// Number of the last page, at least 1.
    pub last_page: u64,
}

// Compilation

impl Builder {
    fn insert_value(
        &self,
        assignment: Assignment,
        bindings: &mut Vec<SqlValue>,
    ) -> BuildResult<Fragment> {
        match assignment {
            Assignment::Value(value) => {
                bindings.push(value);
                Ok(Fragment::from("?"))
            }
            Assignment::Raw(expression) => {
                let (sql, bind_value) = expression.into_parts();
                bindings.extend(bind_value);
                Ok(Fragment::Raw(Expression::new(sql)))
            }
            Assignment::Sub(query) => {
                let (sql, sub_bindings) = self.parse_sub(query)?;
                bindings.extend(sub_bindings);
                Ok(Fragment::Text(format!("({sql})")))
            }
        }
    }

    /// Compiles an INSERT of one or more rows.
    ///
    /// The column list comes from the first row. Every other row must set the
    /// same columns; their values are emitted in the first row's order. No rows,
    /// or a single empty row, compiles to `DEFAULT VALUES`. Several empty rows
    /// are rejected since `DEFAULT VALUES` inserts exactly one.
    pub fn to_insert_sql(&self, rows: Vec<Record>) -> BuildResult<(String, Vec<SqlValue>)> {
        self.check()?;
        let mut bindings = self.query.bindings(Clause::Froms).to_vec();
        let mut rows = rows.into_iter();
        let Some(first) = rows.next() else {
            return Ok((self.grammar.compile_insert(&self.query, &[]), bindings));
        };
        let columns = first.columns().map(String::from).collect::<Vec<_>>();
        if columns.is_empty() && !rows.as_slice().is_empty() {
            return Err(BuildError::InvalidArgument(String::from(
                "cannot insert several rows that set no columns",
            )));
        }

        let mut compiled = Vec::new();
        let mut row = Vec::with_capacity(columns.len());
        for (column, assignment) in first.into_entries() {
            row.push((column, self.insert_value(assignment, &mut bindings)?));
        }
        compiled.push(row);

        for (index, mut record) in rows.enumerate() {
            let mismatch = || {
                BuildError::InvalidArgument(format!(
                    "insert row {} does not set the columns of the first row",
                    index + 1
                ))
            };
            if record.len() != columns.len() {
                return Err(mismatch());
            }
            let mut row = Vec::with_capacity(columns.len());
            for column in &columns {
                let assignment = record.take(column).ok_or_else(mismatch)?;
                row.push((column.clone(), self.insert_value(assignment, &mut bindings)?));
            }
            compiled.push(row);
        }

        Ok((self.grammar.compile_insert(&self.query, &compiled), bindings))
    }

    /// Compiles `INSERT INTO table (columns) <sub-select>`.
    pub fn to_insert_sub_sql(
        &self,
        columns: &[String],
        query: Subquery,
    ) -> BuildResult<(String, Vec<SqlValue>)> {
        self.check()?;
        let (sub_sql, sub_bindings) = self.parse_sub(query)?;
        let mut bindings = self.query.bindings(Clause::Froms).to_vec();
        bindings.extend(sub_bindings);
        let sql = self
            .grammar
            .compile_insert_using(&self.query, columns, &sub_sql);
        Ok((sql, bindings))
    }

    /// Compiles an UPDATE.
    ///
    /// Bindings follow the statement: FROM, joins, SET values, then WHERE.
    pub fn to_update_sql(&self, values: Record) -> BuildResult<(String, Vec<SqlValue>)> {
        self.check()?;
        if values.is_empty() {
            return Err(BuildError::InvalidArgument(String::from(
                "update requires at least one column",
            )));
        }
        let mut bindings = self.query.bindings(Clause::Froms).to_vec();
        bindings.extend(self.query.bindings(Clause::Joins).iter().cloned());

        let mut assignments = Vec::with_capacity(values.len());
        for (column, assignment) in values.into_entries() {
            let fragment = self.insert_value(assignment, &mut bindings)?;
            assignments.push((column, fragment));
        }
        bindings.extend(self.query.bindings(Clause::Wheres).iter().cloned());

        let sql = self.grammar.compile_update(&self.query, &assignments);
        Ok((sql, bindings))
    }

    /// Compiles a DELETE. Bindings: FROM, joins, then WHERE.
    pub fn to_delete_sql(&self) -> BuildResult<(String, Vec<SqlValue>)> {
        self.check()?;
        let bindings = [Clause::Froms, Clause::Joins, Clause::Wheres]
            .into_iter()
            .flat_map(|clause| self.query.bindings(clause).iter().cloned())
            .collect();
        Ok((self.grammar.compile_delete(&self.query), bindings))
    }

    /// Compiles the aggregate count wrapper. The wrapper adds no binding.
    pub fn to_count_sql(&self) -> BuildResult<(String, Vec<SqlValue>)> {
        self.check()?;
        Ok((self.grammar.compile_count(&self.query), self.get_bindings()))
    }

    /// Compiles `SELECT EXISTS(<select>)`.
    pub fn to_exists_sql(&self) -> BuildResult<(String, Vec<SqlValue>)> {
        let (sql, bindings) = self.compile()?;
        let sql = format!(
            "SELECT EXISTS({sql}) AS {}",
            self.grammar.quote_identifier("exists")
        );
        Ok((sql, bindings))
    }
}

// Execution

impl Builder {
    async fn run(&self, sql: String, bindings: Vec<SqlValue>) -> Result<ResultSet> {
        connection::run(self.connection.as_ref(), sql, bindings, self.debug).await
    }

    fn guard_empty(&self, empty: bool) -> Result<()> {
        match &self.not_found {
            Some(message) if empty => Err(QueryError::NotFound(message.clone())),
            _ => Ok(()),
        }
    }

    /// Runs the SELECT and returns every row.
    pub async fn get(&self) -> Result<Vec<Row>> {
        let (sql, bindings) = self.compile()?;
        let mut result = self.run(sql, bindings).await?;
        let rows = result.fetch_all_associative();
        result.free();
        self.guard_empty(rows.is_empty())?;
        Ok(rows)
    }

    /// Runs the SELECT with `LIMIT 1` and returns the row, if any.
    pub async fn first(self) -> Result<Option<Row>> {
        let builder = self.limit(1);
        let (sql, bindings) = builder.compile()?;
        let mut result = builder.run(sql, bindings).await?;
        let row = result.fetch_first();
        result.free();
        builder.guard_empty(row.is_none())?;
        Ok(row)
    }

    /// Finds the row whose `id` equals `id`.
    pub async fn find(self, id: impl ToSqlValue) -> Result<Option<Row>> {
        self.find_by("id", id).await
    }

    /// Finds the first row whose `column` equals `value`.
    pub async fn find_by(self, column: &str, value: impl ToSqlValue) -> Result<Option<Row>> {
        self.where_eq(column, value).first().await
    }

    /// Returns the first column of the first row, selecting only `column`.
    pub async fn value(mut self, column: &str) -> Result<Option<SqlValue>> {
        self.query.reset(Clause::Columns);
        let row = self.select([column]).first().await?;
        Ok(row.and_then(|row| row.get_index(0).cloned()))
    }

    /// Returns whether the SELECT yields at least one row.
    pub async fn exists(&self) -> Result<bool> {
        let (sql, bindings) = self.to_exists_sql()?;
        let mut result = self.run(sql, bindings).await?;
        let value = result.fetch_first_column().into_iter().next();
        result.free();
        Ok(match value {
            Some(SqlValue::Bool(flag)) => flag,
            Some(other) => other.as_i64().is_some_and(|n| n != 0),
            None => false,
        })
    }

    /// Counts the rows of the whole SELECT, including its LIMIT and OFFSET.
    pub async fn count(&self) -> Result<u64> {
        let (sql, bindings) = self.to_count_sql()?;
        let mut result = self.run(sql, bindings).await?;
        let count = result
            .fetch_first_column()
            .first()
            .and_then(SqlValue::as_i64)
            .unwrap_or(0);
        result.free();
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Runs one page of the SELECT and counts the unpaged total.
    ///
    /// The page and its size come from [`Builder::current_page`] (default 1)
    /// and [`Builder::per_page`] (default [`DEFAULT_PER_PAGE`]).
    pub async fn get_for_page(self) -> Result<Page> {
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE).max(1);
        let current_page = self.current_page.unwrap_or(1).max(1);
        let counter = self.clone();

        let items = self.for_page(current_page, per_page).get().await?;
        let total = counter.count().await?;
        Ok(Page {
            items,
            total,
            current_page,
            per_page,
            last_page: total.div_ceil(per_page).max(1),
        })
    }

    /// Inserts one row and returns the affected row count.
    ///
    /// An empty record inserts `DEFAULT VALUES`.
    pub async fn insert(&self, values: Record) -> Result<u64> {
        self.insert_many(vec![values]).await
    }

    /// Inserts several rows in one statement.
    pub async fn insert_many(&self, rows: Vec<Record>) -> Result<u64> {
        let (sql, bindings) = self.to_insert_sql(rows)?;
        Ok(self.run(sql, bindings).await?.row_count())
    }

    /// Inserts one row and returns its generated id, via the processor.
    pub async fn insert_get_id(&self, values: Record, sequence: Option<&str>) -> Result<InsertId> {
        let processor = Arc::clone(&self.processor);
        processor
            .process_insert_get_id(self, values, sequence)
            .await
    }

    /// `INSERT INTO table (columns) <sub-select>`.
    pub async fn insert_sub<I, S>(&self, columns: I, query: impl Into<Subquery>) -> Result<u64>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect::<Vec<_>>();
        let (sql, bindings) = self.to_insert_sub_sql(&columns, query.into())?;
        Ok(self.run(sql, bindings).await?.row_count())
    }

    /// Updates the matching rows and returns the affected row count.
    pub async fn update(&self, values: Record) -> Result<u64> {
        let (sql, bindings) = self.to_update_sql(values)?;
        Ok(self.run(sql, bindings).await?.row_count())
    }

    fn step(&self, column: &str, sign: char, amount: SqlValue, extra: Record) -> Record {
        let column_sql = self.grammar.quote_column(column);
        let assignment = Expression::with_binding(format!("{column_sql} {sign} ?"), amount);
        Record::new().set(column, assignment).merge(extra)
    }

    /// `SET col = col + ?`, plus the `extra` assignments.
    pub async fn increment(
        &self,
        column: &str,
        amount: impl ToSqlValue,
        extra: Record,
    ) -> Result<u64> {
        let values = self.step(column, '+', amount.to_sql_value(), extra);
        self.update(values).await
    }

    /// `SET col = col - ?`, plus the `extra` assignments.
    pub async fn decrement(
        &self,
        column: &str,
        amount: impl ToSqlValue,
        extra: Record,
    ) -> Result<u64> {
        let values = self.step(column, '-', amount.to_sql_value(), extra);
        self.update(values).await
    }

    /// Deletes the matching rows and returns the affected row count.
    pub async fn delete(&self) -> Result<u64> {
        let (sql, bindings) = self.to_delete_sql()?;
        Ok(self.run(sql, bindings).await?.row_count())
    }

    /// Sets `deleted_at` to the current local time.
    pub async fn soft_delete(&self) -> Result<u64> {
        self.soft_delete_column(SOFT_DELETE_COLUMN, SOFT_DELETE_FORMAT)
            .await
    }

    /// Sets `column` to the current local time, formatted with a chrono
    /// `strftime` pattern.
    pub async fn soft_delete_column(&self, column: &str, format: &str) -> Result<u64> {
        let mut stamp = String::new();
        write!(stamp, "{}", Local::now().naive_local().format(format)).map_err(|_| {
            BuildError::InvalidArgument(format!("invalid timestamp format `{format}`"))
        })?;
        self.update(Record::new().set(column, stamp)).await
    }

    /// Clears `deleted_at`.
    pub async fn restore(&self) -> Result<u64> {
        self.restore_column(SOFT_DELETE_COLUMN).await
    }

    /// Sets `column` back to NULL.
    pub async fn restore_column(&self, column: &str) -> Result<u64> {
        self.update(Record::new().set(column, SqlValue::Null)).await
    }
}
