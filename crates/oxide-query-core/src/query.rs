//! The query representation a builder accumulates before compilation.

use std::fmt;

use crate::expression::Expression;
use crate::value::SqlValue;

/// A named section of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clause {
    /// Selected columns.
    Columns,
    /// FROM sources.
    Froms,
    /// JOIN clauses (ON conditions for a [`JoinClause`](crate::JoinClause)).
    Joins,
    /// WHERE conditions.
    Wheres,
    /// GROUP BY entries.
    Groups,
    /// HAVING conditions.
    Havings,
    /// ORDER BY entries.
    Orders,
    /// LIMIT values.
    Limits,
    /// The OFFSET value.
    Offset,
    /// UNION parts.
    Unions,
}

impl Clause {
    /// Order in which clause bindings are flattened for a SELECT.
    ///
    /// Matches the order the placeholders appear in the compiled SQL.
    pub const BINDING_ORDER: [Self; 10] = [
        Self::Columns,
        Self::Froms,
        Self::Joins,
        Self::Wheres,
        Self::Groups,
        Self::Havings,
        Self::Orders,
        Self::Limits,
        Self::Offset,
        Self::Unions,
    ];

    /// Returns the clause name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Columns => "columns",
            Self::Froms => "froms",
            Self::Joins => "joins",
            Self::Wheres => "wheres",
            Self::Groups => "groups",
            Self::Havings => "havings",
            Self::Orders => "orders",
            Self::Limits => "limits",
            Self::Offset => "offset",
            Self::Unions => "unions",
        }
    }
}

/// One entry of a clause: grammar-ready text or a raw expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Text already formatted by the builder.
    Text(String),
    /// Literal SQL, inlined as-is.
    Raw(Expression),
}

impl Fragment {
    /// Returns the SQL text of the fragment.
    #[must_use]
    pub fn as_sql(&self) -> &str {
        match self {
            Self::Text(s) => s,
            Self::Raw(e) => e.value(),
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl From<&str> for Fragment {
    fn from(value: &str) -> Self {
        Self::Text(String::from(value))
    }
}

impl From<String> for Fragment {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Expression> for Fragment {
    fn from(value: Expression) -> Self {
        Self::Raw(value)
    }
}

/// Queries and bindings accumulated for one clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClauseState {
    /// Fragments in the order they were pushed.
    pub queries: Vec<Fragment>,
    /// Values for the placeholders in `queries`, in placeholder order.
    pub bindings: Vec<SqlValue>,
}

impl ClauseState {
    /// Returns true when no fragment was pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Returns the fragments' SQL text.
    pub fn sql(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(Fragment::as_sql)
    }

    fn clear(&mut self) {
        self.queries.clear();
        self.bindings.clear();
    }
}

/// Everything a builder knows about the statement it is building.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    columns: ClauseState,
    froms: ClauseState,
    joins: ClauseState,
    wheres: ClauseState,
    groups: ClauseState,
    havings: ClauseState,
    orders: ClauseState,
    limits: ClauseState,
    offset: ClauseState,
    unions: ClauseState,
    lock: Option<String>,
}

impl Query {
    /// Creates an empty representation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state of a clause.
    #[must_use]
    pub const fn clause(&self, clause: Clause) -> &ClauseState {
        match clause {
            Clause::Columns => &self.columns,
            Clause::Froms => &self.froms,
            Clause::Joins => &self.joins,
            Clause::Wheres => &self.wheres,
            Clause::Groups => &self.groups,
            Clause::Havings => &self.havings,
            Clause::Orders => &self.orders,
            Clause::Limits => &self.limits,
            Clause::Offset => &self.offset,
            Clause::Unions => &self.unions,
        }
    }

    /// Returns the state of a clause for writing.
    pub fn clause_mut(&mut self, clause: Clause) -> &mut ClauseState {
        match clause {
            Clause::Columns => &mut self.columns,
            Clause::Froms => &mut self.froms,
            Clause::Joins => &mut self.joins,
            Clause::Wheres => &mut self.wheres,
            Clause::Groups => &mut self.groups,
            Clause::Havings => &mut self.havings,
            Clause::Orders => &mut self.orders,
            Clause::Limits => &mut self.limits,
            Clause::Offset => &mut self.offset,
            Clause::Unions => &mut self.unions,
        }
    }

    /// Returns the fragments of a clause.
    #[must_use]
    pub fn queries(&self, clause: Clause) -> &[Fragment] {
        &self.clause(clause).queries
    }

    /// Returns the bindings of a clause.
    #[must_use]
    pub fn bindings(&self, clause: Clause) -> &[SqlValue] {
        &self.clause(clause).bindings
    }

    /// Returns true when the clause holds no fragment.
    #[must_use]
    pub fn is_empty(&self, clause: Clause) -> bool {
        self.clause(clause).is_empty()
    }

    /// Removes every fragment and binding of a clause.
    pub fn reset(&mut self, clause: Clause) {
        self.clause_mut(clause).clear();
    }

    /// Returns the lock clause.
    #[must_use]
    pub fn lock(&self) -> Option<&str> {
        self.lock.as_deref()
    }

    /// Sets or clears the lock clause.
    pub fn set_lock(&mut self, lock: Option<String>) {
        self.lock = lock;
    }

    /// Flattens the bindings of every clause in [`Clause::BINDING_ORDER`].
    #[must_use]
    pub fn flatten_bindings(&self) -> Vec<SqlValue> {
        Clause::BINDING_ORDER
            .iter()
            .flat_map(|clause| self.bindings(*clause).iter().cloned())
            .collect()
    }
}
