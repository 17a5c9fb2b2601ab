//! SELECT, compound SELECT and FROM-clause nodes.

use super::expression::{ColumnRef, ColumnSource, Expr, OrderBy, TableAlias};
use crate::schema::Table;

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    /// INNER JOIN.
    Inner,
    /// LEFT OUTER JOIN.
    Left,
    /// RIGHT OUTER JOIN.
    Right,
    /// FULL OUTER JOIN.
    Full,
    /// CROSS JOIN.
    Cross,
}

impl JoinType {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "JOIN",
            Self::Left => "LEFT OUTER JOIN",
            Self::Right => "RIGHT OUTER JOIN",
            Self::Full => "FULL OUTER JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

/// A JOIN between two FROM items.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Join {
    /// Left side.
    pub left: FromItem,
    /// Right side.
    pub right: FromItem,
    /// Join type.
    pub join_type: JoinType,
    /// ON condition (absent for CROSS joins).
    pub on: Option<Expr>,
}

/// An item of a FROM clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FromItem {
    /// A table.
    Table(Table),
    /// An aliased table.
    Alias(TableAlias),
    /// A subquery with an alias; `lateral` lets it see preceding items.
    Derived {
        query: Box<Query>,
        alias: String,
        lateral: bool,
    },
    /// A join.
    Join(Box<Join>),
    /// A reference to a CTE by name.
    Cte(String),
}

impl FromItem {
    /// Joins `right` with an INNER JOIN.
    #[must_use]
    pub fn join(self, right: impl Into<Self>, on: Expr) -> Self {
        self.join_with(JoinType::Inner, right, Some(on))
    }

    /// Joins `right` with a LEFT OUTER JOIN.
    #[must_use]
    pub fn left_join(self, right: impl Into<Self>, on: Expr) -> Self {
        self.join_with(JoinType::Left, right, Some(on))
    }

    /// Joins `right` with a CROSS JOIN.
    #[must_use]
    pub fn cross_join(self, right: impl Into<Self>) -> Self {
        self.join_with(JoinType::Cross, right, None)
    }

    /// Joins `right` with an explicit type and optional condition.
    #[must_use]
    pub fn join_with(self, join_type: JoinType, right: impl Into<Self>, on: Option<Expr>) -> Self {
        Self::Join(Box::new(Join {
            left: self,
            right: right.into(),
            join_type,
            on,
        }))
    }

    /// Collects the tables this item draws from, left to right.
    pub(crate) fn tables<'a>(&'a self, out: &mut Vec<(Option<&'a str>, &'a Table)>) {
        match self {
            Self::Table(table) => out.push((None, table)),
            Self::Alias(alias) => out.push((Some(&alias.name), &alias.table)),
            Self::Join(join) => {
                join.left.tables(out);
                join.right.tables(out);
            }
            Self::Derived { .. } | Self::Cte(_) => {}
        }
    }
}

impl From<TableAlias> for FromItem {
    fn from(alias: TableAlias) -> Self {
        Self::Alias(alias)
    }
}

/// A common table expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cte {
    /// Name.
    pub name: String,
    /// Optional column list.
    pub columns: Vec<String>,
    /// The defining query.
    pub query: Box<Query>,
    /// `WITH RECURSIVE`.
    pub recursive: bool,
}

impl Cte {
    /// Creates a CTE.
    #[must_use]
    pub fn new(name: impl Into<String>, query: impl Into<Query>) -> Self {
        Self {
            name: name.into(),
            columns: vec![],
            query: Box::new(query.into()),
            recursive: false,
        }
    }

    /// Marks the CTE recursive.
    #[must_use]
    pub const fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// Sets the column list.
    #[must_use]
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| String::from(*c)).collect();
        self
    }

    /// Returns a column reference qualified by the CTE name.
    #[must_use]
    pub fn c(&self, name: &str) -> Expr {
        derived_column(&self.name, &self.query, name)
    }
}

fn derived_column(alias: &str, query: &Query, name: &str) -> Expr {
    let sql_type = query
        .selected_columns()
        .iter()
        .find(|e| e.output_name() == Some(name))
        .map(Expr::sql_type)
        .unwrap_or_default();
    Expr::Column(ColumnRef {
        source: Some(ColumnSource::Derived(String::from(alias))),
        name: String::from(name),
        sql_type,
    })
}

/// A SELECT statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Select {
    /// WITH clause.
    pub ctes: Vec<Cte>,
    /// DISTINCT.
    pub distinct: bool,
    /// Output columns.
    pub columns: Vec<Expr>,
    /// FROM items; empty means "infer from the columns".
    pub from: Vec<FromItem>,
    /// WHERE condition.
    pub where_clause: Option<Expr>,
    /// GROUP BY expressions.
    pub group_by: Vec<Expr>,
    /// HAVING condition.
    pub having: Option<Expr>,
    /// ORDER BY entries.
    pub order_by: Vec<OrderBy>,
    /// Row limit.
    pub limit: Option<u64>,
    /// Row offset.
    pub offset: Option<u64>,
    /// Set on the outer query produced by ROW_NUMBER offset emulation.
    pub row_number_wrapped: bool,
}

impl Select {
    /// Creates a SELECT of the given columns.
    #[must_use]
    pub fn new(columns: Vec<Expr>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    /// Adds a FROM item.
    #[must_use]
    pub fn from(mut self, item: impl Into<FromItem>) -> Self {
        self.from.push(item.into());
        self
    }

    /// Sets DISTINCT.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Adds a WHERE condition, AND-ed with any existing one.
    #[must_use]
    pub fn where_clause(mut self, expr: Expr) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Adds GROUP BY expressions.
    #[must_use]
    pub fn group_by(mut self, exprs: Vec<Expr>) -> Self {
        self.group_by.extend(exprs);
        self
    }

    /// Sets HAVING.
    #[must_use]
    pub fn having(mut self, expr: Expr) -> Self {
        self.having = Some(expr);
        self
    }

    /// Adds an ORDER BY entry.
    #[must_use]
    pub fn order_by(mut self, entry: impl Into<OrderBy>) -> Self {
        self.order_by.push(entry.into());
        self
    }

    /// Sets LIMIT.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Sets OFFSET.
    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Adds a CTE.
    #[must_use]
    pub fn with(mut self, cte: Cte) -> Self {
        self.ctes.push(cte);
        self
    }

    /// Uses this select as a derived table.
    #[must_use]
    pub fn alias(self, alias: impl Into<String>) -> FromItem {
        FromItem::Derived {
            query: Box::new(Query::Select(self)),
            alias: alias.into(),
            lateral: false,
        }
    }

    /// Uses this select as a LATERAL derived table.
    #[must_use]
    pub fn lateral(self, alias: impl Into<String>) -> FromItem {
        FromItem::Derived {
            query: Box::new(Query::Select(self)),
            alias: alias.into(),
            lateral: true,
        }
    }

    /// Uses this select as a scalar subquery.
    #[must_use]
    pub fn as_scalar(self) -> Expr {
        Expr::Subquery(Box::new(Query::Select(self)))
    }

    /// `self UNION other`.
    #[must_use]
    pub fn union(self, other: impl Into<Query>) -> Compound {
        Compound::new(SetOp::Union, self, other)
    }

    /// `self UNION ALL other`.
    #[must_use]
    pub fn union_all(self, other: impl Into<Query>) -> Compound {
        Compound::new(SetOp::UnionAll, self, other)
    }

    /// `self INTERSECT other`.
    #[must_use]
    pub fn intersect(self, other: impl Into<Query>) -> Compound {
        Compound::new(SetOp::Intersect, self, other)
    }

    /// `self EXCEPT other`.
    #[must_use]
    pub fn except(self, other: impl Into<Query>) -> Compound {
        Compound::new(SetOp::Except, self, other)
    }
}

/// Set operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOp {
    /// UNION.
    Union,
    /// UNION ALL.
    UnionAll,
    /// INTERSECT.
    Intersect,
    /// EXCEPT.
    Except,
}

impl SetOp {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::UnionAll => "UNION ALL",
            Self::Intersect => "INTERSECT",
            Self::Except => "EXCEPT",
        }
    }
}

/// A compound SELECT joined by one set operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Compound {
    /// The operator.
    pub op: SetOp,
    /// Member queries, at least two.
    pub queries: Vec<Query>,
    /// ORDER BY over the whole result.
    pub order_by: Vec<OrderBy>,
    /// Row limit over the whole result.
    pub limit: Option<u64>,
    /// Row offset over the whole result.
    pub offset: Option<u64>,
}

impl Compound {
    fn new(op: SetOp, first: impl Into<Query>, second: impl Into<Query>) -> Self {
        Self {
            op,
            queries: vec![first.into(), second.into()],
            order_by: vec![],
            limit: None,
            offset: None,
        }
    }

    /// Appends another member under the same operator.
    #[must_use]
    pub fn and_then(mut self, query: impl Into<Query>) -> Self {
        self.queries.push(query.into());
        self
    }

    /// Adds an ORDER BY entry.
    #[must_use]
    pub fn order_by(mut self, entry: impl Into<OrderBy>) -> Self {
        self.order_by.push(entry.into());
        self
    }

    /// Sets LIMIT.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Sets OFFSET.
    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }
}

/// A query: a plain or a compound SELECT.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    /// Plain SELECT.
    Select(Select),
    /// Compound SELECT.
    Compound(Compound),
}

impl Query {
    /// Returns the output columns (of the first member for compounds).
    #[must_use]
    pub fn selected_columns(&self) -> &[Expr] {
        match self {
            Self::Select(select) => &select.columns,
            Self::Compound(compound) => match compound.queries.first() {
                Some(first) => first.selected_columns(),
                None => &[],
            },
        }
    }

    /// Uses this query as a derived table.
    #[must_use]
    pub fn alias(self, alias: impl Into<String>) -> FromItem {
        FromItem::Derived {
            query: Box::new(self),
            alias: alias.into(),
            lateral: false,
        }
    }
}

impl From<Select> for Query {
    fn from(select: Select) -> Self {
        Self::Select(select)
    }
}

impl From<Compound> for Query {
    fn from(compound: Compound) -> Self {
        Self::Compound(compound)
    }
}

/// Returns a column of a derived table by output name.
#[must_use]
pub fn derived_col(item: &FromItem, name: &str) -> Option<Expr> {
    match item {
        FromItem::Derived { query, alias, .. } => Some(derived_column(alias, query, name)),
        _ => None,
    }
}

/// Creates a SELECT of the given columns.
#[must_use]
pub fn select(columns: Vec<Expr>) -> Select {
    Select::new(columns)
}
