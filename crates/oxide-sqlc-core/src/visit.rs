//! Read-only pre-order traversal of statement trees.
//!
//! [`walk`] visits every node of a statement in a fixed order, calling the
//! matching [`Visitor`] hook before descending into the node's children.
//! The order matches the order in which the compiler renders clauses, so
//! anything collected here lines up with the compiled output.

use crate::ast::{
    BindParam, ColumnSource, Cte, Expr, FromItem, Insert, InsertSource, OrderBy, Query, Select,
    Statement,
};
use crate::schema::Table;

/// Callbacks invoked by [`walk`]. All hooks default to doing nothing.
pub trait Visitor {
    /// Called for every expression.
    fn visit_expr(&mut self, _expr: &Expr) {}

    /// Called for every bind parameter, after its enclosing `visit_expr`.
    fn visit_bind(&mut self, _bind: &BindParam) {}

    /// Called for every table reference (FROM items, column qualifiers and
    /// DML targets).
    fn visit_table(&mut self, _table: &Table) {}

    /// Called for every SELECT, including nested ones.
    fn visit_select(&mut self, _select: &Select) {}

    /// Whether [`walk_expr`] descends into subquery expressions.
    fn enter_subqueries(&self) -> bool {
        true
    }
}

/// Walks a statement.
pub fn walk<V: Visitor + ?Sized>(visitor: &mut V, statement: &Statement) {
    match statement {
        Statement::Query(query) => walk_query(visitor, query),
        Statement::Insert(insert) => walk_insert(visitor, insert),
        Statement::Update(update) => {
            visitor.visit_table(&update.table);
            for (_, expr) in &update.assignments {
                walk_expr(visitor, expr);
            }
            if let Some(expr) = &update.where_clause {
                walk_expr(visitor, expr);
            }
            walk_exprs(visitor, &update.returning);
        }
        Statement::Delete(delete) => {
            visitor.visit_table(&delete.table);
            if let Some(expr) = &delete.where_clause {
                walk_expr(visitor, expr);
            }
            walk_exprs(visitor, &delete.returning);
        }
        Statement::CreateTable { table, .. } | Statement::DropTable { table, .. } => {
            visitor.visit_table(table);
        }
        Statement::CreateIndex(index) | Statement::DropIndex(index) => {
            visitor.visit_table(&index.table);
        }
    }
}

fn walk_insert<V: Visitor + ?Sized>(visitor: &mut V, insert: &Insert) {
    visitor.visit_table(&insert.table);
    match &insert.source {
        InsertSource::DefaultValues => {}
        InsertSource::Values { rows, .. } => {
            for row in rows {
                walk_exprs(visitor, row);
            }
        }
        InsertSource::Select { query, .. } => walk_query(visitor, query),
    }
    walk_exprs(visitor, &insert.returning);
}

/// Walks a query.
pub fn walk_query<V: Visitor + ?Sized>(visitor: &mut V, query: &Query) {
    match query {
        Query::Select(select) => walk_select(visitor, select),
        Query::Compound(compound) => {
            for member in &compound.queries {
                walk_query(visitor, member);
            }
            walk_order_by(visitor, &compound.order_by);
        }
    }
}

/// Walks a SELECT in clause order: CTEs, columns, FROM, WHERE, GROUP BY,
/// HAVING, ORDER BY.
pub fn walk_select<V: Visitor + ?Sized>(visitor: &mut V, select: &Select) {
    visitor.visit_select(select);
    for Cte { query, .. } in &select.ctes {
        walk_query(visitor, query);
    }
    walk_exprs(visitor, &select.columns);
    for item in &select.from {
        walk_from(visitor, item);
    }
    if let Some(expr) = &select.where_clause {
        walk_expr(visitor, expr);
    }
    walk_exprs(visitor, &select.group_by);
    if let Some(expr) = &select.having {
        walk_expr(visitor, expr);
    }
    walk_order_by(visitor, &select.order_by);
}

fn walk_from<V: Visitor + ?Sized>(visitor: &mut V, item: &FromItem) {
    match item {
        FromItem::Table(table) => visitor.visit_table(table),
        FromItem::Alias(alias) => visitor.visit_table(&alias.table),
        FromItem::Derived { query, .. } => walk_query(visitor, query),
        FromItem::Join(join) => {
            walk_from(visitor, &join.left);
            walk_from(visitor, &join.right);
            if let Some(on) = &join.on {
                walk_expr(visitor, on);
            }
        }
        FromItem::Cte(_) => {}
    }
}

fn walk_order_by<V: Visitor + ?Sized>(visitor: &mut V, entries: &[OrderBy]) {
    for entry in entries {
        walk_expr(visitor, &entry.expr);
    }
}

fn walk_exprs<V: Visitor + ?Sized>(visitor: &mut V, exprs: &[Expr]) {
    for expr in exprs {
        walk_expr(visitor, expr);
    }
}

/// Walks an expression.
pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    visitor.visit_expr(expr);
    match expr {
        Expr::Literal(_) | Expr::Raw(_) => {}
        Expr::Column(col) => {
            if let Some(table) = col.source.as_ref().and_then(ColumnSource::table) {
                visitor.visit_table(table);
            }
        }
        Expr::Wildcard(source) => {
            if let Some(table) = source.as_ref().and_then(ColumnSource::table) {
                visitor.visit_table(table);
            }
        }
        Expr::Bind(bind) => visitor.visit_bind(bind),
        Expr::Binary { left, right, .. } => {
            walk_expr(visitor, left);
            walk_expr(visitor, right);
        }
        Expr::Unary { operand, .. } => walk_expr(visitor, operand),
        Expr::Function(func) => {
            walk_exprs(visitor, &func.args);
            if let Some(over) = &func.over {
                walk_exprs(visitor, &over.partition_by);
                walk_order_by(visitor, &over.order_by);
            }
        }
        Expr::Case {
            operand,
            whens,
            else_result,
        } => {
            if let Some(operand) = operand {
                walk_expr(visitor, operand);
            }
            for (when, then) in whens {
                walk_expr(visitor, when);
                walk_expr(visitor, then);
            }
            if let Some(else_result) = else_result {
                walk_expr(visitor, else_result);
            }
        }
        Expr::Cast { expr, .. }
        | Expr::Extract { expr, .. }
        | Expr::IsNull { expr, .. }
        | Expr::Label { expr, .. } => walk_expr(visitor, expr),
        Expr::InList { expr, list, .. } => {
            walk_expr(visitor, expr);
            walk_exprs(visitor, list);
        }
        Expr::InSubquery { expr, query, .. } => {
            walk_expr(visitor, expr);
            if visitor.enter_subqueries() {
                walk_query(visitor, query);
            }
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            walk_expr(visitor, expr);
            walk_expr(visitor, low);
            walk_expr(visitor, high);
        }
        Expr::Exists { query, .. } | Expr::Subquery(query) => {
            if visitor.enter_subqueries() {
                walk_query(visitor, query);
            }
        }
        Expr::Tuple(items) => walk_exprs(visitor, items),
    }
}
