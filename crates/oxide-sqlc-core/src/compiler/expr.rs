//! Expression rendering.

use super::Compilation;
use crate::ast::{BinaryOp, ColumnRef, ColumnSource, Expr, Function, OrderBy, Query, UnaryOp};
use crate::dialect::FunctionRender;
use crate::error::Result;
use crate::types::resolve_with;
use crate::value::SqlValue;

const ATOM: u8 = u8::MAX;
const PREDICATE: u8 = 4;

/// Binding strength of an expression's outermost operator.
fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Unary { op, .. } => op.precedence(),
        Expr::IsNull { .. } | Expr::InList { .. } | Expr::InSubquery { .. } | Expr::Between { .. } => {
            PREDICATE
        }
        Expr::Label { expr, .. } => precedence(expr),
        _ => ATOM,
    }
}

/// Whether `child` needs parentheses as an operand of `parent`.
fn needs_parens(child: &Expr, parent: BinaryOp) -> bool {
    let child_prec = precedence(child);
    let parent_prec = parent.precedence();
    if child_prec != parent_prec {
        return child_prec < parent_prec;
    }
    !matches!(child, Expr::Binary { op, .. } if *op == parent && parent.is_associative())
}

impl Compilation<'_> {
    /// Renders an expression outside a column list.
    pub(super) fn expr(&mut self, expr: &Expr) -> Result<String> {
        match expr {
            Expr::Literal(value) => self.literal(value, expr),
            Expr::Column(col) => Ok(self.column(col)),
            Expr::Bind(bind) => self.bind(bind),
            Expr::Binary { left, op, right } => self.binary(left, *op, right),
            Expr::Unary { op, operand } => {
                let inner = self.expr(operand)?;
                let wrap = match op {
                    UnaryOp::Not => precedence(operand) != ATOM,
                    UnaryOp::Neg | UnaryOp::BitNot => precedence(operand) < op.precedence(),
                };
                if wrap {
                    Ok(format!("{}({inner})", op.as_str()))
                } else {
                    Ok(format!("{}{inner}", op.as_str()))
                }
            }
            Expr::Function(func) => self.function(func),
            Expr::Case {
                operand,
                whens,
                else_result,
            } => {
                let mut sql = String::from("CASE");
                if let Some(operand) = operand {
                    sql.push(' ');
                    sql.push_str(&self.expr(operand)?);
                }
                for (when, then) in whens {
                    sql.push_str(" WHEN ");
                    sql.push_str(&self.expr(when)?);
                    sql.push_str(" THEN ");
                    sql.push_str(&self.expr(then)?);
                }
                if let Some(else_result) = else_result {
                    sql.push_str(" ELSE ");
                    sql.push_str(&self.expr(else_result)?);
                }
                sql.push_str(" END");
                Ok(sql)
            }
            Expr::Cast { expr, to } => {
                let inner = self.expr(expr)?;
                Ok(format!("CAST({inner} AS {})", resolve_with(to, self.dialect, &self.caps)))
            }
            Expr::Extract { field, expr } => {
                let inner = self.expr(expr)?;
                Ok(self.dialect.render_extract(field, &inner))
            }
            Expr::IsNull { expr, negated } => {
                let inner = self.predicate_operand(expr)?;
                let not = if *negated { "NOT " } else { "" };
                Ok(format!("{inner} IS {not}NULL"))
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                if list.is_empty() {
                    return Ok(String::from(if *negated { "(1 = 1)" } else { "(1 = 0)" }));
                }
                let inner = self.predicate_operand(expr)?;
                let items = self.expr_list(list)?;
                let not = if *negated { "NOT " } else { "" };
                Ok(format!("{inner} {not}IN ({items})"))
            }
            Expr::InSubquery {
                expr,
                query,
                negated,
            } => {
                let inner = self.predicate_operand(expr)?;
                let sub = self.subquery(query)?;
                let not = if *negated { "NOT " } else { "" };
                Ok(format!("{inner} {not}IN ({sub})"))
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let inner = self.predicate_operand(expr)?;
                let low = self.predicate_operand(low)?;
                let high = self.predicate_operand(high)?;
                let not = if *negated { "NOT " } else { "" };
                Ok(format!("{inner} {not}BETWEEN {low} AND {high}"))
            }
            Expr::Exists { query, negated } => {
                let sub = self.subquery(query)?;
                let not = if *negated { "NOT " } else { "" };
                Ok(format!("{not}EXISTS ({sub})"))
            }
            Expr::Subquery(query) => Ok(format!("({})", self.subquery(query)?)),
            Expr::Label { expr, .. } => self.expr(expr),
            Expr::Wildcard(source) => Ok(match source {
                Some(source) => format!("{}.*", self.qualifier(source)),
                None => String::from("*"),
            }),
            Expr::Tuple(items) => Ok(format!("({})", self.expr_list(items)?)),
            Expr::Raw(sql) => Ok(sql.clone()),
        }
    }

    pub(super) fn expr_list(&mut self, exprs: &[Expr]) -> Result<String> {
        let parts = exprs
            .iter()
            .map(|e| self.expr(e))
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join(", "))
    }

    fn predicate_operand(&mut self, expr: &Expr) -> Result<String> {
        let sql = self.expr(expr)?;
        if precedence(expr) <= PREDICATE {
            Ok(format!("({sql})"))
        } else {
            Ok(sql)
        }
    }

    fn literal(&self, value: &SqlValue, expr: &Expr) -> Result<String> {
        if value.is_null() {
            return Ok(String::from("NULL"));
        }
        match self.dialect.literal_processor(&expr.sql_type(), &self.caps) {
            Some(processor) => processor(value),
            None => value.to_sql_inline(),
        }
    }

    fn binary(&mut self, left: &Expr, op: BinaryOp, right: &Expr) -> Result<String> {
        if matches!(op, BinaryOp::Eq | BinaryOp::NotEq) {
            if let Expr::Literal(SqlValue::Null) = right {
                let inner = self.predicate_operand(left)?;
                let not = if op == BinaryOp::NotEq { "NOT " } else { "" };
                return Ok(format!("{inner} IS {not}NULL"));
            }
            if !self.caps.supports_scalar_subquery_comparison {
                if let Some(sql) = self.scalar_comparison_as_in(left, op, right)? {
                    return Ok(sql);
                }
            }
        }

        let left_sql = self.operand(left, op)?;
        let right_sql = self.operand(right, op)?;
        let token = self.dialect.binary_operator(op).unwrap_or_else(|| op.as_str());
        Ok(format!("{left_sql} {token} {right_sql}"))
    }

    /// `x = (SELECT ...)` as `x IN (SELECT ...)`, with the subquery moved to
    /// the right if needed.
    fn scalar_comparison_as_in(
        &mut self,
        left: &Expr,
        op: BinaryOp,
        right: &Expr,
    ) -> Result<Option<String>> {
        let (operand, query) = match (left, right) {
            (_, Expr::Subquery(query)) => (left, query),
            (Expr::Subquery(query), _) => (right, query),
            _ => return Ok(None),
        };
        let inner = self.predicate_operand(operand)?;
        let sub = self.subquery(query)?;
        let not = if op == BinaryOp::NotEq { "NOT " } else { "" };
        Ok(Some(format!("{inner} {not}IN ({sub})")))
    }

    fn operand(&mut self, expr: &Expr, parent: BinaryOp) -> Result<String> {
        let sql = self.expr(expr)?;
        if needs_parens(expr, parent) {
            Ok(format!("({sql})"))
        } else {
            Ok(sql)
        }
    }

    fn function(&mut self, func: &Function) -> Result<String> {
        let lower = func.name.to_ascii_lowercase();
        let name = match self.dialect.function_name(&lower) {
            Some(FunctionRender::Keyword(keyword)) => return Ok(keyword.to_string()),
            Some(FunctionRender::Rename(name)) => name.to_string(),
            None => func.name.clone(),
        };
        let args = self.expr_list(&func.args)?;
        let distinct = if func.distinct { "DISTINCT " } else { "" };
        let mut sql = format!("{name}({distinct}{args})");
        if let Some(over) = &func.over {
            if !self.caps.supports_window_functions {
                return Err(self.capability_error(
                    "window functions",
                    format!("{}() OVER (...)", func.name),
                ));
            }
            let mut window = Vec::new();
            if !over.partition_by.is_empty() {
                window.push(format!("PARTITION BY {}", self.expr_list(&over.partition_by)?));
            }
            if !over.order_by.is_empty() {
                window.push(format!("ORDER BY {}", self.order_by_list(&over.order_by)?));
            }
            sql.push_str(&format!(" OVER ({})", window.join(" ")));
        }
        Ok(sql)
    }

    pub(super) fn order_by_list(&mut self, entries: &[OrderBy]) -> Result<String> {
        let parts = entries
            .iter()
            .map(|entry| {
                let mut sql = self.expr(&entry.expr)?;
                if let Some(direction) = entry.direction {
                    sql.push(' ');
                    sql.push_str(direction.as_str());
                }
                if let Some(nulls) = entry.nulls {
                    sql.push(' ');
                    sql.push_str(nulls.as_str());
                }
                Ok(sql)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join(", "))
    }

    fn column(&mut self, col: &ColumnRef) -> String {
        let name = self.preparer.quote(&col.name);
        match &col.source {
            Some(source) => format!("{}.{name}", self.qualifier(source)),
            None => name,
        }
    }

    /// Renders what qualifies a column: an alias or the table name.
    pub(super) fn qualifier(&mut self, source: &ColumnSource) -> String {
        match source {
            ColumnSource::Table(table) => match self.table_alias(&table.key()) {
                Some(alias) => self.preparer.quote(&alias),
                None => self.preparer.format_table(table, true),
            },
            ColumnSource::Alias(alias) => self.preparer.quote(&alias.name),
            ColumnSource::Derived(name) => self.preparer.quote(name),
        }
    }

    /// Renders a nested query one level deeper.
    pub(super) fn subquery(&mut self, query: &Query) -> Result<String> {
        self.depth += 1;
        let sql = self.query(query, false);
        self.depth -= 1;
        sql
    }
}
