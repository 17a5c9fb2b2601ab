//! SELECT, compound SELECT and FROM-clause rendering.

use std::collections::HashSet;

use super::Compilation;
use super::limit::wrap_with_row_number;
use crate::ast::{
    ColumnRef, ColumnSource, Compound, Cte, Expr, FromItem, Join, JoinType, Query, Select,
    TableAlias,
};
use crate::compiled::ResultColumn;
use crate::dialect::{LateralStyle, LimitStrategy};
use crate::error::{Result, SqlError};
use crate::types::SqlType;
use crate::visit::{self, Visitor};

/// Collects the tables referenced by column expressions, for SELECTs
/// without an explicit FROM clause.
#[derive(Default)]
struct FromCollector {
    items: Vec<FromItem>,
}

impl Visitor for FromCollector {
    fn visit_expr(&mut self, expr: &Expr) {
        let source = match expr {
            Expr::Column(ColumnRef {
                source: Some(source),
                ..
            })
            | Expr::Wildcard(Some(source)) => source,
            _ => return,
        };
        let item = match source {
            ColumnSource::Table(table) => FromItem::Table(table.clone()),
            ColumnSource::Alias(alias) => FromItem::Alias(alias.clone()),
            ColumnSource::Derived(_) => return,
        };
        if !self.items.contains(&item) {
            self.items.push(item);
        }
    }

    fn enter_subqueries(&self) -> bool {
        false
    }
}

/// The table-like items of a FROM list, as enclosing scopes see them.
fn scope_items(from: &[FromItem]) -> Vec<FromItem> {
    let mut tables = Vec::new();
    for item in from {
        item.tables(&mut tables);
    }
    tables
        .into_iter()
        .map(|(alias, table)| match alias {
            Some(name) => FromItem::Alias(TableAlias {
                table: table.clone(),
                name: name.to_string(),
            }),
            None => FromItem::Table(table.clone()),
        })
        .collect()
}

/// Names and types of the columns a FROM item contributes to `*`.
fn item_columns(item: &FromItem, out: &mut Vec<(String, SqlType)>) {
    match item {
        FromItem::Table(table) | FromItem::Alias(TableAlias { table, .. }) => {
            out.extend(
                table
                    .columns()
                    .iter()
                    .map(|c| (c.name.clone(), c.sql_type.clone())),
            );
        }
        FromItem::Derived { query, .. } => out.extend(
            query
                .selected_columns()
                .iter()
                .filter_map(|e| e.output_name().map(|n| (n.to_string(), e.sql_type()))),
        ),
        FromItem::Join(join) => {
            item_columns(&join.left, out);
            item_columns(&join.right, out);
        }
        FromItem::Cte(_) => {}
    }
}

fn find_derived<'a>(items: &'a [FromItem], name: &str) -> Option<&'a FromItem> {
    items.iter().find_map(|item| match item {
        FromItem::Derived { alias, .. } if alias == name => Some(item),
        FromItem::Join(join) => find_derived(std::slice::from_ref(&join.left), name)
            .or_else(|| find_derived(std::slice::from_ref(&join.right), name)),
        _ => None,
    })
}

const fn is_lateral(item: &FromItem) -> bool {
    matches!(item, FromItem::Derived { lateral: true, .. })
}

impl Compilation<'_> {
    /// Renders a query. Only the outermost query (`top`) records result
    /// columns.
    pub(super) fn query(&mut self, query: &Query, top: bool) -> Result<String> {
        match query {
            Query::Select(select) => self.select(select, top),
            Query::Compound(compound) => self.compound(compound, top),
        }
    }

    /// Whether ORDER BY is rendered at the current depth.
    const fn keeps_order_by(&self, limited: bool) -> bool {
        self.depth == 0 || limited || self.caps.supports_subquery_order_by
    }

    fn compound(&mut self, compound: &Compound, top: bool) -> Result<String> {
        let limited = compound.limit.is_some() || compound.offset.is_some();
        if limited && self.dialect.limit_strategy(&self.caps) != LimitStrategy::LimitOffset {
            return Err(self.capability_error(
                "LIMIT/OFFSET on compound SELECT",
                format!("{} with a row limit", compound.op.as_str()),
            ));
        }

        let mut parts = Vec::with_capacity(compound.queries.len());
        for (i, member) in compound.queries.iter().enumerate() {
            let top = top && i == 0;
            parts.push(match member {
                Query::Compound(_) => format!("({})", self.query(member, top)?),
                // A member's own ordering and row limit only apply inside a
                // derived table.
                Query::Select(select)
                    if !select.order_by.is_empty()
                        || select.limit.is_some()
                        || select.offset.is_some() =>
                {
                    let wrapper = crate::ast::select(vec![Expr::Wildcard(None)])
                        .from(select.clone().alias(format!("anon_{}", i + 1)));
                    self.select(&wrapper, top)?
                }
                Query::Select(select) => self.select(select, top)?,
            });
        }
        let mut sql = parts.join(&format!(" {} ", compound.op.as_str()));

        if !compound.order_by.is_empty() && self.keeps_order_by(limited) {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by_list(&compound.order_by)?);
        }
        if let Some(n) = compound.limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        if let Some(n) = compound.offset {
            sql.push_str(&format!(" OFFSET {n}"));
        }
        Ok(sql)
    }

    fn select(&mut self, select: &Select, top: bool) -> Result<String> {
        let strategy = self.dialect.limit_strategy(&self.caps);
        if select.offset.is_some() && !select.row_number_wrapped {
            match strategy {
                LimitStrategy::LimitOffset => {}
                LimitStrategy::Top => {
                    return Err(self.capability_error(
                        "OFFSET",
                        "TOP cannot skip rows and the server has no window functions",
                    ));
                }
                LimitStrategy::RowNumber => {
                    let wrapped = wrap_with_row_number(select, self.dialect.name())?;
                    return self.select(&wrapped, top);
                }
            }
        }
        if select.columns.is_empty() {
            return Err(SqlError::StructuralConflict(String::from(
                "a SELECT needs at least one column",
            )));
        }

        let inferred;
        let from: &[FromItem] = if select.from.is_empty() {
            inferred = self.infer_from(select);
            &inferred
        } else {
            &select.from
        };

        self.scopes.push(scope_items(from));
        let sql = self.select_body(select, from, strategy, top);
        self.scopes.pop();
        sql
    }

    fn select_body(
        &mut self,
        select: &Select,
        from: &[FromItem],
        strategy: LimitStrategy,
        top: bool,
    ) -> Result<String> {
        let mut sql = String::new();
        if !select.ctes.is_empty() {
            sql.push_str(&self.ctes(&select.ctes)?);
            sql.push(' ');
        }

        sql.push_str("SELECT ");
        if select.distinct {
            sql.push_str("DISTINCT ");
        }
        if let (Some(n), LimitStrategy::Top | LimitStrategy::RowNumber) = (select.limit, strategy) {
            sql.push_str(&format!("TOP {n} "));
        }
        sql.push_str(&self.columns(&select.columns, from, top)?);

        if !from.is_empty() {
            sql.push_str(" FROM ");
            sql.push_str(&self.from_list(from)?);
        }
        if let Some(where_clause) = &select.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&self.expr(where_clause)?);
        }
        if !select.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.expr_list(&select.group_by)?);
        }
        if let Some(having) = &select.having {
            sql.push_str(" HAVING ");
            sql.push_str(&self.expr(having)?);
        }

        let limited = select.limit.is_some() || select.offset.is_some();
        if !select.order_by.is_empty() && self.keeps_order_by(limited) {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by_list(&select.order_by)?);
        }

        if strategy == LimitStrategy::LimitOffset {
            if let Some(n) = select.limit {
                sql.push_str(&format!(" LIMIT {n}"));
            }
            if let Some(n) = select.offset {
                sql.push_str(&format!(" OFFSET {n}"));
            }
        }
        Ok(sql)
    }

    /// FROM items implied by the columns and WHERE clause, minus those an
    /// enclosing SELECT already provides.
    fn infer_from(&self, select: &Select) -> Vec<FromItem> {
        let mut collector = FromCollector::default();
        for column in &select.columns {
            visit::walk_expr(&mut collector, column);
        }
        if let Some(where_clause) = &select.where_clause {
            visit::walk_expr(&mut collector, where_clause);
        }
        collector
            .items
            .into_iter()
            .filter(|item| !self.scopes.iter().any(|scope| scope.contains(item)))
            .collect()
    }

    fn ctes(&mut self, ctes: &[Cte]) -> Result<String> {
        let recursive = ctes.iter().any(|c| c.recursive) && self.dialect.uses_with_recursive();
        let mut parts = Vec::with_capacity(ctes.len());
        for cte in ctes {
            let mut part = self.preparer.quote(&cte.name);
            if !cte.columns.is_empty() {
                let columns: Vec<String> = cte.columns.iter().map(|c| self.preparer.quote(c)).collect();
                part.push_str(&format!(" ({})", columns.join(", ")));
            }
            part.push_str(&format!(" AS ({})", self.subquery(&cte.query)?));
            parts.push(part);
        }
        let keyword = if recursive { "WITH RECURSIVE" } else { "WITH" };
        Ok(format!("{keyword} {}", parts.join(", ")))
    }

    pub(super) fn columns(&mut self, columns: &[Expr], from: &[FromItem], top: bool) -> Result<String> {
        let mut used = HashSet::new();
        let mut parts = Vec::with_capacity(columns.len());
        for column in columns {
            match column {
                Expr::Label { expr, name } => {
                    let inner = self.expr(expr)?;
                    let label = self.preparer.unique_alias(name, &mut used);
                    parts.push(format!("{inner} AS {}", self.preparer.quote(&label)));
                    if top {
                        self.push_result_column(Some(label), column.sql_type());
                    }
                }
                Expr::Wildcard(source) => {
                    parts.push(self.expr(column)?);
                    if top {
                        for (name, sql_type) in Self::wildcard_columns(source.as_ref(), from) {
                            let name = self.preparer.unique_alias(&name, &mut used);
                            self.push_result_column(Some(name), sql_type);
                        }
                    }
                }
                _ => {
                    let sql = self.expr(column)?;
                    let name = match column.output_name() {
                        Some(name) => {
                            let label = self.preparer.unique_alias(name, &mut used);
                            if label == name {
                                parts.push(sql);
                            } else {
                                parts.push(format!("{sql} AS {}", self.preparer.quote(&label)));
                            }
                            Some(label)
                        }
                        None => {
                            parts.push(sql);
                            None
                        }
                    };
                    if top {
                        self.push_result_column(name, column.sql_type());
                    }
                }
            }
        }
        Ok(parts.join(", "))
    }

    fn wildcard_columns(source: Option<&ColumnSource>, from: &[FromItem]) -> Vec<(String, SqlType)> {
        let mut out = Vec::new();
        match source {
            Some(ColumnSource::Table(table)) => {
                item_columns(&FromItem::Table(table.clone()), &mut out);
            }
            Some(ColumnSource::Alias(alias)) => {
                item_columns(&FromItem::Alias(alias.clone()), &mut out);
            }
            Some(ColumnSource::Derived(name)) => {
                if let Some(item) = find_derived(from, name) {
                    item_columns(item, &mut out);
                }
            }
            None => {
                for item in from {
                    item_columns(item, &mut out);
                }
            }
        }
        out
    }

    fn push_result_column(&mut self, name: Option<String>, sql_type: SqlType) {
        self.result_columns.push(ResultColumn {
            position: self.result_columns.len(),
            name,
            processor: self.dialect.result_processor(&sql_type, &self.caps),
            sql_type,
        });
    }

    fn from_list(&mut self, from: &[FromItem]) -> Result<String> {
        let mut sql = String::new();
        for (i, item) in from.iter().enumerate() {
            if i > 0 {
                if is_lateral(item) && self.caps.lateral == LateralStyle::Apply {
                    sql.push_str(" CROSS APPLY ");
                    sql.push_str(&self.derived(item, false)?);
                    continue;
                }
                sql.push_str(", ");
            }
            sql.push_str(&self.from_item(item)?);
        }
        Ok(sql)
    }

    fn from_item(&mut self, item: &FromItem) -> Result<String> {
        match item {
            FromItem::Table(table) => {
                let name = self.preparer.format_table(table, true);
                Ok(match self.table_alias(&table.key()) {
                    Some(alias) => format!("{name} AS {}", self.preparer.quote(&alias)),
                    None => name,
                })
            }
            FromItem::Alias(alias) => Ok(format!(
                "{} AS {}",
                self.preparer.format_table(&alias.table, true),
                self.preparer.quote(&alias.name)
            )),
            FromItem::Derived { lateral, .. } => self.derived(item, *lateral),
            FromItem::Join(join) => self.join(join),
            FromItem::Cte(name) => Ok(self.preparer.quote(name)),
        }
    }

    /// Renders `(subquery) AS alias`, with the LATERAL keyword if asked.
    fn derived(&mut self, item: &FromItem, keyword: bool) -> Result<String> {
        let FromItem::Derived {
            query,
            alias,
            lateral,
        } = item
        else {
            return self.from_item(item);
        };
        if *lateral && self.caps.lateral == LateralStyle::Unsupported {
            return Err(self.capability_error("LATERAL", format!("lateral subquery {alias}")));
        }

        // A plain derived table cannot see the enclosing FROM lists.
        let sub = if *lateral {
            self.subquery(query)?
        } else {
            let saved = std::mem::take(&mut self.scopes);
            let sub = self.subquery(query);
            self.scopes = saved;
            sub?
        };
        let body = format!("({sub}) AS {}", self.preparer.quote(alias));
        if keyword && self.caps.lateral == LateralStyle::Lateral {
            Ok(format!("LATERAL {body}"))
        } else {
            Ok(body)
        }
    }

    fn join(&mut self, join: &Join) -> Result<String> {
        let left = self.from_item(&join.left)?;

        if is_lateral(&join.right) && self.caps.lateral == LateralStyle::Apply {
            let apply = match join.join_type {
                JoinType::Inner | JoinType::Cross => "CROSS APPLY",
                JoinType::Left => "OUTER APPLY",
                JoinType::Right | JoinType::Full => {
                    return Err(self.capability_error(
                        "LATERAL",
                        format!("{} against a lateral subquery", join.join_type.as_str()),
                    ));
                }
            };
            if join.on.is_some() {
                return Err(self.capability_error(
                    "LATERAL",
                    "APPLY takes no ON condition; filter inside the subquery",
                ));
            }
            let right = self.derived(&join.right, false)?;
            return Ok(format!("{left} {apply} {right}"));
        }

        let right = match &join.right {
            FromItem::Join(_) => format!("({})", self.from_item(&join.right)?),
            other => self.from_item(other)?,
        };
        let mut sql = format!("{left} {} {right}", join.join_type.as_str());
        if let Some(on) = &join.on {
            sql.push_str(" ON ");
            sql.push_str(&self.expr(on)?);
        }
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Cte, FromItem, col, count_star, exists, select};
    use crate::compiler::compile;
    use crate::dialect::{GenericDialect, PostgresDialect};
    use crate::error::SqlError;
    use crate::schema::{ColumnDef, Table};
    use crate::types::SqlType;

    fn users() -> Table {
        Table::new(
            "users",
            vec![
                ColumnDef::new("id", SqlType::integer()).primary_key(),
                ColumnDef::new("name", SqlType::string(Some(50))),
            ],
        )
        .unwrap()
    }

    fn orders() -> Table {
        Table::new(
            "orders",
            vec![
                ColumnDef::new("id", SqlType::integer()).primary_key(),
                ColumnDef::new("user_id", SqlType::integer()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_is_inferred_from_columns() {
        let u = users();
        let compiled = compile(&select(vec![u.c("name")]).into(), &GenericDialect::new()).unwrap();
        assert_eq!(compiled.sql, "SELECT users.name FROM users");
        assert_eq!(compiled.result_columns[0].name.as_deref(), Some("name"));
    }

    #[test]
    fn test_correlated_subquery_omits_outer_table() {
        let u = users();
        let o = orders();
        let inner = select(vec![o.c("id")]).where_clause(o.c("user_id").eq(u.c("id")));
        let query = select(vec![u.c("name")]).from(&u).where_clause(exists(inner));
        let compiled = compile(&query.into(), &GenericDialect::new()).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT users.name FROM users WHERE EXISTS (SELECT orders.id FROM orders WHERE orders.user_id = users.id)"
        );
    }

    #[test]
    fn test_duplicate_output_names_are_labeled() {
        let u = users();
        let o = orders();
        let query = select(vec![u.c("id"), o.c("id")])
            .from(FromItem::from(&u).join(&o, o.c("user_id").eq(u.c("id"))));
        let compiled = compile(&query.into(), &GenericDialect::new()).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT users.id, orders.id AS id_1 FROM users JOIN orders ON orders.user_id = users.id"
        );
        let names: Vec<_> = compiled
            .result_columns
            .iter()
            .map(|c| c.name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["id", "id_1"]);
    }

    #[test]
    fn test_wildcard_expands_result_columns() {
        let u = users();
        let compiled = compile(&select(vec![u.star()]).into(), &GenericDialect::new()).unwrap();
        assert_eq!(compiled.sql, "SELECT users.* FROM users");
        assert_eq!(compiled.result_columns.len(), 2);
        assert_eq!(compiled.result_columns[1].name.as_deref(), Some("name"));
    }

    #[test]
    fn test_limit_offset_and_compound() {
        let u = users();
        let query = select(vec![u.c("id")]).from(&u).order_by(u.c("id")).limit(5).offset(10);
        let compiled = compile(&query.into(), &GenericDialect::new()).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT users.id FROM users ORDER BY users.id LIMIT 5 OFFSET 10"
        );

        let o = orders();
        let union = select(vec![u.c("id")])
            .union_all(select(vec![o.c("id")]))
            .limit(3);
        let compiled = compile(&union.into(), &GenericDialect::new()).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT users.id FROM users UNION ALL SELECT orders.id FROM orders LIMIT 3"
        );
        assert_eq!(compiled.result_columns.len(), 1);
    }

    #[test]
    fn test_ordered_compound_member_is_derived() {
        let u = users();
        let o = orders();
        let union = select(vec![u.c("id")])
            .from(&u)
            .order_by(u.c("id"))
            .limit(2)
            .union_all(select(vec![o.c("id")]).from(&o));
        let compiled = compile(&union.clone().into(), &GenericDialect::new()).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT * FROM (SELECT users.id FROM users ORDER BY users.id LIMIT 2) AS anon_1 UNION ALL SELECT orders.id FROM orders"
        );
        assert_eq!(compiled.result_columns.len(), 1);
        assert_eq!(compiled.result_columns[0].name.as_deref(), Some("id"));

        let compiled = compile(&union.into(), &PostgresDialect::new()).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT * FROM (SELECT users.id FROM users ORDER BY users.id LIMIT 2) AS anon_1 UNION ALL SELECT orders.id FROM orders"
        );
    }

    #[test]
    fn test_second_compound_member_with_offset() {
        let u = users();
        let o = orders();
        let union = select(vec![u.c("id")])
            .from(&u)
            .union(select(vec![o.c("id")]).from(&o).order_by(o.c("id")).offset(5));
        let compiled = compile(&union.into(), &GenericDialect::new()).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT users.id FROM users UNION SELECT * FROM (SELECT orders.id FROM orders ORDER BY orders.id OFFSET 5) AS anon_2"
        );
    }

    #[test]
    fn test_cte_and_group_by() {
        let o = orders();
        let counts = select(vec![o.c("user_id"), count_star().label("n")])
            .from(&o)
            .group_by(vec![o.c("user_id")])
            .having(count_star().gt(1));
        let cte = Cte::new("busy", counts);
        let query = select(vec![cte.c("user_id")])
            .with(cte)
            .from(FromItem::Cte(String::from("busy")));
        let compiled = compile(&query.into(), &PostgresDialect::new()).unwrap();
        assert_eq!(
            compiled.sql,
            "WITH busy AS (SELECT orders.user_id, count(*) AS n FROM orders GROUP BY orders.user_id HAVING count(*) > $1) SELECT busy.user_id FROM busy"
        );
    }

    #[test]
    fn test_lateral_subquery() {
        let u = users();
        let o = orders();
        let latest = select(vec![o.c("id")])
            .where_clause(o.c("user_id").eq(u.c("id")))
            .limit(1)
            .lateral("latest");
        let query = select(vec![u.c("name"), col("id")])
            .from(FromItem::from(&u).join_with(crate::ast::JoinType::Cross, latest, None));
        let compiled = compile(&query.into(), &PostgresDialect::new()).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT users.name, id FROM users CROSS JOIN LATERAL (SELECT orders.id FROM orders WHERE orders.user_id = users.id LIMIT 1) AS latest"
        );
    }

    #[test]
    fn test_empty_column_list() {
        let err = compile(&select(vec![]).into(), &GenericDialect::new()).unwrap_err();
        assert!(matches!(err, SqlError::StructuralConflict(_)));
    }
}
