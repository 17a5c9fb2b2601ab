//! OFFSET emulation with `ROW_NUMBER()`.
//!
//! A SELECT with an offset becomes an outer SELECT over the original one,
//! which gains a `ROW_NUMBER() OVER (ORDER BY ...)` column and loses its
//! ORDER BY, LIMIT and OFFSET. The outer query filters on the row number.
//!
//! DISTINCT is applied after window functions, so a DISTINCT SELECT keeps
//! its columns in a derived table of its own and the rows are numbered one
//! level further out.

use std::collections::HashSet;

use crate::ast::{
    ColumnRef, ColumnSource, Expr, FromItem, OrderBy, Select, TableAlias, row_number,
};
use crate::error::{Result, SqlError};
use crate::types::SqlType;
use crate::value::SqlValue;

const DERIVED_ALIAS: &str = "anon_1";
const DISTINCT_ALIAS: &str = "anon_2";
const ROW_NUMBER_LABEL: &str = "rn";

fn unique_name(base: &str, used: &mut HashSet<String>) -> String {
    let mut candidate = base.to_string();
    let mut n = 0_usize;
    while used.contains(&candidate) {
        n += 1;
        candidate = format!("{base}_{n}");
    }
    used.insert(candidate.clone());
    candidate
}

fn has_derived(item: &FromItem) -> bool {
    match item {
        FromItem::Derived { .. } | FromItem::Cte(_) => true,
        FromItem::Join(join) => has_derived(&join.left) || has_derived(&join.right),
        FromItem::Table(_) | FromItem::Alias(_) => false,
    }
}

/// The columns `*` stands for, as qualified column references.
fn expand_wildcard(source: Option<&ColumnSource>, from: &[FromItem]) -> Result<Vec<Expr>> {
    let derived = || {
        SqlError::StructuralConflict(String::from(
            "cannot expand * over a derived table when emulating OFFSET; list the columns",
        ))
    };
    let sources: Vec<ColumnSource> = match source {
        Some(ColumnSource::Derived(_)) => return Err(derived()),
        Some(source) => vec![source.clone()],
        None => {
            if from.iter().any(has_derived) {
                return Err(derived());
            }
            let mut tables = Vec::new();
            for item in from {
                item.tables(&mut tables);
            }
            tables
                .into_iter()
                .map(|(alias, table)| match alias {
                    Some(name) => ColumnSource::Alias(TableAlias {
                        table: table.clone(),
                        name: name.to_string(),
                    }),
                    None => ColumnSource::Table(table.clone()),
                })
                .collect()
        }
    };

    let mut columns = Vec::new();
    for source in sources {
        let Some(table) = source.table() else {
            continue;
        };
        for column in table.columns() {
            columns.push(Expr::Column(ColumnRef {
                source: Some(source.clone()),
                name: column.name.clone(),
                sql_type: column.sql_type.clone(),
            }));
        }
    }
    Ok(columns)
}

fn derived_column(alias: &str, name: &str, sql_type: SqlType) -> Expr {
    Expr::Column(ColumnRef {
        source: Some(ColumnSource::Derived(alias.to_string())),
        name: name.to_string(),
        sql_type,
    })
}

/// Numbers the rows of a DISTINCT SELECT whose labeled `columns` move into
/// a derived table. ORDER BY entries must name selected columns.
fn number_distinct_rows(select: &Select, columns: Vec<Expr>, rn_name: &str) -> Result<Select> {
    let mut order_by = Vec::with_capacity(select.order_by.len());
    for entry in &select.order_by {
        let selected = columns.iter().find_map(|column| match column {
            Expr::Label { expr, name }
                if **expr == entry.expr || names_label(&entry.expr, name) =>
            {
                Some(derived_column(DISTINCT_ALIAS, name, expr.sql_type()))
            }
            _ => None,
        });
        let Some(expr) = selected else {
            return Err(SqlError::StructuralConflict(String::from(
                "ORDER BY of a DISTINCT SELECT with an OFFSET must use selected columns",
            )));
        };
        order_by.push(OrderBy {
            expr,
            ..entry.clone()
        });
    }

    let mut numbered: Vec<Expr> = columns
        .iter()
        .filter_map(|column| match column {
            Expr::Label { expr, name } => {
                Some(derived_column(DISTINCT_ALIAS, name, expr.sql_type()))
            }
            _ => None,
        })
        .collect();
    numbered.push(row_number().over(vec![], order_by).label(rn_name));

    let distinct = Select {
        ctes: vec![],
        distinct: true,
        columns,
        from: select.from.clone(),
        where_clause: select.where_clause.clone(),
        group_by: select.group_by.clone(),
        having: select.having.clone(),
        order_by: vec![],
        limit: None,
        offset: None,
        row_number_wrapped: false,
    };
    Ok(Select {
        ctes: vec![],
        distinct: false,
        columns: numbered,
        from: vec![distinct.alias(DISTINCT_ALIAS)],
        where_clause: None,
        group_by: vec![],
        having: None,
        order_by: vec![],
        limit: None,
        offset: None,
        row_number_wrapped: false,
    })
}

/// `ORDER BY name` written as an unqualified reference to a label.
fn names_label(expr: &Expr, label: &str) -> bool {
    matches!(expr, Expr::Column(ColumnRef { source: None, name, .. }) if name == label)
}

fn to_i64(n: u64) -> Result<i64> {
    i64::try_from(n).map_err(|_| {
        SqlError::StructuralConflict(format!("row bound {n} is out of range"))
    })
}

/// Rewrites a SELECT with an offset into a ROW_NUMBER-filtered SELECT.
///
/// The result is marked so it is not wrapped again; passing an already
/// wrapped SELECT returns it unchanged.
///
/// # Errors
///
/// - [`SqlError::CapabilityViolation`] if the SELECT has no ORDER BY.
/// - [`SqlError::StructuralConflict`] if `*` cannot be expanded, a bound
///   does not fit the row number type, or a DISTINCT SELECT orders by
///   something it does not select.
pub fn wrap_with_row_number(select: &Select, dialect: &str) -> Result<Select> {
    if select.row_number_wrapped {
        return Ok(select.clone());
    }
    if select.order_by.is_empty() {
        return Err(SqlError::capability(
            dialect,
            "OFFSET",
            "emulating OFFSET with ROW_NUMBER() requires an ORDER BY",
        ));
    }

    let mut used = HashSet::new();
    let mut inner_columns = Vec::new();
    let mut anon = 0_usize;
    let mut labeled = |expr: Expr, used: &mut HashSet<String>| -> Expr {
        let (inner, base) = match expr {
            Expr::Label { expr, name } => (*expr, name),
            Expr::Column(col) => {
                let name = col.name.clone();
                (Expr::Column(col), name)
            }
            other => {
                anon += 1;
                (other, format!("anon_{anon}"))
            }
        };
        inner.label(unique_name(&base, used))
    };
    for column in &select.columns {
        match column {
            Expr::Wildcard(source) => {
                for expanded in expand_wildcard(source.as_ref(), &select.from)? {
                    inner_columns.push(labeled(expanded, &mut used));
                }
            }
            other => inner_columns.push(labeled(other.clone(), &mut used)),
        }
    }

    let outer_columns = inner_columns
        .iter()
        .filter_map(|column| match column {
            Expr::Label { expr, name } => {
                Some(derived_column(DERIVED_ALIAS, name, expr.sql_type()))
            }
            _ => None,
        })
        .collect();

    let rn_name = unique_name(ROW_NUMBER_LABEL, &mut used);
    let inner = if select.distinct {
        number_distinct_rows(select, inner_columns, &rn_name)?
    } else {
        inner_columns.push(
            row_number()
                .over(vec![], select.order_by.clone())
                .label(rn_name.clone()),
        );
        Select {
            ctes: vec![],
            distinct: false,
            columns: inner_columns,
            from: select.from.clone(),
            where_clause: select.where_clause.clone(),
            group_by: select.group_by.clone(),
            having: select.having.clone(),
            order_by: vec![],
            limit: None,
            offset: None,
            row_number_wrapped: false,
        }
    };

    let rn = || {
        Expr::Column(ColumnRef {
            source: None,
            name: rn_name.clone(),
            sql_type: SqlType::big_integer(),
        })
    };
    let offset = select.offset.unwrap_or(0);
    let mut filter = rn().gt(Expr::Literal(SqlValue::Int(to_i64(offset)?)));
    if let Some(limit) = select.limit {
        let upper = to_i64(offset.saturating_add(limit))?;
        filter = filter.and(rn().lt_eq(Expr::Literal(SqlValue::Int(upper))));
    }

    Ok(Select {
        ctes: select.ctes.clone(),
        distinct: false,
        columns: outer_columns,
        from: vec![inner.alias(DERIVED_ALIAS)],
        where_clause: Some(filter),
        group_by: vec![],
        having: None,
        order_by: vec![],
        limit: None,
        offset: None,
        row_number_wrapped: true,
    })
}
