//! INSERT, UPDATE, DELETE and DDL statements.
//!
//! DML builders validate against the target table when built: value keys
//! must name columns, and an INSERT is either VALUES or INSERT-FROM-SELECT,
//! never both.

use std::collections::BTreeSet;

use super::expression::{BindParam, Expr, IntoOperand, Operand};
use super::query::{Compound, Query, Select};
use crate::error::{Result, SqlError};
use crate::schema::{ColumnDef, Table};

/// Where an INSERT takes its rows from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InsertSource {
    /// No values: `DEFAULT VALUES` or its dialect equivalent.
    DefaultValues,
    /// One or more VALUES rows over the named columns.
    Values {
        columns: Vec<String>,
        rows: Vec<Vec<Expr>>,
    },
    /// `INSERT INTO t (columns) SELECT ...`.
    Select {
        columns: Vec<String>,
        query: Box<Query>,
    },
}

/// An INSERT statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Insert {
    /// Target table.
    pub table: Table,
    /// Row source.
    pub source: InsertSource,
    /// RETURNING expressions.
    pub returning: Vec<Expr>,
}

impl Insert {
    /// Starts an INSERT into `table`.
    #[must_use]
    pub fn into_table(table: &Table) -> InsertBuilder {
        InsertBuilder {
            table: table.clone(),
            rows: vec![],
            select: None,
            returning: vec![],
        }
    }

    /// Returns the number of VALUES rows (0 for the other sources).
    #[must_use]
    pub fn row_count(&self) -> usize {
        match &self.source {
            InsertSource::Values { rows, .. } => rows.len(),
            InsertSource::DefaultValues | InsertSource::Select { .. } => 0,
        }
    }
}

type Row = Vec<(String, Operand)>;

/// Builder for [`Insert`].
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: Table,
    rows: Vec<Row>,
    select: Option<(Vec<String>, Query)>,
    returning: Vec<Expr>,
}

impl InsertBuilder {
    /// Adds one VALUES row of `(column key, value)` pairs.
    #[must_use]
    pub fn values<V: IntoOperand>(mut self, row: Vec<(&str, V)>) -> Self {
        self.rows.push(
            row.into_iter()
                .map(|(key, value)| (String::from(key), value.into_operand()))
                .collect(),
        );
        self
    }

    /// Adds a value to the last VALUES row, starting one if needed.
    #[must_use]
    pub fn value(mut self, key: &str, value: impl IntoOperand) -> Self {
        if self.rows.is_empty() {
            self.rows.push(vec![]);
        }
        if let Some(row) = self.rows.last_mut() {
            row.push((String::from(key), value.into_operand()));
        }
        self
    }

    /// Inserts the rows of `query` into the given columns.
    #[must_use]
    pub fn from_select(mut self, columns: &[&str], query: impl Into<Query>) -> Self {
        self.select = Some((
            columns.iter().map(|c| String::from(*c)).collect(),
            query.into(),
        ));
        self
    }

    /// Adds RETURNING expressions.
    #[must_use]
    pub fn returning(mut self, exprs: Vec<Expr>) -> Self {
        self.returning.extend(exprs);
        self
    }

    /// Validates and builds the statement.
    pub fn build(self) -> Result<Insert> {
        let table = self.table;
        if self.select.is_some() && !self.rows.is_empty() {
            return Err(SqlError::StructuralConflict(String::from(
                "an INSERT takes its rows from either VALUES or a SELECT, not both",
            )));
        }

        if let Some((keys, query)) = self.select {
            check_consumed(&table, keys.iter().map(String::as_str))?;
            let columns = keys
                .iter()
                .filter_map(|k| table.column(k))
                .map(|c| c.name.clone())
                .collect();
            return Ok(Insert {
                table,
                source: InsertSource::Select {
                    columns,
                    query: Box::new(query),
                },
                returning: self.returning,
            });
        }

        check_consumed(
            &table,
            self.rows.iter().flatten().map(|(key, _)| key.as_str()),
        )?;

        let source = match self.rows.as_slice() {
            [] => InsertSource::DefaultValues,
            [row] if row.is_empty() => InsertSource::DefaultValues,
            [row] => {
                let used = key_set(row);
                let columns = ordered_columns(&table, &used);
                let values = columns
                    .iter()
                    .map(|col| row_value(row, col, col.key.clone()))
                    .collect();
                InsertSource::Values {
                    columns: columns.iter().map(|c| c.name.clone()).collect(),
                    rows: vec![values],
                }
            }
            rows => {
                let used = key_set(&rows[0]);
                if let Some(pos) = rows.iter().position(|r| key_set(r) != used) {
                    return Err(SqlError::StructuralConflict(format!(
                        "multi-row VALUES row {pos} names different columns than row 0"
                    )));
                }
                let columns = ordered_columns(&table, &used);
                let rows = rows
                    .iter()
                    .enumerate()
                    .map(|(i, row)| {
                        columns
                            .iter()
                            .map(|col| row_value(row, col, format!("{}_m{i}", col.key)))
                            .collect()
                    })
                    .collect();
                InsertSource::Values {
                    columns: columns.iter().map(|c| c.name.clone()).collect(),
                    rows,
                }
            }
        };

        Ok(Insert {
            table,
            source,
            returning: self.returning,
        })
    }
}

fn key_set(row: &Row) -> BTreeSet<&str> {
    row.iter().map(|(key, _)| key.as_str()).collect()
}

fn ordered_columns<'a>(table: &'a Table, used: &BTreeSet<&str>) -> Vec<&'a ColumnDef> {
    table
        .columns()
        .iter()
        .filter(|c| used.contains(c.key.as_str()))
        .collect()
}

/// The last value given for `col` in `row`, as an expression. Plain values
/// become named binds so re-execution can rebind them.
fn row_value(row: &Row, col: &ColumnDef, bind_key: String) -> Expr {
    match row.iter().rev().find(|(key, _)| *key == col.key) {
        Some((_, Operand::Expr(expr))) => expr.clone(),
        Some((_, Operand::Value(value))) => {
            Expr::Bind(BindParam::named(bind_key, col.sql_type.clone()).with_value(value.clone()))
        }
        None => Expr::Bind(BindParam::named(bind_key, col.sql_type.clone())),
    }
}

fn check_consumed<'a>(table: &Table, keys: impl Iterator<Item = &'a str>) -> Result<()> {
    let unconsumed: BTreeSet<&str> = keys.filter(|k| table.column(k).is_none()).collect();
    if unconsumed.is_empty() {
        Ok(())
    } else {
        Err(SqlError::Unconsumed {
            names: unconsumed.into_iter().map(String::from).collect(),
        })
    }
}

/// An UPDATE statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Update {
    /// Target table.
    pub table: Table,
    /// `column name = expression` assignments in table column order.
    pub assignments: Vec<(String, Expr)>,
    /// WHERE condition.
    pub where_clause: Option<Expr>,
    /// RETURNING expressions.
    pub returning: Vec<Expr>,
}

impl Update {
    /// Starts an UPDATE of `table`.
    #[must_use]
    pub fn table(table: &Table) -> UpdateBuilder {
        UpdateBuilder {
            table: table.clone(),
            set: vec![],
            where_clause: None,
            returning: vec![],
        }
    }
}

/// Builder for [`Update`].
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: Table,
    set: Row,
    where_clause: Option<Expr>,
    returning: Vec<Expr>,
}

impl UpdateBuilder {
    /// Sets a column (by key) to a value or expression.
    #[must_use]
    pub fn set(mut self, key: &str, value: impl IntoOperand) -> Self {
        self.set.push((String::from(key), value.into_operand()));
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

    /// Adds RETURNING expressions.
    #[must_use]
    pub fn returning(mut self, exprs: Vec<Expr>) -> Self {
        self.returning.extend(exprs);
        self
    }

    /// Validates and builds the statement.
    pub fn build(self) -> Result<Update> {
        check_consumed(&self.table, self.set.iter().map(|(key, _)| key.as_str()))?;
        if self.set.is_empty() {
            return Err(SqlError::StructuralConflict(String::from(
                "an UPDATE needs at least one SET assignment",
            )));
        }
        let used = key_set(&self.set);
        let assignments = ordered_columns(&self.table, &used)
            .into_iter()
            .map(|col| (col.name.clone(), row_value(&self.set, col, col.key.clone())))
            .collect();
        Ok(Update {
            table: self.table,
            assignments,
            where_clause: self.where_clause,
            returning: self.returning,
        })
    }
}

/// A DELETE statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Delete {
    /// Target table.
    pub table: Table,
    /// WHERE condition.
    pub where_clause: Option<Expr>,
    /// RETURNING expressions.
    pub returning: Vec<Expr>,
}

impl Delete {
    /// Starts a DELETE from `table`.
    #[must_use]
    pub fn from_table(table: &Table) -> Self {
        Self {
            table: table.clone(),
            where_clause: None,
            returning: vec![],
        }
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

    /// Adds RETURNING expressions.
    #[must_use]
    pub fn returning(mut self, exprs: Vec<Expr>) -> Self {
        self.returning.extend(exprs);
        self
    }
}

/// An index definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Index {
    /// Index name.
    pub name: String,
    /// Indexed table.
    pub table: Table,
    /// Indexed column names.
    pub columns: Vec<String>,
    /// UNIQUE index.
    pub unique: bool,
}

impl Index {
    /// Creates an index over the columns with the given keys.
    pub fn new(name: impl Into<String>, table: &Table, keys: &[&str]) -> Result<Self> {
        check_consumed(table, keys.iter().copied())?;
        Ok(Self {
            name: name.into(),
            table: table.clone(),
            columns: keys
                .iter()
                .filter_map(|k| table.column(k))
                .map(|c| c.name.clone())
                .collect(),
            unique: false,
        })
    }

    /// Makes the index UNIQUE.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A statement the compiler accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Statement {
    /// SELECT or compound SELECT.
    Query(Query),
    /// INSERT.
    Insert(Insert),
    /// UPDATE.
    Update(Update),
    /// DELETE.
    Delete(Delete),
    /// CREATE TABLE.
    CreateTable { table: Table, if_not_exists: bool },
    /// DROP TABLE.
    DropTable { table: Table, if_exists: bool },
    /// CREATE INDEX.
    CreateIndex(Index),
    /// DROP INDEX.
    DropIndex(Index),
}

impl Statement {
    /// `CREATE TABLE` for `table`.
    #[must_use]
    pub fn create_table(table: &Table) -> Self {
        Self::CreateTable {
            table: table.clone(),
            if_not_exists: false,
        }
    }

    /// `DROP TABLE` for `table`.
    #[must_use]
    pub fn drop_table(table: &Table) -> Self {
        Self::DropTable {
            table: table.clone(),
            if_exists: false,
        }
    }
}

impl From<Select> for Statement {
    fn from(select: Select) -> Self {
        Self::Query(Query::Select(select))
    }
}

impl From<Compound> for Statement {
    fn from(compound: Compound) -> Self {
        Self::Query(Query::Compound(compound))
    }
}

impl From<Query> for Statement {
    fn from(query: Query) -> Self {
        Self::Query(query)
    }
}

impl From<Insert> for Statement {
    fn from(insert: Insert) -> Self {
        Self::Insert(insert)
    }
}

impl From<Update> for Statement {
    fn from(update: Update) -> Self {
        Self::Update(update)
    }
}

impl From<Delete> for Statement {
    fn from(delete: Delete) -> Self {
        Self::Delete(delete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::select;
    use crate::types::SqlType;
    use crate::value::SqlValue;

    fn users() -> Table {
        Table::new(
            "users",
            vec![
                ColumnDef::new("id", SqlType::integer()).primary_key(),
                ColumnDef::new("name", SqlType::string(Some(20))),
                ColumnDef::new("email", SqlType::string(Some(50))),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_unconsumed_keys_are_listed() {
        let err = Insert::into_table(&users())
            .values(vec![("nmae", "bob"), ("emial", "b@x"), ("name", "bob")])
            .build()
            .unwrap_err();
        match err {
            SqlError::Unconsumed { names } => assert_eq!(names, vec!["emial", "nmae"]),
            other => panic!("expected unconsumed, got {other:?}"),
        }
    }

    #[test]
    fn test_values_and_select_conflict() {
        let t = users();
        let err = Insert::into_table(&t)
            .value("name", "bob")
            .from_select(&["name"], select(vec![t.c("name")]))
            .build()
            .unwrap_err();
        assert!(matches!(err, SqlError::StructuralConflict(_)));
    }

    #[test]
    fn test_rows_follow_table_column_order() {
        let insert = Insert::into_table(&users())
            .values(vec![("email", "b@x"), ("name", "bob")])
            .build()
            .unwrap();
        match insert.source {
            InsertSource::Values { columns, rows } => {
                assert_eq!(columns, vec!["name", "email"]);
                assert!(matches!(
                    &rows[0][0],
                    Expr::Bind(BindParam { key, value: Some(SqlValue::Text(v)), unique: false, .. })
                        if key == "name" && v == "bob"
                ));
            }
            other => panic!("expected values, got {other:?}"),
        }
    }

    #[test]
    fn test_multi_row_keys_must_match() {
        let err = Insert::into_table(&users())
            .values(vec![("name", "a")])
            .values(vec![("email", "b")])
            .build()
            .unwrap_err();
        assert!(matches!(err, SqlError::StructuralConflict(_)));
    }

    #[test]
    fn test_multi_row_binds_are_per_row() {
        let insert = Insert::into_table(&users())
            .values(vec![("name", "a")])
            .values(vec![("name", "b")])
            .build()
            .unwrap();
        assert_eq!(insert.row_count(), 2);
        match insert.source {
            InsertSource::Values { rows, .. } => {
                assert!(matches!(&rows[1][0], Expr::Bind(b) if b.key == "name_m1"));
            }
            other => panic!("expected values, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_insert_is_default_values() {
        let insert = Insert::into_table(&users()).build().unwrap();
        assert_eq!(insert.source, InsertSource::DefaultValues);
    }

    #[test]
    fn test_update_rejects_unknown_column() {
        let err = Update::table(&users()).set("nope", 1).build().unwrap_err();
        assert!(matches!(err, SqlError::Unconsumed { .. }));
    }

    #[test]
    fn test_index_columns_checked() {
        assert!(Index::new("ix", &users(), &["name"]).is_ok());
        assert!(Index::new("ix", &users(), &["missing"]).is_err());
    }
}
