//! Table handles.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use super::column::{AutoIncrement, ColumnDef, ColumnDefault};
use super::constraint::Constraint;
use crate::ast::{ColumnRef, ColumnSource, Expr, FromItem, TableAlias};
use crate::error::{Result, SqlError};
use crate::types::SqlType;

/// Identifies a table within one statement: optional schema plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableKey {
    /// Schema name.
    pub schema: Option<String>,
    /// Table name.
    pub name: String,
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct TableInner {
    name: String,
    schema: Option<String>,
    columns: Vec<ColumnDef>,
    constraints: Vec<Constraint>,
    options: BTreeMap<String, String>,
}

/// A table definition.
///
/// `Table` is a cheap-to-clone shared handle. Equality and hashing are
/// structural: two tables built independently from the same definition
/// compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Table(Arc<TableInner>);

impl Table {
    /// Starts building a table.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder {
            name: name.into(),
            schema: None,
            columns: vec![],
            constraints: vec![],
            options: BTreeMap::new(),
        }
    }

    /// Builds an unqualified table from its columns.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Result<Self> {
        columns
            .into_iter()
            .fold(Self::builder(name), TableBuilder::column)
            .build()
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns the schema name.
    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.0.schema.as_deref()
    }

    /// Returns the schema and name pair.
    #[must_use]
    pub fn key(&self) -> TableKey {
        TableKey {
            schema: self.0.schema.clone(),
            name: self.0.name.clone(),
        }
    }

    /// Returns the columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.0.columns
    }

    /// Looks up a column by key.
    #[must_use]
    pub fn column(&self, key: &str) -> Option<&ColumnDef> {
        self.0.columns.iter().find(|c| c.key == key)
    }

    /// Returns the table constraints.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.0.constraints
    }

    /// Returns the dialect-specific table options.
    #[must_use]
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.0.options
    }

    /// Returns the primary key columns: flagged columns first, then
    /// columns named by a PRIMARY KEY constraint.
    #[must_use]
    pub fn primary_key(&self) -> Vec<&ColumnDef> {
        let mut names: Vec<&str> = self
            .0
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect();
        for constraint in &self.0.constraints {
            if let Constraint::PrimaryKey { columns, .. } = constraint {
                for name in columns {
                    if !names.contains(&name.as_str()) {
                        names.push(name.as_str());
                    }
                }
            }
        }
        names
            .into_iter()
            .filter_map(|name| self.0.columns.iter().find(|c| c.name == name))
            .collect()
    }

    /// Returns the column whose values the server generates.
    ///
    /// A column explicitly flagged auto-increment wins. Otherwise the table's
    /// single integer primary key column qualifies when it has no foreign key
    /// and no client-side default.
    #[must_use]
    pub fn autoincrement_column(&self) -> Option<&ColumnDef> {
        if let Some(col) = self
            .0
            .columns
            .iter()
            .find(|c| c.autoincrement == AutoIncrement::Enabled)
        {
            return Some(col);
        }
        match self.primary_key().as_slice() {
            [col] if col.autoincrement == AutoIncrement::Auto
                && col.sql_type.kind().is_integer()
                && col.foreign_key.is_none()
                && matches!(col.default, None | Some(ColumnDefault::Sequence(_))) =>
            {
                Some(*col)
            }
            _ => None,
        }
    }

    /// Returns a column expression for the column with the given key.
    ///
    /// A key that names no column yields an untyped reference by that name.
    #[must_use]
    pub fn c(&self, key: &str) -> Expr {
        let (name, sql_type) = self.column(key).map_or_else(
            || (String::from(key), SqlType::null()),
            |col| (col.name.clone(), col.sql_type.clone()),
        );
        Expr::Column(ColumnRef {
            source: Some(ColumnSource::Table(self.clone())),
            name,
            sql_type,
        })
    }

    /// Returns `table.*`.
    #[must_use]
    pub fn star(&self) -> Expr {
        Expr::Wildcard(Some(ColumnSource::Table(self.clone())))
    }

    /// Returns an aliased reference to this table.
    #[must_use]
    pub fn alias(&self, name: impl Into<String>) -> TableAlias {
        TableAlias {
            table: self.clone(),
            name: name.into(),
        }
    }
}

impl From<Table> for FromItem {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

impl From<&Table> for FromItem {
    fn from(table: &Table) -> Self {
        Self::Table(table.clone())
    }
}

/// Builder for [`Table`].
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    schema: Option<String>,
    columns: Vec<ColumnDef>,
    constraints: Vec<Constraint>,
    options: BTreeMap<String, String>,
}

impl TableBuilder {
    /// Sets the schema.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds a table constraint.
    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Sets a dialect-specific option.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Validates and builds the table.
    ///
    /// Fails on duplicate column keys, on constraints naming unknown
    /// columns, and when more than one column is flagged auto-increment:
    /// identity handling tracks a single generated column per table.
    pub fn build(self) -> Result<Table> {
        let mut keys = BTreeSet::new();
        for col in &self.columns {
            if !keys.insert(col.key.as_str()) {
                return Err(SqlError::StructuralConflict(format!(
                    "duplicate column key '{}' in table '{}'",
                    col.key, self.name
                )));
            }
        }

        let unknown: BTreeSet<&str> = self
            .constraints
            .iter()
            .flat_map(Constraint::columns)
            .map(String::as_str)
            .filter(|name| !self.columns.iter().any(|c| c.name == *name))
            .collect();
        if !unknown.is_empty() {
            return Err(SqlError::Unconsumed {
                names: unknown.into_iter().map(String::from).collect(),
            });
        }

        let explicit: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.autoincrement == AutoIncrement::Enabled)
            .map(|c| c.name.as_str())
            .collect();
        if explicit.len() > 1 {
            return Err(SqlError::StructuralConflict(format!(
                "table '{}' declares more than one auto-increment column ({}); \
                 only one generated column per table is supported",
                self.name,
                explicit.join(", ")
            )));
        }

        Ok(Table(Arc::new(TableInner {
            name: self.name,
            schema: self.schema,
            columns: self.columns,
            constraints: self.constraints,
            options: self.options,
        })))
    }
}
