//! The result of compiling a statement.
//!
//! A [`CompiledStatement`] is immutable and independent of the compiler
//! that produced it. It carries everything needed to execute the statement
//! repeatedly: the SQL text, the bind parameters with their processors, and
//! the result column map used to decode rows.

use std::collections::BTreeMap;

use crate::dialect::ParamStyle;
use crate::error::{Result, SqlError};
use crate::schema::Table;
use crate::types::{Processor, SqlType};
use crate::value::{SqlValue, ToSqlValue};

/// The kind of a compiled statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// SELECT or compound SELECT.
    Select,
    /// INSERT.
    Insert,
    /// UPDATE.
    Update,
    /// DELETE.
    Delete,
    /// CREATE / DROP.
    Ddl,
}

/// One bind parameter of a compiled statement.
#[derive(Debug, Clone)]
pub struct BindInfo {
    /// Placeholder name, unique within the statement.
    pub name: String,
    /// The key the parameter was created with.
    pub key: String,
    /// Logical type.
    pub sql_type: SqlType,
    /// Value captured at construction, used when none is supplied.
    pub value: Option<SqlValue>,
    /// Converts values before they reach the driver.
    pub processor: Option<Processor>,
}

/// One column of the result set.
#[derive(Debug, Clone)]
pub struct ResultColumn {
    /// Zero-based position.
    pub position: usize,
    /// Output name; `None` for unnamed expressions.
    pub name: Option<String>,
    /// Logical type.
    pub sql_type: SqlType,
    /// Converts driver values for the application.
    pub processor: Option<Processor>,
}

/// Where an INSERT's explicit value for the auto-increment column comes
/// from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
    /// From these bind parameters; the value is known at execution.
    Bound(Vec<String>),
    /// From an inline expression.
    Inline,
}

/// Facts about a compiled INSERT that execution contexts need.
#[derive(Debug, Clone)]
pub struct InsertInfo {
    /// Target table.
    pub table: Table,
    /// Name of the auto-increment column.
    pub autoincrement_column: Option<String>,
    /// Key of the auto-increment column.
    pub autoincrement_key: Option<String>,
    /// Source of an explicit auto-increment value, if one is inserted.
    pub explicit_identity: Option<IdentitySource>,
    /// The generated id is fetched after the statement runs.
    pub postfetch_lastrowid: bool,
}

/// Values for bind parameters, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: BTreeMap<String, SqlValue>,
}

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value for a bind name or key.
    #[must_use]
    pub fn set(mut self, name: &str, value: impl ToSqlValue) -> Self {
        self.values.insert(name.to_string(), value.to_sql_value());
        self
    }

    /// Returns the value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.values.get(name)
    }

    /// Returns `true` if no values are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A compiled statement.
#[derive(Debug, Clone)]
pub struct CompiledStatement {
    /// SQL text.
    pub sql: String,
    /// Bind parameters in order of first appearance.
    pub binds: Vec<BindInfo>,
    /// Bind name for each placeholder, in text order. Names repeat when a
    /// positional style repeats a parameter.
    pub positional: Vec<String>,
    /// Placeholder syntax used in `sql`.
    pub param_style: ParamStyle,
    /// Result columns.
    pub result_columns: Vec<ResultColumn>,
    /// Statement kind.
    pub kind: StatementKind,
    /// INSERT facts.
    pub insert: Option<InsertInfo>,
    /// The statement has a RETURNING clause.
    pub has_returning: bool,
    /// Name of the dialect it was compiled for.
    pub dialect: &'static str,
}

impl CompiledStatement {
    /// Returns the bind named `name`.
    #[must_use]
    pub fn bind_info(&self, name: &str) -> Option<&BindInfo> {
        self.binds.iter().find(|b| b.name == name)
    }

    /// Returns the bind names in order.
    pub fn bind_names(&self) -> impl Iterator<Item = &str> {
        self.binds.iter().map(|b| b.name.as_str())
    }

    /// Resolves and processes a value for every bind parameter.
    ///
    /// A supplied value is matched by bind name, then by key; otherwise the
    /// value captured at construction is used.
    ///
    /// # Errors
    ///
    /// - [`SqlError::Unconsumed`] if `params` names no bind parameter.
    /// - [`SqlError::MissingBindValue`] if a parameter has no value.
    /// - A processor error if a value cannot be converted.
    pub fn bind(&self, params: &Params) -> Result<Vec<(String, SqlValue)>> {
        let unconsumed: Vec<String> = params
            .values
            .keys()
            .filter(|k| !self.binds.iter().any(|b| &b.name == *k || &b.key == *k))
            .cloned()
            .collect();
        if !unconsumed.is_empty() {
            return Err(SqlError::Unconsumed { names: unconsumed });
        }

        self.binds
            .iter()
            .map(|bind| {
                let value = params
                    .get(&bind.name)
                    .or_else(|| params.get(&bind.key))
                    .or(bind.value.as_ref())
                    .cloned()
                    .ok_or_else(|| SqlError::MissingBindValue(bind.name.clone()))?;
                let value = match bind.processor {
                    Some(processor) => processor(value)?,
                    None => value,
                };
                Ok((bind.name.clone(), value))
            })
            .collect()
    }

    /// Orders bound values by placeholder.
    #[must_use]
    pub fn positional_values(&self, bound: &[(String, SqlValue)]) -> Vec<SqlValue> {
        self.positional
            .iter()
            .filter_map(|name| {
                bound
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v.clone())
            })
            .collect()
    }

    /// Applies result processors to a driver row.
    ///
    /// # Errors
    ///
    /// Returns a processor error if a value cannot be converted.
    pub fn decode_row(&self, row: Vec<SqlValue>) -> Result<Vec<SqlValue>> {
        row.into_iter()
            .enumerate()
            .map(|(i, value)| {
                match self.result_columns.get(i).and_then(|c| c.processor) {
                    Some(processor) => processor(value),
                    None => Ok(value),
                }
            })
            .collect()
    }
}
