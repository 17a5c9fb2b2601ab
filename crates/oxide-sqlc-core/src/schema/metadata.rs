//! A registry of tables.

use std::collections::{BTreeMap, BTreeSet};

use super::column::ColumnDef;
use super::constraint::Constraint;
use super::table::Table;
use crate::error::{Result, SqlError};

/// A collection of table definitions keyed by qualified name.
#[derive(Debug, Clone, Default)]
pub struct MetaData {
    tables: BTreeMap<String, Table>,
}

impl MetaData {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table and returns the registered handle.
    ///
    /// Registering a structurally equal table again returns the existing
    /// handle. A different definition under the same name is a conflict.
    pub fn add(&mut self, table: Table) -> Result<Table> {
        let key = table.key().to_string();
        if let Some(existing) = self.tables.get(&key) {
            if *existing == table {
                return Ok(existing.clone());
            }
            return Err(SqlError::StructuralConflict(format!(
                "table '{key}' is already defined; additional columns for an \
                 existing table are not accepted"
            )));
        }
        self.tables.insert(key, table.clone());
        Ok(table)
    }

    /// Looks up a table by qualified name (`schema.name` or `name`).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Returns the number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if no table is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Returns the tables ordered so that referenced tables come before the
    /// tables that reference them. Ties are broken by name.
    #[must_use]
    pub fn sorted_tables(&self) -> Vec<&Table> {
        let mut ordered = Vec::with_capacity(self.tables.len());
        let mut done = BTreeSet::new();
        let mut visiting = BTreeSet::new();
        for key in self.tables.keys() {
            self.visit(key, &mut done, &mut visiting, &mut ordered);
        }
        ordered
    }

    fn visit<'a>(
        &'a self,
        key: &str,
        done: &mut BTreeSet<String>,
        visiting: &mut BTreeSet<String>,
        ordered: &mut Vec<&'a Table>,
    ) {
        if done.contains(key) || !visiting.insert(key.to_string()) {
            return;
        }
        let Some(table) = self.tables.get(key) else {
            return;
        };
        for dep in dependencies(table) {
            if dep != key {
                self.visit(&dep, done, visiting, ordered);
            }
        }
        visiting.remove(key);
        done.insert(key.to_string());
        ordered.push(table);
    }
}

fn dependencies(table: &Table) -> BTreeSet<String> {
    let from_columns = table
        .columns()
        .iter()
        .filter_map(|c: &ColumnDef| c.foreign_key.as_ref())
        .map(|fk| fk.table.clone());
    let from_constraints = table.constraints().iter().filter_map(|c| match c {
        Constraint::ForeignKey {
            references_table, ..
        } => Some(references_table.clone()),
        _ => None,
    });
    from_columns.chain(from_constraints).collect()
}
