//! Table-level constraints.

use super::column::ForeignKeyAction;

/// A table constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// PRIMARY KEY over one or more columns.
    PrimaryKey {
        /// Optional constraint name.
        name: Option<String>,
        /// Column names.
        columns: Vec<String>,
    },
    /// FOREIGN KEY referencing another table.
    ForeignKey {
        /// Optional constraint name.
        name: Option<String>,
        /// Local column names.
        columns: Vec<String>,
        /// Referenced table, optionally `schema.table`.
        references_table: String,
        /// Referenced column names.
        references_columns: Vec<String>,
        /// ON DELETE action.
        on_delete: Option<ForeignKeyAction>,
        /// ON UPDATE action.
        on_update: Option<ForeignKeyAction>,
    },
    /// UNIQUE over one or more columns.
    Unique {
        /// Optional constraint name.
        name: Option<String>,
        /// Column names.
        columns: Vec<String>,
    },
    /// CHECK with a raw SQL condition.
    Check {
        /// Optional constraint name.
        name: Option<String>,
        /// The condition, rendered verbatim.
        expression: String,
    },
}

impl Constraint {
    /// Creates an unnamed primary key constraint.
    #[must_use]
    pub fn primary_key(columns: &[&str]) -> Self {
        Self::PrimaryKey {
            name: None,
            columns: columns.iter().map(|c| String::from(*c)).collect(),
        }
    }

    /// Creates an unnamed unique constraint.
    #[must_use]
    pub fn unique(columns: &[&str]) -> Self {
        Self::Unique {
            name: None,
            columns: columns.iter().map(|c| String::from(*c)).collect(),
        }
    }

    /// Creates an unnamed foreign key constraint.
    #[must_use]
    pub fn foreign_key(columns: &[&str], table: &str, references: &[&str]) -> Self {
        Self::ForeignKey {
            name: None,
            columns: columns.iter().map(|c| String::from(*c)).collect(),
            references_table: String::from(table),
            references_columns: references.iter().map(|c| String::from(*c)).collect(),
            on_delete: None,
            on_update: None,
        }
    }

    /// Creates an unnamed check constraint.
    #[must_use]
    pub fn check(expression: impl Into<String>) -> Self {
        Self::Check {
            name: None,
            expression: expression.into(),
        }
    }

    /// Sets the constraint name.
    #[must_use]
    pub fn named(mut self, constraint_name: impl Into<String>) -> Self {
        match &mut self {
            Self::PrimaryKey { name, .. }
            | Self::ForeignKey { name, .. }
            | Self::Unique { name, .. }
            | Self::Check { name, .. } => *name = Some(constraint_name.into()),
        }
        self
    }

    /// Sets the ON DELETE action of a foreign key. Other constraints are unchanged.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        if let Self::ForeignKey { on_delete, .. } = &mut self {
            *on_delete = Some(action);
        }
        self
    }

    /// Sets the ON UPDATE action of a foreign key. Other constraints are unchanged.
    #[must_use]
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        if let Self::ForeignKey { on_update, .. } = &mut self {
            *on_update = Some(action);
        }
        self
    }

    /// Returns the local columns the constraint covers.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        match self {
            Self::PrimaryKey { columns, .. }
            | Self::ForeignKey { columns, .. }
            | Self::Unique { columns, .. } => columns,
            Self::Check { .. } => &[],
        }
    }
}
