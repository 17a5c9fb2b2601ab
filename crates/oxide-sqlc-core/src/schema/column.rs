//! Column definitions.

use crate::types::SqlType;
use crate::value::SqlValue;

/// Declared nullability of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Nullability {
    /// Render `NOT NULL`.
    NotNull,
    /// Render `NULL`.
    Null,
    /// Render nothing and let the database decide.
    #[default]
    Unspecified,
}

/// Whether a column takes server-generated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AutoIncrement {
    /// Auto-increment if this is the table's only integer primary key column.
    #[default]
    Auto,
    /// Always auto-increment.
    Enabled,
    /// Never auto-increment.
    Disabled,
}

/// Seed and step of an identity column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity {
    /// First generated value.
    pub start: i64,
    /// Step between generated values.
    pub increment: i64,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            start: 1,
            increment: 1,
        }
    }
}

/// Default value of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnDefault {
    /// Client-side constant.
    Value(SqlValue),
    /// Server-side SQL expression, rendered verbatim (e.g. `CURRENT_TIMESTAMP`).
    Expression(String),
    /// Generated by an identity or sequence.
    Sequence(Identity),
}

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForeignKeyAction {
    /// No action.
    NoAction,
    /// Restrict deletion/update.
    Restrict,
    /// Cascade the operation.
    Cascade,
    /// Set to NULL.
    SetNull,
    /// Set to default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of the action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// A reference from one column to a column of another table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKeyRef {
    /// The referenced table name, optionally schema-qualified (`schema.table`).
    pub table: String,
    /// The referenced column name.
    pub column: String,
}

/// A column of a [`Table`](super::Table).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnDef {
    /// Name in the database.
    pub name: String,
    /// Application-facing key. Defaults to `name`.
    pub key: String,
    /// Logical type.
    pub sql_type: SqlType,
    /// Declared nullability.
    pub nullable: Nullability,
    /// Default value, if any.
    pub default: Option<ColumnDefault>,
    /// Whether this column is part of the primary key.
    pub primary_key: bool,
    /// Auto-increment behavior.
    pub autoincrement: AutoIncrement,
    /// Whether this column is unique.
    pub unique: bool,
    /// Foreign key reference, if any.
    pub foreign_key: Option<ForeignKeyRef>,
}

impl ColumnDef {
    /// Creates a new column definition.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        let name = name.into();
        Self {
            key: name.clone(),
            name,
            sql_type,
            nullable: Nullability::Unspecified,
            default: None,
            primary_key: false,
            autoincrement: AutoIncrement::Auto,
            unique: false,
            foreign_key: None,
        }
    }

    /// Sets the application-facing key.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = Nullability::NotNull;
        self
    }

    /// Sets the column as explicitly NULL.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = Nullability::Null;
        self
    }

    /// Sets the column as part of the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Forces auto-increment on.
    #[must_use]
    pub const fn autoincrement(mut self) -> Self {
        self.autoincrement = AutoIncrement::Enabled;
        self
    }

    /// Forces auto-increment off.
    #[must_use]
    pub const fn no_autoincrement(mut self) -> Self {
        self.autoincrement = AutoIncrement::Disabled;
        self
    }

    /// Declares an identity with a custom seed and step.
    #[must_use]
    pub fn identity(mut self, start: i64, increment: i64) -> Self {
        self.autoincrement = AutoIncrement::Enabled;
        self.default = Some(ColumnDefault::Sequence(Identity { start, increment }));
        self
    }

    /// Sets the column as UNIQUE.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets a client-side default value.
    #[must_use]
    pub fn default_value(mut self, value: SqlValue) -> Self {
        self.default = Some(ColumnDefault::Value(value));
        self
    }

    /// Sets a server-side default expression.
    #[must_use]
    pub fn server_default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(ColumnDefault::Expression(expr.into()));
        self
    }

    /// Adds a foreign key reference.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    /// Returns the identity parameters if the default is a sequence.
    #[must_use]
    pub const fn identity_spec(&self) -> Option<Identity> {
        match &self.default {
            Some(ColumnDefault::Sequence(identity)) => Some(*identity),
            _ => None,
        }
    }
}
