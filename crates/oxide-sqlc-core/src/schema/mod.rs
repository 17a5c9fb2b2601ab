//! Table and column metadata.
//!
//! A [`Table`] owns its [`ColumnDef`]s; expressions refer to a column through
//! a shared handle to the table plus the column name, so the same table can
//! appear in many statements without copying its definition.

mod column;
mod constraint;
mod metadata;
mod table;

pub use column::{
    AutoIncrement, ColumnDef, ColumnDefault, ForeignKeyAction, ForeignKeyRef, Identity,
    Nullability,
};
pub use constraint::Constraint;
pub use metadata::MetaData;
pub use table::{Table, TableBuilder, TableKey};
