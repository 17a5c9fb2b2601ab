//! SQL dialect support.
//!
//! A [`Dialect`] is a profile the compiler consults while rendering: a
//! [`Capabilities`] record, strategy tags for constructs with more than one
//! rendering (row limits, RETURNING, multi-row VALUES), identifier rules,
//! type overrides and value processors. Every hook has an ANSI default, so
//! a dialect only overrides what differs.
//!
//! Version-dependent capabilities are filled in once, by
//! [`Dialect::initialize`], from a [`ServerProbe`].

mod capabilities;
mod generic;
mod options;
mod postgres;
mod registry;

pub use capabilities::{Capabilities, CapabilityCell, LateralStyle, ServerProbe, ServerVersion};
pub use generic::GenericDialect;
pub use options::DialectOptions;
pub use postgres::PostgresDialect;
pub use registry::{DialectConstructor, DialectRegistry};

use std::fmt;

use crate::ast::{BinaryOp, Index};
use crate::error::Result;
use crate::execution::{DefaultExecutionContext, ExecutionContext};
use crate::identifier::{ANSI_RESERVED_WORDS, IdentifierPreparer};
use crate::schema::ColumnDef;
use crate::types::{
    LiteralProcessor, Processor, SqlType, TypeKind, TypeOverride, base_bind_processor,
    base_literal_processor, base_result_processor,
};

/// How LIMIT and OFFSET are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitStrategy {
    /// Trailing `LIMIT n OFFSET m`.
    LimitOffset,
    /// Leading `TOP n`; offsets cannot be expressed.
    Top,
    /// `TOP n` for limits; offsets wrap the query in a `ROW_NUMBER()`
    /// window and filter on it.
    RowNumber,
}

/// How values generated by an INSERT reach the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturningStrategy {
    /// A RETURNING clause.
    Returning,
    /// A separate query after the statement.
    PostFetch,
}

/// Whether one INSERT may carry several VALUES rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiValuesStrategy {
    /// `VALUES (...), (...)`.
    Supported,
    /// One row per statement.
    Unsupported,
}

/// Placeholder syntax for bind parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamStyle {
    /// `?`
    Qmark,
    /// `:name`
    Named,
    /// `:1`
    Numeric,
    /// `%s`
    Format,
    /// `%(name)s`
    Pyformat,
    /// `$1`
    Dollar,
}

impl ParamStyle {
    /// Renders the placeholder for the bind `name` at 1-based `position`.
    #[must_use]
    pub fn placeholder(self, name: &str, position: usize) -> String {
        match self {
            Self::Qmark => String::from("?"),
            Self::Named => format!(":{name}"),
            Self::Numeric => format!(":{position}"),
            Self::Format => String::from("%s"),
            Self::Pyformat => format!("%({name})s"),
            Self::Dollar => format!("${position}"),
        }
    }

    /// Returns `true` if each occurrence of a placeholder consumes one
    /// positional value, so a repeated bind repeats its value.
    #[must_use]
    pub const fn repeats_positionally(self) -> bool {
        matches!(self, Self::Qmark | Self::Format)
    }
}

/// How a function call is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionRender {
    /// Call under another name: `LEN(x)`.
    Rename(&'static str),
    /// A bare keyword without parentheses: `CURRENT_TIMESTAMP`.
    Keyword(&'static str),
}

/// Savepoint statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavepointClauses {
    /// Creates the savepoint.
    pub create: String,
    /// Rolls back to it.
    pub rollback_to: String,
    /// Releases it, where the backend has such a statement.
    pub release: Option<String>,
}

/// Transaction control statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionClauses {
    /// Starts a transaction.
    pub begin: String,
    /// Commits.
    pub commit: String,
    /// Rolls back.
    pub rollback: String,
}

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns a string that differs between dialect instances that render
    /// differently. Compiled statements are cached under it.
    fn identity(&self) -> String {
        self.name().to_string()
    }

    /// Returns the opening and closing identifier quote characters.
    fn identifier_quotes(&self) -> (char, char) {
        ('"', '"')
    }

    /// Returns the lower-case words that must be quoted as identifiers.
    fn reserved_words(&self) -> &'static [&'static str] {
        ANSI_RESERVED_WORDS
    }

    /// Returns `true` if the backend folds unquoted identifiers to lower
    /// case.
    fn folds_to_lowercase(&self) -> bool {
        true
    }

    /// Returns the current capability record.
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Returns the placeholder style.
    fn param_style(&self) -> ParamStyle {
        ParamStyle::Qmark
    }

    /// Returns an identifier preparer configured for this dialect.
    fn preparer(&self) -> IdentifierPreparer {
        self.preparer_with(&self.capabilities())
    }

    /// Returns an identifier preparer for the given capability record.
    fn preparer_with(&self, caps: &Capabilities) -> IdentifierPreparer {
        IdentifierPreparer::new(
            self.identifier_quotes(),
            self.reserved_words(),
            self.folds_to_lowercase(),
            caps.max_identifier_length,
        )
    }

    /// Returns the LIMIT/OFFSET strategy.
    fn limit_strategy(&self, _caps: &Capabilities) -> LimitStrategy {
        LimitStrategy::LimitOffset
    }

    /// Returns the RETURNING strategy.
    fn returning_strategy(&self, caps: &Capabilities) -> ReturningStrategy {
        if caps.supports_returning {
            ReturningStrategy::Returning
        } else {
            ReturningStrategy::PostFetch
        }
    }

    /// Returns the multi-row VALUES strategy.
    fn multivalues_strategy(&self, caps: &Capabilities) -> MultiValuesStrategy {
        if caps.supports_multivalues_insert {
            MultiValuesStrategy::Supported
        } else {
            MultiValuesStrategy::Unsupported
        }
    }

    /// Returns a replacement token for a binary operator.
    fn binary_operator(&self, _op: BinaryOp) -> Option<&'static str> {
        None
    }

    /// Returns a replacement rendering for a function, by lower-case name.
    fn function_name(&self, _name: &str) -> Option<FunctionRender> {
        None
    }

    /// Renders `EXTRACT(field FROM expr)` given the rendered operand.
    fn render_extract(&self, field: &str, expr: &str) -> String {
        format!("EXTRACT({field} FROM {expr})")
    }

    /// Returns `true` if recursive CTEs are introduced by `WITH RECURSIVE`
    /// rather than a plain `WITH`.
    fn uses_with_recursive(&self) -> bool {
        true
    }

    /// Returns the savepoint statements for `name`.
    fn savepoint_clauses(&self, name: &str) -> SavepointClauses {
        let name = self.preparer().quote(name);
        SavepointClauses {
            create: format!("SAVEPOINT {name}"),
            rollback_to: format!("ROLLBACK TO SAVEPOINT {name}"),
            release: Some(format!("RELEASE SAVEPOINT {name}")),
        }
    }

    /// Returns the transaction control statements.
    fn transaction_clauses(&self) -> TransactionClauses {
        TransactionClauses {
            begin: String::from("BEGIN"),
            commit: String::from("COMMIT"),
            rollback: String::from("ROLLBACK"),
        }
    }

    /// Returns the dialect's type overrides, consulted before the ANSI base
    /// table.
    fn type_overrides(&self) -> &'static [TypeOverride] {
        &[]
    }

    /// Returns the dialect's native type names for reverse lookup,
    /// consulted before the ANSI base names.
    fn native_type_names(&self) -> &'static [(&'static str, TypeKind)] {
        &[]
    }

    /// Returns a bind processor for binary values when the driver cannot
    /// take them as-is.
    fn binary_bind(&self) -> Option<Processor> {
        None
    }

    /// Returns the bind processor for a type.
    fn bind_processor(&self, ty: &SqlType, caps: &Capabilities) -> Option<Processor> {
        if ty.kind() == TypeKind::Binary {
            if let Some(processor) = self.binary_bind() {
                return Some(processor);
            }
        }
        base_bind_processor(ty, caps)
    }

    /// Returns the result processor for a type.
    fn result_processor(&self, ty: &SqlType, caps: &Capabilities) -> Option<Processor> {
        base_result_processor(ty, caps)
    }

    /// Returns the literal processor for a type.
    fn literal_processor(&self, ty: &SqlType, caps: &Capabilities) -> Option<LiteralProcessor> {
        base_literal_processor(ty, caps)
    }

    /// Returns the query that reads the last generated row id, for dialects
    /// that fetch it after the INSERT.
    fn last_inserted_id_query(&self) -> Option<String> {
        None
    }

    /// Returns the schema unqualified names resolve to.
    fn default_schema_name(&self) -> Option<&str> {
        None
    }

    /// Returns the statement timeout, in seconds, applied by execution
    /// contexts.
    fn query_timeout(&self) -> Option<u64> {
        None
    }

    /// Creates the per-execution context.
    fn create_execution_context(&self) -> Box<dyn ExecutionContext> {
        Box::new(DefaultExecutionContext::new(
            self.last_inserted_id_query(),
            self.query_timeout(),
        ))
    }

    /// Replaces the native type of an auto-increment column (`SERIAL`).
    fn autoincrement_type(&self, _column: &ColumnDef) -> Option<String> {
        None
    }

    /// Returns the clause appended to an auto-increment column in DDL.
    fn autoincrement_clause(&self, _column: &ColumnDef) -> Option<String> {
        Some(String::from("GENERATED BY DEFAULT AS IDENTITY"))
    }

    /// Returns what follows `DROP INDEX`.
    fn drop_index_target(&self, index: &Index, preparer: &IdentifierPreparer) -> String {
        preparer.quote(&index.name)
    }

    /// Probes the server and publishes version-dependent capabilities.
    ///
    /// # Errors
    ///
    /// Returns the probe's error; the dialect keeps its defaults.
    fn initialize(&self, _probe: &dyn ServerProbe) -> Result<()> {
        Ok(())
    }
}
