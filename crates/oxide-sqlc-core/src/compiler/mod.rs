//! Statement compilation.
//!
//! [`Compiler::compile`] renders a [`Statement`] for one dialect in a single
//! recursive pass. All bookkeeping lives in a per-invocation state: bind
//! names, table aliases, result columns and nesting depth. The statement
//! tree itself is never modified; rewrites such as ROW_NUMBER wrapping build
//! new nodes.
//!
//! ```rust
//! use oxide_sqlc_core::ast::select;
//! use oxide_sqlc_core::compiler::compile;
//! use oxide_sqlc_core::dialect::GenericDialect;
//! use oxide_sqlc_core::schema::{ColumnDef, Table};
//! use oxide_sqlc_core::types::SqlType;
//!
//! let users = Table::new("users", vec![
//!     ColumnDef::new("id", SqlType::integer()).primary_key(),
//!     ColumnDef::new("name", SqlType::string(Some(50))),
//! ]).unwrap();
//!
//! let query = select(vec![users.c("name")])
//!     .from(&users)
//!     .where_clause(users.c("id").eq(7));
//! let compiled = compile(&query.into(), &GenericDialect::new()).unwrap();
//!
//! assert_eq!(compiled.sql, "SELECT users.name FROM users WHERE users.id = ?");
//! assert_eq!(compiled.binds[0].name, "id");
//! ```

mod ddl;
mod dml;
mod expr;
mod limit;
mod select;

pub use limit::wrap_with_row_number;

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::ast::{BindParam, FromItem, Statement};
use crate::compiled::{BindInfo, CompiledStatement, InsertInfo, ResultColumn, StatementKind};
use crate::dialect::{Capabilities, Dialect, ParamStyle};
use crate::error::{Result, SqlError};
use crate::identifier::IdentifierPreparer;
use crate::schema::TableKey;
use crate::visit::{self, Visitor};

/// Options that change how a statement is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CompileOptions {
    /// Render bind values inline instead of as placeholders.
    pub literal_binds: bool,
}

/// Compiles statements for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'d> {
    dialect: &'d dyn Dialect,
    options: CompileOptions,
    capabilities: Option<Capabilities>,
}

impl<'d> Compiler<'d> {
    /// Creates a compiler for `dialect` with default options.
    #[must_use]
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            options: CompileOptions::default(),
            capabilities: None,
        }
    }

    /// Replaces the options.
    #[must_use]
    pub const fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Compiles against `capabilities` instead of reading the dialect's
    /// current record. Every capability-dependent choice of one compilation
    /// then comes from the same record.
    #[must_use]
    pub const fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Compiles `statement`.
    ///
    /// # Errors
    ///
    /// - [`SqlError::CapabilityViolation`] if the dialect cannot express part
    ///   of the statement.
    /// - [`SqlError::BindConflict`] if two named binds disagree.
    /// - [`SqlError::LiteralUnsupported`] in literal mode for a bind without
    ///   a literal rendering.
    pub fn compile(&self, statement: &Statement) -> Result<CompiledStatement> {
        let caps = self
            .capabilities
            .unwrap_or_else(|| self.dialect.capabilities());
        let mut state = Compilation::new(self.dialect, self.options, caps);
        state.reserve_bind_names(statement);
        let (kind, sql) = state.statement(statement)?;
        debug!(
            dialect = self.dialect.name(),
            sql = sql.as_str(),
            binds = state.binds.len(),
            "compiled statement"
        );
        Ok(CompiledStatement {
            sql,
            binds: state.binds,
            positional: state.positional,
            param_style: state.param_style,
            result_columns: state.result_columns,
            kind,
            insert: state.insert,
            has_returning: state.has_returning,
            dialect: self.dialect.name(),
        })
    }
}

/// Compiles `statement` for `dialect` with default options.
///
/// # Errors
///
/// See [`Compiler::compile`].
pub fn compile(statement: &Statement, dialect: &dyn Dialect) -> Result<CompiledStatement> {
    Compiler::new(dialect).compile(statement)
}

/// Collects the keys of named binds so generated names avoid them.
struct NamedBinds<'p> {
    preparer: &'p IdentifierPreparer,
    names: HashSet<String>,
}

impl Visitor for NamedBinds<'_> {
    fn visit_bind(&mut self, bind: &BindParam) {
        if !bind.unique {
            self.names.insert(self.preparer.truncate(&bind.key));
        }
    }
}

/// Per-invocation compiler state.
struct Compilation<'d> {
    dialect: &'d dyn Dialect,
    caps: Capabilities,
    preparer: IdentifierPreparer,
    options: CompileOptions,
    param_style: ParamStyle,
    binds: Vec<BindInfo>,
    named_binds: HashMap<String, usize>,
    reserved_names: HashSet<String>,
    used_bind_names: HashSet<String>,
    positional: Vec<String>,
    table_aliases: HashMap<TableKey, String>,
    used_aliases: HashSet<String>,
    /// FROM items of the enclosing SELECTs, innermost last.
    scopes: Vec<Vec<FromItem>>,
    result_columns: Vec<ResultColumn>,
    depth: usize,
    dml_target: Option<TableKey>,
    insert: Option<InsertInfo>,
    has_returning: bool,
}

impl<'d> Compilation<'d> {
    fn new(dialect: &'d dyn Dialect, options: CompileOptions, caps: Capabilities) -> Self {
        Self {
            dialect,
            caps,
            preparer: dialect.preparer_with(&caps),
            options,
            param_style: dialect.param_style(),
            binds: vec![],
            named_binds: HashMap::new(),
            reserved_names: HashSet::new(),
            used_bind_names: HashSet::new(),
            positional: vec![],
            table_aliases: HashMap::new(),
            used_aliases: HashSet::new(),
            scopes: vec![],
            result_columns: vec![],
            depth: 0,
            dml_target: None,
            insert: None,
            has_returning: false,
        }
    }

    fn reserve_bind_names(&mut self, statement: &Statement) {
        let mut named = NamedBinds {
            preparer: &self.preparer,
            names: HashSet::new(),
        };
        visit::walk(&mut named, statement);
        self.reserved_names = named.names;
    }

    fn capability_error(&self, capability: &'static str, detail: impl Into<String>) -> SqlError {
        SqlError::capability(self.dialect.name(), capability, detail)
    }

    fn statement(&mut self, statement: &Statement) -> Result<(StatementKind, String)> {
        match statement {
            Statement::Query(query) => Ok((StatementKind::Select, self.query(query, true)?)),
            Statement::Insert(insert) => Ok((StatementKind::Insert, self.insert(insert)?)),
            Statement::Update(update) => Ok((StatementKind::Update, self.update(update)?)),
            Statement::Delete(delete) => Ok((StatementKind::Delete, self.delete(delete)?)),
            Statement::CreateTable {
                table,
                if_not_exists,
            } => Ok((StatementKind::Ddl, self.create_table(table, *if_not_exists)?)),
            Statement::DropTable { table, if_exists } => {
                Ok((StatementKind::Ddl, self.drop_table(table, *if_exists)))
            }
            Statement::CreateIndex(index) => Ok((StatementKind::Ddl, self.create_index(index))),
            Statement::DropIndex(index) => Ok((StatementKind::Ddl, self.drop_index(index))),
        }
    }

    /// Renders a bind parameter: a placeholder, or its value in literal mode.
    fn bind(&mut self, bind: &BindParam) -> Result<String> {
        if self.options.literal_binds {
            return self.literal_bind(bind);
        }

        let (index, first) = if bind.unique {
            (self.new_unique_bind(bind), true)
        } else {
            self.named_bind(bind)?
        };
        let name = self.binds[index].name.clone();
        if first || self.param_style.repeats_positionally() {
            self.positional.push(name.clone());
        }
        Ok(self.param_style.placeholder(&name, index + 1))
    }

    fn literal_bind(&self, bind: &BindParam) -> Result<String> {
        let unsupported = |reason: &str| SqlError::LiteralUnsupported {
            param: bind.key.clone(),
            reason: reason.to_string(),
        };
        let value = bind
            .value
            .as_ref()
            .ok_or_else(|| unsupported("the parameter has no value"))?;
        if value.is_null() {
            return Ok(String::from("NULL"));
        }
        let processor = self
            .dialect
            .literal_processor(&bind.sql_type, &self.caps)
            .ok_or_else(|| unsupported(&format!("type {} has no literal rendering", bind.sql_type.kind().name())))?;
        processor(value).map_err(|err| match err {
            SqlError::LiteralUnsupported { reason, .. } => unsupported(&reason),
            other => other,
        })
    }

    /// Registers a named bind, or checks it against the earlier occurrence.
    /// Returns its index and whether this is its first occurrence.
    fn named_bind(&mut self, bind: &BindParam) -> Result<(usize, bool)> {
        let name = self.preparer.truncate(&bind.key);
        if let Some(&index) = self.named_binds.get(&name) {
            let existing = &mut self.binds[index];
            if existing.sql_type != bind.sql_type {
                return Err(SqlError::BindConflict(format!(
                    "bind parameter '{name}' is used with types {} and {}",
                    existing.sql_type.kind().name(),
                    bind.sql_type.kind().name()
                )));
            }
            match (&existing.value, &bind.value) {
                (Some(a), Some(b)) if a != b => {
                    return Err(SqlError::BindConflict(format!(
                        "bind parameter '{name}' is given two different values"
                    )));
                }
                (None, Some(value)) => existing.value = Some(value.clone()),
                _ => {}
            }
            return Ok((index, false));
        }
        let index = self.push_bind(name.clone(), bind);
        self.named_binds.insert(name, index);
        Ok((index, true))
    }

    fn new_unique_bind(&mut self, bind: &BindParam) -> usize {
        let mut name = self.preparer.truncate(&bind.key);
        let mut n = 0_usize;
        while self.used_bind_names.contains(&name) || self.reserved_names.contains(&name) {
            n += 1;
            name = self.preparer.truncate(&format!("{}_{n}", bind.key));
        }
        self.push_bind(name, bind)
    }

    fn push_bind(&mut self, name: String, bind: &BindParam) -> usize {
        self.used_bind_names.insert(name.clone());
        self.binds.push(BindInfo {
            name,
            key: bind.key.clone(),
            sql_type: bind.sql_type.clone(),
            value: bind.value.clone(),
            processor: self.dialect.bind_processor(&bind.sql_type, &self.caps),
        });
        self.binds.len() - 1
    }

    /// Returns the alias a table is referenced by, assigning one on first
    /// use when the dialect aliases schema-qualified tables.
    fn table_alias(&mut self, key: &TableKey) -> Option<String> {
        if let Some(alias) = self.table_aliases.get(key) {
            return Some(alias.clone());
        }
        if key.schema.is_none()
            || !self.caps.alias_schema_qualified_tables
            || self.dml_target.as_ref() == Some(key)
        {
            return None;
        }
        let mut n = 1_usize;
        let mut alias = self.preparer.truncate(&format!("{}_{n}", key.name));
        while self.used_aliases.contains(&alias) {
            n += 1;
            alias = self.preparer.truncate(&format!("{}_{n}", key.name));
        }
        self.used_aliases.insert(alias.clone());
        self.table_aliases.insert(key.clone(), alias.clone());
        Some(alias)
    }
}
