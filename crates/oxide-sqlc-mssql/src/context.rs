//! Per-execution hooks for SQL Server.
//!
//! An INSERT that supplies its own value for an IDENTITY column fails
//! unless `IDENTITY_INSERT` is switched on for the table. The context
//! switches it on before such a statement and off again afterwards, on
//! every exit path. For other INSERTs into a table with an IDENTITY column,
//! the generated value is fetched with `@@IDENTITY`, or with
//! `scope_identity()` in the same batch.

use oxide_sqlc_core::compiled::{CompiledStatement, IdentitySource, InsertInfo};
use oxide_sqlc_core::execution::{
    Cursor, ExecutionContext, ExecutionPlan, Row, fetch_scalar, first_value, log_cleanup_failure,
};
use oxide_sqlc_core::identifier::IdentifierPreparer;
use oxide_sqlc_core::value::SqlValue;
use oxide_sqlc_core::Result;
use tracing::debug;

const SCOPE_IDENTITY_SUFFIX: &str = "; SELECT scope_identity() AS lastrowid";

/// How generated ids are read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeIdentity {
    /// Run this query after the statement.
    Separate(String),
    /// Append `SELECT scope_identity()` to the statement's batch.
    Batched,
}

/// Where the context is in the `IDENTITY_INSERT` cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityInsertState {
    /// `IDENTITY_INSERT` was not touched.
    Normal,
    /// `IDENTITY_INSERT` is on for the target table.
    ExplicitOverride,
    /// `IDENTITY_INSERT` was switched off again.
    Restored,
}

/// The SQL Server execution context.
#[derive(Debug, Clone)]
pub struct MssqlExecutionContext {
    preparer: IdentifierPreparer,
    auto_identity_insert: bool,
    scope_identity: ScopeIdentity,
    timeout: Option<u64>,
    state: IdentityInsertState,
    override_table: Option<String>,
    explicit_ids: Option<Vec<SqlValue>>,
}

impl MssqlExecutionContext {
    /// Creates a context in the [`IdentityInsertState::Normal`] state.
    #[must_use]
    pub const fn new(
        preparer: IdentifierPreparer,
        auto_identity_insert: bool,
        scope_identity: ScopeIdentity,
        timeout: Option<u64>,
    ) -> Self {
        Self {
            preparer,
            auto_identity_insert,
            scope_identity,
            timeout,
            state: IdentityInsertState::Normal,
            override_table: None,
            explicit_ids: None,
        }
    }

    /// Returns the `IDENTITY_INSERT` state.
    #[must_use]
    pub const fn state(&self) -> IdentityInsertState {
        self.state
    }

    /// Explicit identity values of this execution, if the statement inserts
    /// any. `Some(vec![])` means the value is computed inline in the SQL.
    fn explicit_identity(info: &InsertInfo, bound: &[(String, SqlValue)]) -> Option<Vec<SqlValue>> {
        match info.explicit_identity.as_ref()? {
            IdentitySource::Inline => Some(vec![]),
            IdentitySource::Bound(names) => {
                let values: Vec<SqlValue> = names
                    .iter()
                    .filter_map(|name| bound.iter().find(|(n, _)| n == name))
                    .map(|(_, value)| value.clone())
                    .filter(|value| !value.is_null())
                    .collect();
                if values.is_empty() {
                    None
                } else {
                    Some(values)
                }
            }
        }
    }
}

impl ExecutionContext for MssqlExecutionContext {
    fn pre_exec(
        &mut self,
        compiled: &CompiledStatement,
        bound: &[(String, SqlValue)],
    ) -> Result<ExecutionPlan> {
        let mut plan = ExecutionPlan {
            timeout: self.timeout,
            ..ExecutionPlan::plain(compiled, bound)
        };
        let Some(info) = &compiled.insert else {
            return Ok(plan);
        };

        if let Some(ids) = Self::explicit_identity(info, bound) {
            if self.auto_identity_insert {
                let table = self.preparer.format_table(&info.table, true);
                plan.preamble.push(format!("SET IDENTITY_INSERT {table} ON"));
                self.override_table = Some(table);
                self.explicit_ids = Some(ids);
                self.state = IdentityInsertState::ExplicitOverride;
            } else {
                debug!(
                    table = info.table.name(),
                    "explicit identity value without auto_identity_insert"
                );
            }
            return Ok(plan);
        }

        if info.postfetch_lastrowid && self.scope_identity == ScopeIdentity::Batched {
            plan.sql.push_str(SCOPE_IDENTITY_SUFFIX);
            plan.postfetch_in_batch = true;
        }
        Ok(plan)
    }

    fn post_exec(
        &mut self,
        compiled: &CompiledStatement,
        plan: &ExecutionPlan,
        rows: &[Row],
        cursor: &mut dyn Cursor,
    ) -> Result<Option<Vec<SqlValue>>> {
        let Some(info) = &compiled.insert else {
            return Ok(None);
        };
        if self.state == IdentityInsertState::ExplicitOverride {
            return Ok(self.explicit_ids.clone().filter(|ids| !ids.is_empty()));
        }
        if plan.postfetch_in_batch {
            return Ok(first_value(rows).map(|id| vec![id]));
        }
        match &self.scope_identity {
            ScopeIdentity::Separate(query) if info.postfetch_lastrowid => {
                Ok(fetch_scalar(cursor, query)?.map(|id| vec![id]))
            }
            _ => Ok(None),
        }
    }

    fn restore(&mut self, cursor: &mut dyn Cursor) {
        if self.state != IdentityInsertState::ExplicitOverride {
            return;
        }
        if let Some(table) = self.override_table.take() {
            let sql = format!("SET IDENTITY_INSERT {table} OFF");
            debug!(sql = sql.as_str(), "restoring identity insert");
            if let Err(e) = cursor.execute(&sql, &[]) {
                log_cleanup_failure(&sql, &e);
            }
        }
        self.state = IdentityInsertState::Restored;
    }
}

#[cfg(test)]
mod tests {
    use oxide_sqlc_core::ast::Insert;
    use oxide_sqlc_core::compiled::Params;
    use oxide_sqlc_core::error::DriverError;
    use oxide_sqlc_core::schema::{ColumnDef, Table};
    use oxide_sqlc_core::types::SqlType;
    use oxide_sqlc_core::{compile, Dialect};

    use super::*;
    use crate::MssqlDialect;

    #[derive(Default)]
    struct Recorder {
        statements: Vec<String>,
    }

    impl Cursor for Recorder {
        fn execute(&mut self, sql: &str, _params: &[SqlValue]) -> std::result::Result<Vec<Row>, DriverError> {
            self.statements.push(sql.to_string());
            Ok(vec![vec![SqlValue::Int(42)]])
        }
    }

    fn users() -> Table {
        Table::new(
            "users",
            vec![
                ColumnDef::new("id", SqlType::integer()).primary_key(),
                ColumnDef::new("name", SqlType::string(Some(20))),
            ],
        )
        .unwrap()
    }

    fn context(dialect: &MssqlDialect) -> MssqlExecutionContext {
        MssqlExecutionContext::new(dialect.preparer(), true, ScopeIdentity::Batched, None)
    }

    #[test]
    fn test_explicit_identity_cycle() {
        let dialect = MssqlDialect::default();
        let insert = Insert::into_table(&users()).value("id", 7).build().unwrap();
        let compiled = compile(&insert.into(), &dialect).unwrap();
        let bound = compiled.bind(&Params::new()).unwrap();

        let mut ctx = context(&dialect);
        let mut cursor = Recorder::default();
        let plan = ctx.pre_exec(&compiled, &bound).unwrap();
        assert_eq!(plan.preamble, vec!["SET IDENTITY_INSERT users ON"]);
        assert!(!plan.postfetch_in_batch);
        assert_eq!(ctx.state(), IdentityInsertState::ExplicitOverride);

        let ids = ctx.post_exec(&compiled, &plan, &[], &mut cursor).unwrap();
        assert_eq!(ids, Some(vec![SqlValue::Int(7)]));
        ctx.restore(&mut cursor);
        assert_eq!(ctx.state(), IdentityInsertState::Restored);
        assert_eq!(cursor.statements, vec!["SET IDENTITY_INSERT users OFF"]);
    }

    #[test]
    fn test_null_identity_does_not_override() {
        let dialect = MssqlDialect::default();
        let insert = Insert::into_table(&users())
            .value("id", SqlValue::Null)
            .value("name", "x")
            .build()
            .unwrap();
        let compiled = compile(&insert.into(), &dialect).unwrap();
        let bound = compiled.bind(&Params::new()).unwrap();

        let mut ctx = context(&dialect);
        let plan = ctx.pre_exec(&compiled, &bound).unwrap();
        assert!(plan.preamble.is_empty());
        assert_eq!(ctx.state(), IdentityInsertState::Normal);
    }

    #[test]
    fn test_scope_identity_batch() {
        let dialect = MssqlDialect::default();
        let insert = Insert::into_table(&users()).value("name", "bob").build().unwrap();
        let compiled = compile(&insert.into(), &dialect).unwrap();
        let bound = compiled.bind(&Params::new()).unwrap();

        let mut ctx = context(&dialect);
        let mut cursor = Recorder::default();
        let plan = ctx.pre_exec(&compiled, &bound).unwrap();
        assert_eq!(
            plan.sql,
            "INSERT INTO users (name) VALUES (?); SELECT scope_identity() AS lastrowid"
        );
        assert!(plan.postfetch_in_batch);
        let rows = vec![vec![SqlValue::Int(9)]];
        let ids = ctx.post_exec(&compiled, &plan, &rows, &mut cursor).unwrap();
        assert_eq!(ids, Some(vec![SqlValue::Int(9)]));
        assert!(cursor.statements.is_empty());
    }
}
