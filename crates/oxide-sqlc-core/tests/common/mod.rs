#![allow(dead_code)]

use std::collections::VecDeque;

use oxide_sqlc_core::ast::Statement;
use oxide_sqlc_core::compiled::CompiledStatement;
use oxide_sqlc_core::error::DriverError;
use oxide_sqlc_core::execution::{Cursor, Row};
use oxide_sqlc_core::schema::{ColumnDef, Table};
use oxide_sqlc_core::types::SqlType;
use oxide_sqlc_core::value::SqlValue;
use oxide_sqlc_core::{Dialect, SqlError, compile};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn compiled(stmt: impl Into<Statement>, dialect: &dyn Dialect) -> CompiledStatement {
    let stmt = stmt.into();
    compile(&stmt, dialect).unwrap_or_else(|e| panic!("failed to compile {stmt:?}: {e}"))
}

pub fn sql(stmt: impl Into<Statement>, dialect: &dyn Dialect) -> String {
    compiled(stmt, dialect).sql
}

pub fn compile_err(stmt: impl Into<Statement>, dialect: &dyn Dialect) -> SqlError {
    let stmt = stmt.into();
    match compile(&stmt, dialect) {
        Ok(c) => panic!("expected an error, got {}", c.sql),
        Err(e) => e,
    }
}

pub fn users() -> Table {
    Table::new(
        "users",
        vec![
            ColumnDef::new("id", SqlType::integer()).primary_key(),
            ColumnDef::new("name", SqlType::string(Some(50))),
            ColumnDef::new("active", SqlType::boolean()),
        ],
    )
    .unwrap()
}

pub fn orders() -> Table {
    Table::new(
        "orders",
        vec![
            ColumnDef::new("id", SqlType::integer()).primary_key(),
            ColumnDef::new("user_id", SqlType::integer()).references("users", "id"),
            ColumnDef::new("total", SqlType::numeric(12, 2)),
        ],
    )
    .unwrap()
}

/// `billing.invoices`, schema-qualified.
pub fn invoices() -> Table {
    Table::builder("invoices")
        .schema("billing")
        .column(ColumnDef::new("id", SqlType::integer()).primary_key())
        .column(ColumnDef::new("amount", SqlType::numeric(12, 2)))
        .build()
        .unwrap()
}

/// Records every statement and answers with queued results.
#[derive(Debug, Default)]
pub struct MockCursor {
    pub executed: Vec<(String, Vec<SqlValue>)>,
    pub timeouts: Vec<Option<u64>>,
    responses: VecDeque<Vec<Row>>,
    fail_containing: Option<String>,
}

impl MockCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, rows: Vec<Row>) -> Self {
        self.responses.push_back(rows);
        self
    }

    pub fn failing_on(mut self, fragment: &str) -> Self {
        self.fail_containing = Some(fragment.to_string());
        self
    }

    pub fn statements(&self) -> Vec<&str> {
        self.executed.iter().map(|(sql, _)| sql.as_str()).collect()
    }
}

impl Cursor for MockCursor {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DriverError> {
        self.executed.push((sql.to_string(), params.to_vec()));
        if let Some(fragment) = &self.fail_containing {
            if sql.contains(fragment.as_str()) {
                return Err(format!("server rejected: {sql}").into());
            }
        }
        Ok(self.responses.pop_front().unwrap_or_default())
    }

    fn set_timeout(&mut self, seconds: Option<u64>) {
        self.timeouts.push(seconds);
    }
}
