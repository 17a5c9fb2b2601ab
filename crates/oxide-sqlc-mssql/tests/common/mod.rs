#![allow(dead_code)]

use std::collections::VecDeque;

use oxide_sqlc_core::ast::Statement;
use oxide_sqlc_core::compiled::CompiledStatement;
use oxide_sqlc_core::dialect::{DialectOptions, ServerProbe, ServerVersion};
use oxide_sqlc_core::error::DriverError;
use oxide_sqlc_core::execution::{Cursor, Row};
use oxide_sqlc_core::schema::{ColumnDef, Table};
use oxide_sqlc_core::types::SqlType;
use oxide_sqlc_core::value::SqlValue;
use oxide_sqlc_core::{SqlError, compile};
use oxide_sqlc_mssql::{MssqlDialect, MssqlDriver};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// SQL Server 2000: TOP only, no window functions.
pub fn mssql() -> MssqlDialect {
    MssqlDialect::new(MssqlDriver::Odbc)
}

pub fn mssql_with(configure: impl FnOnce(&mut DialectOptions)) -> MssqlDialect {
    let mut options = DialectOptions::default();
    configure(&mut options);
    MssqlDialect::with_options(MssqlDriver::Odbc, &options)
        .unwrap_or_else(|e| panic!("invalid options: {e}"))
}

/// Reports a fixed major version.
pub struct Version(pub u32);

impl ServerProbe for Version {
    fn server_version(&self) -> oxide_sqlc_core::Result<ServerVersion> {
        Ok(ServerVersion::new(self.0, 0, 0))
    }
}

/// A dialect that emulates OFFSET with ROW_NUMBER().
pub fn windowed() -> MssqlDialect {
    mssql_with(|o| o.has_window_funcs = true)
}

pub fn compiled(stmt: impl Into<Statement>, dialect: &MssqlDialect) -> CompiledStatement {
    let stmt = stmt.into();
    compile(&stmt, dialect).unwrap_or_else(|e| panic!("failed to compile {stmt:?}: {e}"))
}

pub fn sql(stmt: impl Into<Statement>, dialect: &MssqlDialect) -> String {
    compiled(stmt, dialect).sql
}

pub fn compile_err(stmt: impl Into<Statement>, dialect: &MssqlDialect) -> SqlError {
    let stmt = stmt.into();
    match compile(&stmt, dialect) {
        Ok(c) => panic!("expected an error, got {}", c.sql),
        Err(e) => e,
    }
}

pub fn t() -> Table {
    Table::new(
        "t",
        vec![
            ColumnDef::new("x", SqlType::integer()),
            ColumnDef::new("y", SqlType::string(Some(10))),
        ],
    )
    .unwrap()
}

/// `users(id INTEGER IDENTITY PRIMARY KEY, name VARCHAR(20))`.
pub fn users() -> Table {
    Table::new(
        "users",
        vec![
            ColumnDef::new("id", SqlType::integer()).primary_key(),
            ColumnDef::new("name", SqlType::string(Some(20))),
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
            ColumnDef::new("total", SqlType::numeric(10, 2)),
            ColumnDef::new("placed", SqlType::date()),
        ],
    )
    .unwrap()
}

/// `sales.orders`, schema-qualified.
pub fn sales_orders() -> Table {
    Table::builder("orders")
        .schema("sales")
        .column(ColumnDef::new("id", SqlType::integer()).primary_key())
        .column(ColumnDef::new("total", SqlType::numeric(10, 2)))
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

    /// Queues the rows returned by the next successful statement.
    pub fn respond(mut self, rows: Vec<Row>) -> Self {
        self.responses.push_back(rows);
        self
    }

    /// Makes statements containing `fragment` fail.
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
