//! # oxide-sqlc-core
//!
//! A dialect-aware SQL compiler. Statements are built as immutable trees
//! over table metadata and compiled, per dialect, into SQL text plus bind
//! parameter and result-column metadata.
//!
//! This crate provides:
//! - Table metadata with typed columns, constraints and identity columns
//! - A statement tree for SELECT (joins, CTEs, subqueries, set operations),
//!   INSERT, UPDATE, DELETE and basic DDL
//! - The [`Dialect`](dialect::Dialect) trait: capabilities, identifier
//!   quoting, type rendering, value processors and execution hooks
//! - A single-pass compiler with bind parameter naming, table aliasing and
//!   capability checks
//! - Execution through a driver-agnostic [`Cursor`](execution::Cursor)
//!
//! ## Compiling a query
//!
//! ```rust
//! use oxide_sqlc_core::ast::select;
//! use oxide_sqlc_core::compiler::compile;
//! use oxide_sqlc_core::dialect::PostgresDialect;
//! use oxide_sqlc_core::schema::{ColumnDef, Table};
//! use oxide_sqlc_core::types::SqlType;
//!
//! let users = Table::new("users", vec![
//!     ColumnDef::new("id", SqlType::integer()).primary_key(),
//!     ColumnDef::new("name", SqlType::string(Some(50))),
//! ]).unwrap();
//!
//! let query = select(vec![users.c("id"), users.c("name")])
//!     .from(&users)
//!     .where_clause(users.c("name").like("A%"))
//!     .order_by(users.c("id"))
//!     .limit(10);
//! let compiled = compile(&query.into(), &PostgresDialect::new()).unwrap();
//!
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT users.id, users.name FROM users WHERE users.name LIKE $1 ORDER BY users.id LIMIT 10"
//! );
//! ```
//!
//! ## SQL Injection Prevention
//!
//! Values become bind parameters; they reach the SQL text only in
//! literal-binds mode, and then always escaped:
//!
//! ```rust
//! use oxide_sqlc_core::ast::select;
//! use oxide_sqlc_core::compiler::{CompileOptions, Compiler};
//! use oxide_sqlc_core::dialect::GenericDialect;
//! use oxide_sqlc_core::schema::{ColumnDef, Table};
//! use oxide_sqlc_core::types::SqlType;
//!
//! let users = Table::new("users", vec![ColumnDef::new("name", SqlType::string(None))]).unwrap();
//! let query = select(vec![users.c("name")])
//!     .where_clause(users.c("name").eq("'; DROP TABLE users; --"));
//!
//! let dialect = GenericDialect::new();
//! let compiled = Compiler::new(&dialect)
//!     .with_options(CompileOptions { literal_binds: true })
//!     .compile(&query.into())
//!     .unwrap();
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT users.name FROM users WHERE users.name = '''; DROP TABLE users; --'"
//! );
//! ```

pub mod ast;
pub mod cache;
pub mod compiled;
pub mod compiler;
pub mod decimal;
pub mod dialect;
pub mod error;
pub mod execution;
pub mod identifier;
pub mod schema;
pub mod types;
pub mod value;
pub mod visit;

pub use ast::{Expr, Query, Select, Statement, select};
pub use cache::StatementCache;
pub use compiled::{CompiledStatement, Params};
pub use compiler::{CompileOptions, Compiler, compile};
pub use dialect::{Capabilities, Dialect, DialectOptions, DialectRegistry};
pub use error::{Result, SqlError};
pub use schema::{ColumnDef, Table};
pub use types::SqlType;
pub use value::{SqlValue, ToSqlValue};
