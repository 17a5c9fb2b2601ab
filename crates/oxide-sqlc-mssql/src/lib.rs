//! # oxide-sqlc-mssql
//!
//! Microsoft SQL Server dialect for `oxide-sqlc-core`.
//!
//! # How SQL Server differs from other dialects
//!
//! - **Row limits**: `SELECT TOP n` instead of a trailing `LIMIT`. There is
//!   no OFFSET; it is emulated with a `ROW_NUMBER() OVER (ORDER BY ...)`
//!   window over a derived table when the server has window functions
//!   (SQL Server 2005 and later, or the `has_window_funcs` option).
//! - **Identity columns**: an integer primary key becomes
//!   `IDENTITY(start,increment)`. Inserting an explicit value requires
//!   `SET IDENTITY_INSERT t ON`, which the execution context toggles
//!   automatically. Generated ids are read back with `@@IDENTITY` or,
//!   with `use_scope_identity`, `scope_identity()`.
//! - **No RETURNING and no multi-row VALUES** before SQL Server 2008.
//! - **Identifier quoting** with square brackets: `[order]`.
//! - **Schema-qualified tables** are aliased once per statement and every
//!   reference uses the alias.
//! - **Scalar subquery comparisons** are rendered with `IN`.
//! - **Types**: `BIT` booleans, `SMALLDATETIME` dates before SQL Server 2008,
//!   `IMAGE` for unbounded binary, `VARCHAR(max)` for unbounded strings.
//! - **Functions and operators**: `+` concatenates strings, `EXTRACT`
//!   becomes `DATEPART`, `now()` is `CURRENT_TIMESTAMP`, `length()` is
//!   `LEN()`, lateral joins are `CROSS APPLY` / `OUTER APPLY`.
//!
//! ## Example
//!
//! ```rust
//! use oxide_sqlc_core::ast::select;
//! use oxide_sqlc_core::compile;
//! use oxide_sqlc_core::schema::{ColumnDef, Table};
//! use oxide_sqlc_core::types::SqlType;
//! use oxide_sqlc_mssql::{MssqlDialect, MssqlDriver};
//!
//! let users = Table::builder("users")
//!     .schema("sales")
//!     .column(ColumnDef::new("id", SqlType::integer()).primary_key())
//!     .column(ColumnDef::new("name", SqlType::string(Some(20))))
//!     .build()
//!     .unwrap();
//!
//! let query = select(vec![users.c("name")])
//!     .from(&users)
//!     .order_by(users.c("id"))
//!     .limit(3);
//! let compiled = compile(&query.into(), &MssqlDialect::new(MssqlDriver::Odbc)).unwrap();
//!
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT TOP 3 users_1.name FROM sales.users AS users_1 ORDER BY users_1.id"
//! );
//! ```

mod context;
mod dialect;
pub mod types;

pub use context::{IdentityInsertState, MssqlExecutionContext, ScopeIdentity};
pub use dialect::{MssqlDialect, MssqlDriver, RESERVED_WORDS};

use oxide_sqlc_core::dialect::{Dialect, DialectOptions, DialectRegistry};
use oxide_sqlc_core::Result;

fn odbc(options: &DialectOptions) -> Result<Box<dyn Dialect>> {
    Ok(Box::new(MssqlDialect::with_options(MssqlDriver::Odbc, options)?))
}

fn tds(options: &DialectOptions) -> Result<Box<dyn Dialect>> {
    Ok(Box::new(MssqlDialect::with_options(MssqlDriver::Tds, options)?))
}

/// Registers the SQL Server schemes: `mssql` and `mssql+odbc` for ODBC,
/// `mssql+tds` for TDS client libraries.
pub fn register(registry: &mut DialectRegistry) {
    registry.register("mssql", odbc);
    registry.register("mssql+odbc", odbc);
    registry.register("mssql+tds", tds);
}

/// Returns a registry with the built-in dialects and SQL Server.
#[must_use]
pub fn registry() -> DialectRegistry {
    let mut registry = DialectRegistry::with_builtin();
    register(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_schemes() {
        let registry = registry();
        let dialect = registry.from_url("mssql+tds://sa@db/app?query_timeout=30").unwrap();
        assert_eq!(dialect.name(), "mssql");
        assert_eq!(dialect.query_timeout(), Some(30));
        assert!(!dialect.capabilities().supports_sane_rowcount);

        let dialect = registry.from_url("mssql://db/app?schema_name=sales").unwrap();
        assert_eq!(dialect.default_schema_name(), Some("sales"));
        assert!(dialect.capabilities().supports_sane_rowcount);
    }

    #[test]
    fn test_options_from_json_config() {
        let options: DialectOptions = serde_json::from_str(
            r#"{"text_as_varchar": true, "use_scope_identity": true, "schema_name": "sales"}"#,
        )
        .unwrap();
        let dialect = registry().load("mssql+odbc", &options).unwrap();
        assert_eq!(dialect.identity(), "mssql+odbc/text_as_varchar=true/schema=sales");
        assert_eq!(dialect.default_schema_name(), Some("sales"));
    }

    #[test]
    fn test_invalid_option_is_reported() {
        let err = registry()
            .from_url("mssql+odbc://db/app?max_identifier_length=0")
            .unwrap_err();
        assert!(matches!(err, oxide_sqlc_core::SqlError::InvalidConfig { .. }));
    }
}
