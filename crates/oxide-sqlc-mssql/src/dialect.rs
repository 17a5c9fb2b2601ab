//! SQL Server dialect implementation.

use std::fmt;

use oxide_sqlc_core::ast::{BinaryOp, Index};
use oxide_sqlc_core::dialect::{
    Capabilities, CapabilityCell, Dialect, DialectOptions, FunctionRender, LateralStyle,
    LimitStrategy, SavepointClauses, ServerProbe, TransactionClauses,
};
use oxide_sqlc_core::execution::ExecutionContext;
use oxide_sqlc_core::identifier::IdentifierPreparer;
use oxide_sqlc_core::schema::{ColumnDef, ColumnDefault, Identity};
use oxide_sqlc_core::types::{
    LiteralProcessor, Processor, SqlType, TypeKind, TypeOverride, base_bind_processor,
    base_literal_processor, base_result_processor,
};
use oxide_sqlc_core::{Result, SqlError};

use crate::context::{MssqlExecutionContext, ScopeIdentity};
use crate::types;

const DEFAULT_SCHEMA: &str = "dbo";
const MAX_IDENTIFIER_LENGTH: usize = 128;
const LASTROWID_QUERY: &str = "SELECT @@IDENTITY AS lastrowid";

/// Transact-SQL reserved words.
pub const RESERVED_WORDS: &[&str] = &[
    "add", "all", "alter", "and", "any", "as", "asc", "authorization", "backup", "begin",
    "between", "break", "browse", "bulk", "by", "cascade", "case", "check", "checkpoint",
    "close", "clustered", "coalesce", "collate", "column", "commit", "compute", "constraint",
    "contains", "containstable", "continue", "convert", "create", "cross", "current",
    "current_date", "current_time", "current_timestamp", "current_user", "cursor",
    "database", "dbcc", "deallocate", "declare", "default", "delete", "deny", "desc", "disk",
    "distinct", "distributed", "double", "drop", "dump", "else", "end", "errlvl", "escape",
    "except", "exec", "execute", "exists", "exit", "external", "fetch", "file", "fillfactor",
    "for", "foreign", "freetext", "freetexttable", "from", "full", "function", "goto",
    "grant", "group", "having", "holdlock", "identity", "identity_insert", "identitycol",
    "if", "in", "index", "inner", "insert", "intersect", "into", "is", "join", "key", "kill",
    "left", "like", "lineno", "load", "merge", "national", "nocheck", "nonclustered", "not",
    "null", "nullif", "of", "off", "offsets", "on", "open", "opendatasource", "openquery",
    "openrowset", "openxml", "option", "or", "order", "outer", "over", "percent", "pivot",
    "plan", "precision", "primary", "print", "proc", "procedure", "public", "raiserror",
    "read", "readtext", "reconfigure", "references", "replication", "restore", "restrict",
    "return", "revert", "revoke", "right", "rollback", "rowcount", "rowguidcol", "rule",
    "save", "schema", "select", "session_user", "set", "setuser", "shutdown", "some",
    "statistics", "system_user", "table", "tablesample", "textsize", "then", "to", "top",
    "tran", "transaction", "trigger", "truncate", "tsequal", "union", "unique", "unpivot",
    "update", "updatetext", "use", "user", "values", "varying", "view", "waitfor", "when",
    "where", "while", "with", "writetext",
];

/// The driver family a connection uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MssqlDriver {
    /// ODBC. Binary parameters and row counts work as expected.
    #[default]
    Odbc,
    /// A TDS client library without a binary parameter type and with
    /// unreliable row counts.
    Tds,
}

impl MssqlDriver {
    /// Returns the driver's scheme suffix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Odbc => "odbc",
            Self::Tds => "tds",
        }
    }
}

impl fmt::Display for MssqlDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Microsoft SQL Server dialect.
///
/// Rows are limited with `TOP`; an OFFSET is emulated with `ROW_NUMBER()`
/// once window functions are known to be available, either through the
/// `has_window_funcs` option or a server probe reporting SQL Server 2005 or
/// later. Generated ids are fetched after the INSERT.
#[derive(Debug, Clone)]
pub struct MssqlDialect {
    driver: MssqlDriver,
    options: DialectOptions,
    caps: CapabilityCell,
}

impl MssqlDialect {
    /// Creates the dialect for `driver` with default options.
    #[must_use]
    pub fn new(driver: MssqlDriver) -> Self {
        Self::build(driver, DialectOptions::default())
    }

    /// Creates the dialect from options.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::InvalidConfig`] if `max_identifier_length` is zero
    /// or exceeds the server's 128 characters.
    pub fn with_options(driver: MssqlDriver, options: &DialectOptions) -> Result<Self> {
        let length = options.max_identifier_length;
        if length == 0 || length > MAX_IDENTIFIER_LENGTH {
            return Err(SqlError::InvalidConfig {
                option: String::from("max_identifier_length"),
                value: length.to_string(),
            });
        }
        Ok(Self::build(driver, options.clone()))
    }

    fn build(driver: MssqlDriver, options: DialectOptions) -> Self {
        let caps = Capabilities {
            supports_returning: false,
            supports_multivalues_insert: false,
            supports_native_boolean: false,
            supports_native_date: false,
            supports_default_values: true,
            supports_empty_insert: false,
            supports_scalar_subquery_comparison: false,
            supports_subquery_order_by: false,
            alias_schema_qualified_tables: true,
            supports_window_functions: options.has_window_funcs,
            lateral: LateralStyle::Apply,
            postfetch_lastrowid: true,
            supports_sane_rowcount: driver == MssqlDriver::Odbc,
            max_identifier_length: options.max_identifier_length,
        };
        Self {
            driver,
            options,
            caps: CapabilityCell::new(caps),
        }
    }

    /// Returns the driver family.
    #[must_use]
    pub const fn driver(&self) -> MssqlDriver {
        self.driver
    }

    /// Returns the options the dialect was created with.
    #[must_use]
    pub const fn options(&self) -> &DialectOptions {
        &self.options
    }
}

impl Default for MssqlDialect {
    fn default() -> Self {
        Self::new(MssqlDriver::default())
    }
}

fn extract_field(field: &str) -> &str {
    match field {
        "doy" => "dayofyear",
        "dow" => "weekday",
        "milliseconds" => "millisecond",
        other => other,
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn identity(&self) -> String {
        format!(
            "mssql+{}/text_as_varchar={}/schema={}",
            self.driver,
            self.options.text_as_varchar,
            self.default_schema_name().unwrap_or(DEFAULT_SCHEMA)
        )
    }

    fn identifier_quotes(&self) -> (char, char) {
        ('[', ']')
    }

    fn reserved_words(&self) -> &'static [&'static str] {
        RESERVED_WORDS
    }

    fn folds_to_lowercase(&self) -> bool {
        false
    }

    fn capabilities(&self) -> Capabilities {
        self.caps.get()
    }

    fn limit_strategy(&self, caps: &Capabilities) -> LimitStrategy {
        if caps.supports_window_functions {
            LimitStrategy::RowNumber
        } else {
            LimitStrategy::Top
        }
    }

    fn binary_operator(&self, op: BinaryOp) -> Option<&'static str> {
        match op {
            BinaryOp::Concat => Some("+"),
            _ => None,
        }
    }

    fn function_name(&self, name: &str) -> Option<FunctionRender> {
        match name {
            "now" => Some(FunctionRender::Keyword("CURRENT_TIMESTAMP")),
            "length" | "char_length" => Some(FunctionRender::Rename("LEN")),
            _ => None,
        }
    }

    fn render_extract(&self, field: &str, expr: &str) -> String {
        format!("DATEPART({}, {expr})", extract_field(&field.to_ascii_lowercase()))
    }

    fn uses_with_recursive(&self) -> bool {
        false
    }

    fn savepoint_clauses(&self, name: &str) -> SavepointClauses {
        let name = self.preparer().quote(name);
        SavepointClauses {
            create: format!("SAVE TRANSACTION {name}"),
            rollback_to: format!("ROLLBACK TRANSACTION {name}"),
            release: None,
        }
    }

    fn transaction_clauses(&self) -> TransactionClauses {
        TransactionClauses {
            begin: String::from("BEGIN TRANSACTION"),
            commit: String::from("IF @@TRANCOUNT > 0 COMMIT TRAN"),
            rollback: String::from("IF @@TRANCOUNT > 0 ROLLBACK TRAN"),
        }
    }

    fn type_overrides(&self) -> &'static [TypeOverride] {
        if self.options.text_as_varchar {
            types::TEXT_AS_VARCHAR_OVERRIDES
        } else {
            types::TYPE_OVERRIDES
        }
    }

    fn native_type_names(&self) -> &'static [(&'static str, TypeKind)] {
        types::NATIVE_TYPE_NAMES
    }

    fn binary_bind(&self) -> Option<Processor> {
        match self.driver {
            MssqlDriver::Odbc => None,
            MssqlDriver::Tds => Some(types::blob_to_hex),
        }
    }

    fn bind_processor(&self, ty: &SqlType, caps: &Capabilities) -> Option<Processor> {
        match ty.kind() {
            TypeKind::DateTime => Some(types::bind_datetime),
            TypeKind::Date => Some(types::bind_date),
            TypeKind::Binary => self.binary_bind(),
            _ => base_bind_processor(ty, caps),
        }
    }

    fn result_processor(&self, ty: &SqlType, caps: &Capabilities) -> Option<Processor> {
        match ty.kind() {
            TypeKind::DateTime => Some(types::promote_to_datetime),
            TypeKind::Date => Some(types::truncate_to_date),
            _ => base_result_processor(ty, caps),
        }
    }

    fn literal_processor(&self, ty: &SqlType, caps: &Capabilities) -> Option<LiteralProcessor> {
        match ty.kind() {
            TypeKind::DateTime => Some(types::literal_datetime),
            TypeKind::Date => Some(types::literal_date),
            _ => base_literal_processor(ty, caps),
        }
    }

    fn last_inserted_id_query(&self) -> Option<String> {
        Some(String::from(LASTROWID_QUERY))
    }

    fn default_schema_name(&self) -> Option<&str> {
        Some(self.options.schema_name.as_deref().unwrap_or(DEFAULT_SCHEMA))
    }

    fn query_timeout(&self) -> Option<u64> {
        self.options.query_timeout
    }

    fn create_execution_context(&self) -> Box<dyn ExecutionContext> {
        let scope_identity = if self.options.use_scope_identity {
            ScopeIdentity::Batched
        } else {
            ScopeIdentity::Separate(String::from(LASTROWID_QUERY))
        };
        Box::new(MssqlExecutionContext::new(
            self.preparer(),
            self.options.auto_identity_insert,
            scope_identity,
            self.options.query_timeout,
        ))
    }

    fn autoincrement_clause(&self, column: &ColumnDef) -> Option<String> {
        let identity = match column.default {
            Some(ColumnDefault::Sequence(identity)) => identity,
            _ => Identity::default(),
        };
        Some(format!("IDENTITY({},{})", identity.start, identity.increment))
    }

    fn drop_index_target(&self, index: &Index, preparer: &IdentifierPreparer) -> String {
        format!(
            "{}.{}",
            preparer.format_table(&index.table, true),
            preparer.quote(&index.name)
        )
    }

    fn initialize(&self, probe: &dyn ServerProbe) -> Result<()> {
        let has_window_funcs = self.options.has_window_funcs;
        self.caps.initialize_with(self.name(), probe, |caps, version| {
            // 2005 is version 9, 2008 is version 10.
            Capabilities {
                supports_window_functions: has_window_funcs || version.major >= 9,
                supports_native_date: version.major >= 10,
                supports_multivalues_insert: version.major >= 10,
                ..caps
            }
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use oxide_sqlc_core::dialect::{MultiValuesStrategy, ReturningStrategy, ServerVersion};
    use oxide_sqlc_core::types::resolve;
    use oxide_sqlc_core::value::SqlValue;

    use super::*;

    struct Version(u32);

    impl ServerProbe for Version {
        fn server_version(&self) -> Result<ServerVersion> {
            Ok(ServerVersion::new(self.0, 0, 0))
        }
    }

    #[test]
    fn test_mssql_dialect() {
        let dialect = MssqlDialect::default();
        let caps = dialect.capabilities();
        assert_eq!(dialect.name(), "mssql");
        assert_eq!(dialect.identifier_quotes(), ('[', ']'));
        assert_eq!(dialect.limit_strategy(&caps), LimitStrategy::Top);
        assert_eq!(dialect.returning_strategy(&caps), ReturningStrategy::PostFetch);
        assert_eq!(dialect.multivalues_strategy(&caps), MultiValuesStrategy::Unsupported);
        assert_eq!(dialect.default_schema_name(), Some("dbo"));
        assert_eq!(
            dialect.last_inserted_id_query().as_deref(),
            Some("SELECT @@IDENTITY AS lastrowid")
        );
    }

    #[test]
    fn test_window_functions_enable_row_number() {
        let options = DialectOptions {
            has_window_funcs: true,
            ..DialectOptions::default()
        };
        let dialect = MssqlDialect::with_options(MssqlDriver::Odbc, &options).unwrap();
        assert_eq!(
            dialect.limit_strategy(&dialect.capabilities()),
            LimitStrategy::RowNumber
        );
    }

    #[test]
    fn test_probe_sets_version_capabilities() {
        let sql2000 = MssqlDialect::default();
        sql2000.initialize(&Version(8)).unwrap();
        assert_eq!(
            sql2000.limit_strategy(&sql2000.capabilities()),
            LimitStrategy::Top
        );
        assert_eq!(resolve(&SqlType::date(), &sql2000), "SMALLDATETIME");

        let sql2008 = MssqlDialect::default();
        sql2008.initialize(&Version(10)).unwrap();
        let caps = sql2008.capabilities();
        assert_eq!(sql2008.limit_strategy(&caps), LimitStrategy::RowNumber);
        assert_eq!(resolve(&SqlType::date(), &sql2008), "DATE");
        assert_eq!(sql2008.multivalues_strategy(&caps), MultiValuesStrategy::Supported);
    }

    #[test]
    fn test_type_mapping() {
        let dialect = MssqlDialect::default();
        assert_eq!(resolve(&SqlType::integer(), &dialect), "INTEGER");
        assert_eq!(resolve(&SqlType::small_integer(), &dialect), "SMALLINT");
        assert_eq!(resolve(&SqlType::tiny_integer(), &dialect), "TINYINT");
        assert_eq!(resolve(&SqlType::numeric(10, 2), &dialect), "NUMERIC(10, 2)");
        assert_eq!(resolve(&SqlType::float(Some(53)), &dialect), "FLOAT(53)");
        assert_eq!(resolve(&SqlType::datetime(), &dialect), "DATETIME");
        assert_eq!(resolve(&SqlType::string(Some(20)), &dialect), "VARCHAR(20)");
        assert_eq!(resolve(&SqlType::unicode(Some(20)), &dialect), "NVARCHAR(20)");
        assert_eq!(resolve(&SqlType::text(), &dialect), "TEXT");
        assert_eq!(resolve(&SqlType::char(Some(2)), &dialect), "CHAR(2)");
        assert_eq!(resolve(&SqlType::nchar(Some(2)), &dialect), "NCHAR(2)");
        assert_eq!(resolve(&SqlType::binary(None), &dialect), "IMAGE");
        assert_eq!(resolve(&SqlType::boolean(), &dialect), "BIT");
    }

    #[test]
    fn test_text_as_varchar() {
        let options = DialectOptions {
            text_as_varchar: true,
            ..DialectOptions::default()
        };
        let dialect = MssqlDialect::with_options(MssqlDriver::Odbc, &options).unwrap();
        assert_eq!(resolve(&SqlType::text(), &dialect), "VARCHAR(max)");
        assert_ne!(dialect.identity(), MssqlDialect::default().identity());
    }

    #[test]
    fn test_driver_differences() {
        let odbc = MssqlDialect::new(MssqlDriver::Odbc);
        let tds = MssqlDialect::new(MssqlDriver::Tds);
        assert!(odbc.capabilities().supports_sane_rowcount);
        assert!(!tds.capabilities().supports_sane_rowcount);
        let binary = SqlType::binary(None);
        assert!(odbc.bind_processor(&binary, &odbc.capabilities()).is_none());

        let hex = tds.bind_processor(&binary, &tds.capabilities()).unwrap();
        assert_eq!(
            hex(SqlValue::Blob(vec![0x0F])).unwrap(),
            SqlValue::Text(String::from("0F"))
        );
    }

    #[test]
    fn test_boolean_processors() {
        let dialect = MssqlDialect::default();
        let caps = dialect.capabilities();
        let bind = dialect.bind_processor(&SqlType::boolean(), &caps).unwrap();
        let result = dialect.result_processor(&SqlType::boolean(), &caps).unwrap();
        assert_eq!(bind(SqlValue::Bool(true)).unwrap(), SqlValue::Int(1));
        assert_eq!(bind(SqlValue::Null).unwrap(), SqlValue::Null);
        assert_eq!(result(SqlValue::Int(0)).unwrap(), SqlValue::Bool(false));
        assert_eq!(result(SqlValue::Null).unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_transaction_fragments() {
        let dialect = MssqlDialect::default();
        let tx = dialect.transaction_clauses();
        assert_eq!(tx.commit, "IF @@TRANCOUNT > 0 COMMIT TRAN");
        assert_eq!(tx.rollback, "IF @@TRANCOUNT > 0 ROLLBACK TRAN");

        let sp = dialect.savepoint_clauses("sp1");
        assert_eq!(sp.create, "SAVE TRANSACTION sp1");
        assert_eq!(sp.rollback_to, "ROLLBACK TRANSACTION sp1");
        assert!(sp.release.is_none());
    }

    #[test]
    fn test_extract_fields() {
        let dialect = MssqlDialect::default();
        assert_eq!(dialect.render_extract("doy", "t.d"), "DATEPART(dayofyear, t.d)");
        assert_eq!(dialect.render_extract("dow", "t.d"), "DATEPART(weekday, t.d)");
        assert_eq!(
            dialect.render_extract("milliseconds", "t.d"),
            "DATEPART(millisecond, t.d)"
        );
        assert_eq!(dialect.render_extract("year", "t.d"), "DATEPART(year, t.d)");
    }

    #[test]
    fn test_identity_clause() {
        let dialect = MssqlDialect::default();
        let plain = ColumnDef::new("id", SqlType::integer());
        let seeded = ColumnDef::new("id", SqlType::integer()).identity(100, 10);
        assert_eq!(dialect.autoincrement_clause(&plain).as_deref(), Some("IDENTITY(1,1)"));
        assert_eq!(
            dialect.autoincrement_clause(&seeded).as_deref(),
            Some("IDENTITY(100,10)")
        );
    }

    #[test]
    fn test_invalid_identifier_length() {
        let options = DialectOptions {
            max_identifier_length: 200,
            ..DialectOptions::default()
        };
        assert!(matches!(
            MssqlDialect::with_options(MssqlDriver::Tds, &options),
            Err(SqlError::InvalidConfig { .. })
        ));
    }
}
