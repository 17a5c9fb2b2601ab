//! PostgreSQL-like dialect.

use super::{Capabilities, CapabilityCell, Dialect, DialectOptions, ParamStyle, ServerProbe, ServerVersion};
use crate::error::Result;
use crate::schema::ColumnDef;
use crate::types::{HasTimezone, SqlType, TypeKind, TypeOverride};

const MAX_IDENTIFIER_LENGTH: usize = 63;

fn render_float(ty: &SqlType, _caps: &Capabilities) -> String {
    match ty.precision() {
        Some(p) if p <= 24 => String::from("REAL"),
        _ => String::from("DOUBLE PRECISION"),
    }
}

fn render_binary(_ty: &SqlType, _caps: &Capabilities) -> String {
    String::from("BYTEA")
}

fn render_datetime(ty: &SqlType, _caps: &Capabilities) -> String {
    if ty.timezone() {
        String::from("TIMESTAMP WITH TIME ZONE")
    } else {
        String::from("TIMESTAMP WITHOUT TIME ZONE")
    }
}

static TYPE_OVERRIDES: &[TypeOverride] = &[
    TypeOverride {
        kind: TypeKind::Float,
        render: render_float,
    },
    TypeOverride {
        kind: TypeKind::Binary,
        render: render_binary,
    },
    TypeOverride {
        kind: TypeKind::DateTime,
        render: render_datetime,
    },
];

static NATIVE_TYPE_NAMES: &[(&str, TypeKind)] = &[
    ("bigserial", TypeKind::BigInteger),
    ("bool", TypeKind::Boolean),
    ("bytea", TypeKind::Binary),
    ("character varying", TypeKind::String),
    ("int2", TypeKind::SmallInteger),
    ("int4", TypeKind::Integer),
    ("int8", TypeKind::BigInteger),
    ("serial", TypeKind::Integer),
    ("timestamp with time zone", TypeKind::DateTime),
    ("timestamp without time zone", TypeKind::DateTime),
    ("timestamptz", TypeKind::DateTime),
];

/// A PostgreSQL-like dialect: `$n` placeholders, RETURNING, `SERIAL`
/// columns and 63-character identifiers.
#[derive(Debug, Clone)]
pub struct PostgresDialect {
    caps: CapabilityCell,
}

impl PostgresDialect {
    /// Creates the dialect with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(&DialectOptions::default())
    }

    /// Creates the dialect from options. The identifier limit never exceeds
    /// the server's 63 characters.
    #[must_use]
    pub fn with_options(options: &DialectOptions) -> Self {
        Self {
            caps: CapabilityCell::new(Capabilities {
                supports_returning: true,
                supports_empty_insert: false,
                max_identifier_length: options.max_identifier_length.min(MAX_IDENTIFIER_LENGTH),
                ..Capabilities::default()
            }),
        }
    }
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn identity(&self) -> String {
        format!("postgresql/{}", self.caps.get().max_identifier_length)
    }

    fn capabilities(&self) -> Capabilities {
        self.caps.get()
    }

    fn param_style(&self) -> ParamStyle {
        ParamStyle::Dollar
    }

    fn type_overrides(&self) -> &'static [TypeOverride] {
        TYPE_OVERRIDES
    }

    fn native_type_names(&self) -> &'static [(&'static str, TypeKind)] {
        NATIVE_TYPE_NAMES
    }

    fn default_schema_name(&self) -> Option<&str> {
        Some("public")
    }

    fn autoincrement_type(&self, column: &ColumnDef) -> Option<String> {
        match column.sql_type.kind() {
            TypeKind::BigInteger => Some(String::from("BIGSERIAL")),
            kind if kind.is_integer() => Some(String::from("SERIAL")),
            _ => None,
        }
    }

    fn autoincrement_clause(&self, _column: &ColumnDef) -> Option<String> {
        None
    }

    fn initialize(&self, probe: &dyn ServerProbe) -> Result<()> {
        self.caps.initialize_with(self.name(), probe, |caps, version| {
            let modern = version >= ServerVersion::new(8, 2, 0);
            Capabilities {
                supports_returning: modern,
                supports_multivalues_insert: modern,
                ..caps
            }
        })?;
        Ok(())
    }
}
