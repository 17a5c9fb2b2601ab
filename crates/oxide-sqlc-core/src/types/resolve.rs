//! Logical type to native column specification, and back.

use tracing::warn;

use super::{HasCollation, HasLength, SqlType, TypeKind};
use crate::dialect::{Capabilities, Dialect};

/// A dialect-specific rendering for one type kind.
///
/// The render function receives the dialect's current capabilities, so the
/// native type may depend on what the connected server supports.
#[derive(Debug, Clone, Copy)]
pub struct TypeOverride {
    /// The kind this override applies to.
    pub kind: TypeKind,
    /// Produces the native column specification.
    pub render: fn(&SqlType, &Capabilities) -> String,
}

fn sized(name: &str, length: Option<u32>) -> String {
    match length {
        Some(n) => format!("{name}({n})"),
        None => name.to_string(),
    }
}

fn numeric(name: &str, precision: Option<u32>, scale: Option<u32>) -> String {
    match (precision, scale) {
        (Some(p), Some(s)) => format!("{name}({p}, {s})"),
        (Some(p), None) => format!("{name}({p})"),
        _ => name.to_string(),
    }
}

/// Returns the ANSI column specification for a type.
#[must_use]
pub fn base_spec(ty: &SqlType) -> String {
    match ty.kind() {
        TypeKind::Integer => String::from("INTEGER"),
        TypeKind::SmallInteger | TypeKind::TinyInteger => String::from("SMALLINT"),
        TypeKind::BigInteger => String::from("BIGINT"),
        TypeKind::Numeric => numeric("NUMERIC", ty.precision(), ty.scale()),
        TypeKind::Float => sized("FLOAT", ty.precision()),
        TypeKind::String | TypeKind::Unicode => sized("VARCHAR", ty.length()),
        TypeKind::Text | TypeKind::UnicodeText => String::from("TEXT"),
        TypeKind::Char => sized("CHAR", ty.length()),
        TypeKind::NChar => sized("NCHAR", ty.length()),
        TypeKind::Date => String::from("DATE"),
        TypeKind::DateTime => {
            if super::HasTimezone::timezone(ty) {
                String::from("TIMESTAMP WITH TIME ZONE")
            } else {
                String::from("TIMESTAMP")
            }
        }
        TypeKind::Time => String::from("TIME"),
        TypeKind::Boolean => String::from("BOOLEAN"),
        TypeKind::Binary => match ty.length() {
            Some(n) => format!("VARBINARY({n})"),
            None => String::from("BLOB"),
        },
        TypeKind::Null => String::from("NULL"),
    }
}

/// Resolves a logical type to the dialect's native column specification.
///
/// The dialect's override table is consulted first; kinds it does not list
/// fall back to the ANSI base table. Booleans become `SMALLINT` on backends
/// without a native boolean. A collation, when present, is appended.
#[must_use]
pub fn resolve(ty: &SqlType, dialect: &dyn Dialect) -> String {
    resolve_with(ty, dialect, &dialect.capabilities())
}

/// [`resolve`] against a given capability record.
#[must_use]
pub fn resolve_with(ty: &SqlType, dialect: &dyn Dialect, caps: &Capabilities) -> String {
    let mut spec = match dialect
        .type_overrides()
        .iter()
        .find(|o| o.kind == ty.kind())
    {
        Some(o) => (o.render)(ty, caps),
        None if ty.kind() == TypeKind::Boolean && !caps.supports_native_boolean => {
            String::from("SMALLINT")
        }
        None => base_spec(ty),
    };
    if let Some(collation) = ty.collation() {
        spec.push_str(" COLLATE ");
        spec.push_str(collation);
    }
    spec
}

const BASE_NATIVE_NAMES: &[(&str, TypeKind)] = &[
    ("bigint", TypeKind::BigInteger),
    ("blob", TypeKind::Binary),
    ("boolean", TypeKind::Boolean),
    ("char", TypeKind::Char),
    ("date", TypeKind::Date),
    ("decimal", TypeKind::Numeric),
    ("double precision", TypeKind::Float),
    ("float", TypeKind::Float),
    ("int", TypeKind::Integer),
    ("integer", TypeKind::Integer),
    ("nchar", TypeKind::NChar),
    ("numeric", TypeKind::Numeric),
    ("real", TypeKind::Float),
    ("smallint", TypeKind::SmallInteger),
    ("text", TypeKind::Text),
    ("time", TypeKind::Time),
    ("timestamp", TypeKind::DateTime),
    ("varbinary", TypeKind::Binary),
    ("varchar", TypeKind::String),
];

/// Builds a logical type for `kind` from catalog arguments.
///
/// `args` are the length for character and binary kinds, or precision and
/// scale for numeric kinds, in catalog order.
#[must_use]
pub fn type_from_native(kind: TypeKind, args: &[u32]) -> SqlType {
    match kind {
        TypeKind::Numeric => match args {
            [p, s, ..] => SqlType::numeric(*p, *s),
            [p] => SqlType::numeric(*p, 0),
            [] => SqlType::of(TypeKind::Numeric),
        },
        TypeKind::Float => SqlType::float(args.first().copied()),
        _ => {
            let ty = SqlType::of(kind);
            match args.first() {
                Some(n) => ty.with_length(*n),
                None => ty,
            }
        }
    }
}

/// Maps a backend-reported type name to a logical type.
///
/// Unknown names produce the null type and a warning instead of an error,
/// so one unusual column does not abort a whole catalog scan.
#[must_use]
pub fn lookup_native(dialect: &dyn Dialect, name: &str, args: &[u32]) -> SqlType {
    let lower = name.trim().to_ascii_lowercase();
    let kind = dialect
        .native_type_names()
        .iter()
        .chain(BASE_NATIVE_NAMES.iter())
        .find(|(n, _)| *n == lower)
        .map(|(_, kind)| *kind);
    match kind {
        Some(kind) => type_from_native(kind, args),
        None => {
            warn!(
                dialect = dialect.name(),
                type_name = name,
                "did not recognize type; using the null type"
            );
            SqlType::null()
        }
    }
}
