//! Bind, result and literal value processors.
//!
//! Processors are plain function pointers so a compiled statement can carry
//! them without holding on to its dialect.

use super::{NumericMode, SqlType, TypeKind};
use crate::decimal::Decimal;
use crate::dialect::Capabilities;
use crate::error::{Result, SqlError};
use crate::value::SqlValue;

/// Converts a value on its way to or from the driver.
pub type Processor = fn(SqlValue) -> Result<SqlValue>;

/// Renders a value as inline SQL text.
pub type LiteralProcessor = fn(&SqlValue) -> Result<String>;

fn reject(type_name: &'static str, value: &SqlValue) -> SqlError {
    SqlError::Processor {
        type_name,
        message: format!("unexpected {} value", value.variant_name()),
    }
}

/// Binds booleans as `1`/`0`. NULL stays NULL.
pub fn bool_to_int(value: SqlValue) -> Result<SqlValue> {
    match value {
        SqlValue::Null => Ok(SqlValue::Null),
        SqlValue::Bool(b) => Ok(SqlValue::Int(i64::from(b))),
        SqlValue::Int(n) => Ok(SqlValue::Int(i64::from(n != 0))),
        other => Err(reject("Boolean", &other)),
    }
}

/// Reads `0`/non-zero integers back as booleans. NULL stays NULL.
pub fn int_to_bool(value: SqlValue) -> Result<SqlValue> {
    match value {
        SqlValue::Null => Ok(SqlValue::Null),
        SqlValue::Bool(b) => Ok(SqlValue::Bool(b)),
        SqlValue::Int(n) => Ok(SqlValue::Bool(n != 0)),
        other => Err(reject("Boolean", &other)),
    }
}

/// Reads numeric results as exact decimals.
pub fn to_decimal(value: SqlValue) -> Result<SqlValue> {
    match value {
        SqlValue::Null => Ok(SqlValue::Null),
        SqlValue::Decimal(d) => Ok(SqlValue::Decimal(d)),
        SqlValue::Int(n) => Ok(SqlValue::Decimal(Decimal::from(n))),
        SqlValue::Text(s) => Ok(SqlValue::Decimal(s.parse()?)),
        SqlValue::Float(f) => Ok(SqlValue::Decimal(f.to_string().parse()?)),
        other => Err(reject("Numeric", &other)),
    }
}

/// Reads numeric results as floats.
#[allow(clippy::cast_precision_loss)]
pub fn to_float(value: SqlValue) -> Result<SqlValue> {
    match value {
        SqlValue::Null => Ok(SqlValue::Null),
        SqlValue::Float(f) => Ok(SqlValue::Float(f)),
        SqlValue::Decimal(d) => Ok(SqlValue::Float(d.to_f64())),
        SqlValue::Int(n) => Ok(SqlValue::Float(n as f64)),
        SqlValue::Text(s) => s.parse().map(SqlValue::Float).map_err(|_| SqlError::Processor {
            type_name: "Numeric",
            message: format!("'{s}' is not a number"),
        }),
        other => Err(reject("Numeric", &other)),
    }
}

/// Renders any value with the generic escaped literal syntax.
pub fn literal_inline(value: &SqlValue) -> Result<String> {
    value.to_sql_inline()
}

/// Renders booleans as `1`/`0` for backends without a boolean type.
pub fn literal_bool_as_int(value: &SqlValue) -> Result<String> {
    match value {
        SqlValue::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
        other => other.to_sql_inline(),
    }
}

/// Base bind processor for a type: only booleans need one, and only where
/// the backend lacks a native boolean.
#[must_use]
pub fn base_bind_processor(ty: &SqlType, caps: &Capabilities) -> Option<Processor> {
    match ty.kind() {
        TypeKind::Boolean if !caps.supports_native_boolean => Some(bool_to_int),
        _ => None,
    }
}

/// Base result processor for a type.
#[must_use]
pub fn base_result_processor(ty: &SqlType, caps: &Capabilities) -> Option<Processor> {
    match ty.kind() {
        TypeKind::Boolean if !caps.supports_native_boolean => Some(int_to_bool),
        TypeKind::Numeric | TypeKind::Float => match ty.numeric_mode() {
            NumericMode::Decimal => Some(to_decimal),
            NumericMode::Float => Some(to_float),
        },
        _ => None,
    }
}

/// Base literal processor for a type. The null type has none.
#[must_use]
pub fn base_literal_processor(ty: &SqlType, caps: &Capabilities) -> Option<LiteralProcessor> {
    match ty.kind() {
        TypeKind::Null => None,
        TypeKind::Boolean if !caps.supports_native_boolean => Some(literal_bool_as_int),
        _ => Some(literal_inline),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_null_is_a_third_state() {
        assert_eq!(bool_to_int(SqlValue::Null).unwrap(), SqlValue::Null);
        assert_eq!(int_to_bool(SqlValue::Null).unwrap(), SqlValue::Null);
        assert_eq!(bool_to_int(SqlValue::Bool(true)).unwrap(), SqlValue::Int(1));
        assert_eq!(bool_to_int(SqlValue::Bool(false)).unwrap(), SqlValue::Int(0));
        assert_eq!(int_to_bool(SqlValue::Int(0)).unwrap(), SqlValue::Bool(false));
        assert_eq!(int_to_bool(SqlValue::Int(7)).unwrap(), SqlValue::Bool(true));
        assert!(bool_to_int(SqlValue::Text(String::from("yes"))).is_err());
    }

    #[test]
    fn test_numeric_modes() {
        let exact = to_decimal(SqlValue::Text(String::from("1234.5600"))).unwrap();
        assert_eq!(exact, SqlValue::Decimal("1234.5600".parse().unwrap()));
        let approx = to_float(SqlValue::Decimal("0.5".parse().unwrap())).unwrap();
        assert_eq!(approx, SqlValue::Float(0.5));
    }

    #[test]
    fn test_processor_selection() {
        let caps = Capabilities {
            supports_native_boolean: false,
            ..Capabilities::default()
        };
        assert!(base_bind_processor(&SqlType::boolean(), &caps).is_some());
        assert!(base_bind_processor(&SqlType::integer(), &caps).is_none());
        assert!(base_literal_processor(&SqlType::null(), &caps).is_none());

        assert!(base_bind_processor(&SqlType::boolean(), &Capabilities::default()).is_none());
    }
}
