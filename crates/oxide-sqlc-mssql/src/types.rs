//! SQL Server column types and value conversions.
//!
//! SQL Server before 2008 has no `DATE` type; dates are stored in
//! `SMALLDATETIME` columns and truncated back to dates when read. Booleans
//! are `BIT` columns bound as `1`/`0`.

use std::fmt::Write;

use chrono::NaiveTime;
use oxide_sqlc_core::dialect::Capabilities;
use oxide_sqlc_core::types::{HasLength, SqlType, TypeKind, TypeOverride};
use oxide_sqlc_core::value::{SqlValue, quote_string};
use oxide_sqlc_core::{Result, SqlError};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

fn sized_or_max(name: &str, length: Option<u32>) -> String {
    match length {
        Some(n) => format!("{name}({n})"),
        None => format!("{name}(max)"),
    }
}

fn render_tiny_integer(_ty: &SqlType, _caps: &Capabilities) -> String {
    String::from("TINYINT")
}

fn render_datetime(_ty: &SqlType, _caps: &Capabilities) -> String {
    String::from("DATETIME")
}

fn render_date(_ty: &SqlType, caps: &Capabilities) -> String {
    if caps.supports_native_date {
        String::from("DATE")
    } else {
        String::from("SMALLDATETIME")
    }
}

fn render_time(_ty: &SqlType, caps: &Capabilities) -> String {
    if caps.supports_native_date {
        String::from("TIME")
    } else {
        String::from("DATETIME")
    }
}

fn render_string(ty: &SqlType, _caps: &Capabilities) -> String {
    sized_or_max("VARCHAR", ty.length())
}

fn render_unicode(ty: &SqlType, _caps: &Capabilities) -> String {
    sized_or_max("NVARCHAR", ty.length())
}

fn render_text(_ty: &SqlType, _caps: &Capabilities) -> String {
    String::from("TEXT")
}

fn render_unicode_text(_ty: &SqlType, _caps: &Capabilities) -> String {
    String::from("NTEXT")
}

fn render_text_as_varchar(_ty: &SqlType, _caps: &Capabilities) -> String {
    String::from("VARCHAR(max)")
}

fn render_unicode_text_as_varchar(_ty: &SqlType, _caps: &Capabilities) -> String {
    String::from("NVARCHAR(max)")
}

fn render_binary(ty: &SqlType, _caps: &Capabilities) -> String {
    match ty.length() {
        Some(n) => format!("VARBINARY({n})"),
        None => String::from("IMAGE"),
    }
}

fn render_boolean(_ty: &SqlType, _caps: &Capabilities) -> String {
    String::from("BIT")
}

macro_rules! overrides {
    ($($kind:ident => $render:ident),* $(,)?) => {
        &[$(TypeOverride { kind: TypeKind::$kind, render: $render }),*]
    };
}

/// Overrides used by default.
pub static TYPE_OVERRIDES: &[TypeOverride] = overrides![
    TinyInteger => render_tiny_integer,
    DateTime => render_datetime,
    Date => render_date,
    Time => render_time,
    String => render_string,
    Unicode => render_unicode,
    Text => render_text,
    UnicodeText => render_unicode_text,
    Binary => render_binary,
    Boolean => render_boolean,
];

/// Overrides used with `text_as_varchar`: unbounded text becomes
/// `VARCHAR(max)`.
pub static TEXT_AS_VARCHAR_OVERRIDES: &[TypeOverride] = overrides![
    TinyInteger => render_tiny_integer,
    DateTime => render_datetime,
    Date => render_date,
    Time => render_time,
    String => render_string,
    Unicode => render_unicode,
    Text => render_text_as_varchar,
    UnicodeText => render_unicode_text_as_varchar,
    Binary => render_binary,
    Boolean => render_boolean,
];

/// Catalog type names as reported by `INFORMATION_SCHEMA.COLUMNS`.
pub static NATIVE_TYPE_NAMES: &[(&str, TypeKind)] = &[
    ("binary", TypeKind::Binary),
    ("bit", TypeKind::Boolean),
    ("datetime", TypeKind::DateTime),
    ("datetime2", TypeKind::DateTime),
    ("image", TypeKind::Binary),
    ("money", TypeKind::Numeric),
    ("ntext", TypeKind::UnicodeText),
    ("nvarchar", TypeKind::Unicode),
    ("smalldatetime", TypeKind::Date),
    ("tinyint", TypeKind::TinyInteger),
];

fn reject(type_name: &'static str, value: &SqlValue) -> SqlError {
    SqlError::Processor {
        type_name,
        message: format!("unexpected {} value", value.variant_name()),
    }
}

/// Binds date-times as `YYYY-MM-DD HH:MM:SS` text. Dates are promoted to
/// midnight.
pub fn bind_datetime(value: SqlValue) -> Result<SqlValue> {
    match value {
        SqlValue::DateTime(dt) => Ok(SqlValue::Text(dt.format(DATETIME_FORMAT).to_string())),
        SqlValue::Date(d) => Ok(SqlValue::Text(
            d.and_time(NaiveTime::MIN).format(DATETIME_FORMAT).to_string(),
        )),
        SqlValue::Null | SqlValue::Text(_) => Ok(value),
        other => Err(reject("DateTime", &other)),
    }
}

/// Binds dates as ISO `YYYY-MM-DD` text.
pub fn bind_date(value: SqlValue) -> Result<SqlValue> {
    match value {
        SqlValue::Date(d) => Ok(SqlValue::Text(d.format(DATE_FORMAT).to_string())),
        SqlValue::DateTime(dt) => Ok(SqlValue::Text(dt.date().format(DATE_FORMAT).to_string())),
        SqlValue::Null | SqlValue::Text(_) => Ok(value),
        other => Err(reject("Date", &other)),
    }
}

/// Reads `SMALLDATETIME` values back as dates.
pub fn truncate_to_date(value: SqlValue) -> Result<SqlValue> {
    match value {
        SqlValue::DateTime(dt) => Ok(SqlValue::Date(dt.date())),
        other => Ok(other),
    }
}

/// Promotes bare dates returned for `DATETIME` columns to midnight.
pub fn promote_to_datetime(value: SqlValue) -> Result<SqlValue> {
    match value {
        SqlValue::Date(d) => Ok(SqlValue::DateTime(d.and_time(NaiveTime::MIN))),
        other => Ok(other),
    }
}

/// Binds binary values as upper-case hex text, for drivers without a binary
/// parameter type.
pub fn blob_to_hex(value: SqlValue) -> Result<SqlValue> {
    match value {
        SqlValue::Blob(bytes) => {
            let mut hex = String::with_capacity(bytes.len() * 2);
            for b in &bytes {
                let _ = write!(hex, "{b:02X}");
            }
            Ok(SqlValue::Text(hex))
        }
        other => Ok(other),
    }
}

/// Renders date-times inline in the bind format.
pub fn literal_datetime(value: &SqlValue) -> Result<String> {
    match bind_datetime(value.clone())? {
        SqlValue::Text(s) => Ok(quote_string(&s)),
        other => other.to_sql_inline(),
    }
}

/// Renders dates inline in ISO format.
pub fn literal_date(value: &SqlValue) -> Result<String> {
    match bind_date(value.clone())? {
        SqlValue::Text(s) => Ok(quote_string(&s)),
        other => other.to_sql_inline(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2007, 3, 14).unwrap()
    }

    #[test]
    fn test_date_depends_on_server() {
        let old = Capabilities {
            supports_native_date: false,
            ..Capabilities::default()
        };
        assert_eq!(render_date(&SqlType::date(), &old), "SMALLDATETIME");
        assert_eq!(render_time(&SqlType::time(), &old), "DATETIME");
        assert_eq!(render_date(&SqlType::date(), &Capabilities::default()), "DATE");
    }

    #[test]
    fn test_unbounded_strings_use_max() {
        let caps = Capabilities::default();
        assert_eq!(render_string(&SqlType::string(None), &caps), "VARCHAR(max)");
        assert_eq!(render_string(&SqlType::string(Some(20)), &caps), "VARCHAR(20)");
        assert_eq!(render_unicode(&SqlType::unicode(Some(40)), &caps), "NVARCHAR(40)");
        assert_eq!(render_binary(&SqlType::binary(None), &caps), "IMAGE");
        assert_eq!(render_binary(&SqlType::binary(Some(16)), &caps), "VARBINARY(16)");
    }

    #[test]
    fn test_datetime_binds() {
        let dt = date().and_hms_opt(9, 26, 53).unwrap();
        assert_eq!(
            bind_datetime(SqlValue::DateTime(dt)).unwrap(),
            SqlValue::Text(String::from("2007-03-14 09:26:53"))
        );
        assert_eq!(
            bind_datetime(SqlValue::Date(date())).unwrap(),
            SqlValue::Text(String::from("2007-03-14 00:00:00"))
        );
        assert_eq!(
            bind_date(SqlValue::Date(date())).unwrap(),
            SqlValue::Text(String::from("2007-03-14"))
        );
        assert_eq!(bind_date(SqlValue::Null).unwrap(), SqlValue::Null);
        assert!(bind_date(SqlValue::Int(3)).is_err());
    }

    #[test]
    fn test_date_results() {
        let dt = date().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(
            truncate_to_date(SqlValue::DateTime(dt)).unwrap(),
            SqlValue::Date(date())
        );
        assert_eq!(
            promote_to_datetime(SqlValue::Date(date())).unwrap(),
            SqlValue::DateTime(dt)
        );
        assert_eq!(truncate_to_date(SqlValue::Null).unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_hex_binary() {
        assert_eq!(
            blob_to_hex(SqlValue::Blob(vec![0xDE, 0xAD, 0x01])).unwrap(),
            SqlValue::Text(String::from("DEAD01"))
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(literal_date(&SqlValue::Date(date())).unwrap(), "'2007-03-14'");
        let dt = date().and_hms_opt(1, 2, 3).unwrap();
        assert_eq!(
            literal_datetime(&SqlValue::DateTime(dt)).unwrap(),
            "'2007-03-14 01:02:03'"
        );
    }
}
