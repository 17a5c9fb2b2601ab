//! Dialect configuration options.

use serde::Deserialize;
use tracing::warn;

use crate::error::{Result, SqlError};

/// Options a dialect is constructed with.
///
/// Deserializable from configuration files, or parsed from the query part of
/// a connection URL with [`DialectOptions::from_url`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct DialectOptions {
    /// Switch identity insert on when an INSERT supplies a value for the
    /// auto-increment column.
    pub auto_identity_insert: bool,
    /// Statement timeout in seconds.
    pub query_timeout: Option<u64>,
    /// Render unbounded text as `VARCHAR(max)` instead of `TEXT`.
    pub text_as_varchar: bool,
    /// Fetch generated ids with `scope_identity()` in the same batch.
    pub use_scope_identity: bool,
    /// Assume window functions before the server has been probed.
    pub has_window_funcs: bool,
    /// Longest identifier the server accepts.
    pub max_identifier_length: usize,
    /// Default schema; the dialect's own default when absent.
    pub schema_name: Option<String>,
}

impl Default for DialectOptions {
    fn default() -> Self {
        Self {
            auto_identity_insert: true,
            query_timeout: None,
            text_as_varchar: false,
            use_scope_identity: false,
            has_window_funcs: false,
            max_identifier_length: 128,
            schema_name: None,
        }
    }
}

fn parse_bool(option: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(option, value)),
    }
}

fn parse_number<T: std::str::FromStr>(option: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| invalid(option, value))
}

fn invalid(option: &str, value: &str) -> SqlError {
    SqlError::InvalidConfig {
        option: option.to_string(),
        value: value.to_string(),
    }
}

impl DialectOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `key=value` pairs over the defaults.
    ///
    /// Unknown keys are logged and ignored so driver-level options can share
    /// the same query string.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::InvalidConfig`] for a value that does not parse.
    pub fn from_query_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut options = Self::default();
        for (key, value) in pairs {
            match key {
                "auto_identity_insert" => options.auto_identity_insert = parse_bool(key, value)?,
                "query_timeout" => options.query_timeout = Some(parse_number(key, value)?),
                "text_as_varchar" => options.text_as_varchar = parse_bool(key, value)?,
                "use_scope_identity" => options.use_scope_identity = parse_bool(key, value)?,
                "has_window_funcs" => options.has_window_funcs = parse_bool(key, value)?,
                "max_identifier_length" => {
                    options.max_identifier_length = parse_number(key, value)?;
                }
                "schema_name" => options.schema_name = Some(value.to_string()),
                _ => warn!(option = key, "ignoring unknown dialect option"),
            }
        }
        Ok(options)
    }

    /// Splits a connection URL into its scheme and options.
    ///
    /// ```rust
    /// use oxide_sqlc_core::dialect::DialectOptions;
    ///
    /// let (scheme, options) =
    ///     DialectOptions::from_url("mssql+odbc://db/app?text_as_varchar=1").unwrap();
    /// assert_eq!(scheme, "mssql+odbc");
    /// assert!(options.text_as_varchar);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::InvalidConfig`] for a URL without a scheme or an
    /// option value that does not parse.
    pub fn from_url(url: &str) -> Result<(String, Self)> {
        let (scheme, rest) = url
            .split_once("://")
            .filter(|(scheme, _)| !scheme.is_empty())
            .ok_or_else(|| invalid("url", url))?;
        let query = rest.split_once('?').map_or("", |(_, q)| q);
        let pairs = query
            .split('&')
            .filter(|p| !p.is_empty())
            .map(|p| p.split_once('=').unwrap_or((p, "")));
        Ok((scheme.to_string(), Self::from_query_pairs(pairs)?))
    }
}
