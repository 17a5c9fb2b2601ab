//! Dialect lookup by connection scheme.

use std::collections::BTreeMap;
use std::fmt;

use super::{Dialect, DialectOptions, GenericDialect, PostgresDialect};
use crate::error::{Result, SqlError};

/// Builds a dialect from options.
pub type DialectConstructor = fn(&DialectOptions) -> Result<Box<dyn Dialect>>;

#[allow(clippy::unnecessary_wraps)]
fn generic(_options: &DialectOptions) -> Result<Box<dyn Dialect>> {
    Ok(Box::new(GenericDialect::new()))
}

#[allow(clippy::unnecessary_wraps)]
fn postgres(options: &DialectOptions) -> Result<Box<dyn Dialect>> {
    Ok(Box::new(PostgresDialect::with_options(options)))
}

/// Maps scheme strings such as `postgresql` or `mssql+odbc` to dialect
/// constructors.
#[derive(Clone, Default)]
pub struct DialectRegistry {
    constructors: BTreeMap<String, DialectConstructor>,
}

impl fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.constructors.keys()).finish()
    }
}

impl DialectRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the dialects built into this crate.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("generic", generic);
        registry.register("postgresql", postgres);
        registry.register("postgres", postgres);
        registry
    }

    /// Registers `constructor` under `scheme`, replacing any previous entry.
    pub fn register(&mut self, scheme: &str, constructor: DialectConstructor) {
        self.constructors
            .insert(scheme.to_ascii_lowercase(), constructor);
    }

    /// Returns the constructor for `scheme`.
    #[must_use]
    pub fn get(&self, scheme: &str) -> Option<DialectConstructor> {
        self.constructors
            .get(&scheme.to_ascii_lowercase())
            .copied()
    }

    /// Builds the dialect registered under `scheme`.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::UnknownDialect`] for an unregistered scheme, or the
    /// constructor's error.
    pub fn load(&self, scheme: &str, options: &DialectOptions) -> Result<Box<dyn Dialect>> {
        let constructor = self
            .get(scheme)
            .ok_or_else(|| SqlError::UnknownDialect(scheme.to_string()))?;
        constructor(options)
    }

    /// Builds the dialect named by a connection URL's scheme, configured
    /// from its query string.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed URL, an invalid option or an
    /// unregistered scheme.
    pub fn from_url(&self, url: &str) -> Result<Box<dyn Dialect>> {
        let (scheme, options) = DialectOptions::from_url(url)?;
        self.load(&scheme, &options)
    }

    /// Returns the registered schemes in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}
