//! Capability records and the one-shot server probe.

use std::fmt;
use std::sync::OnceLock;

use tracing::info;

use crate::error::Result;

/// How a dialect expresses LATERAL derived tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LateralStyle {
    /// `JOIN LATERAL (...) AS x`.
    #[default]
    Lateral,
    /// `CROSS APPLY (...) AS x` / `OUTER APPLY (...) AS x`.
    Apply,
    /// No lateral support.
    Unsupported,
}

/// What a dialect (and, after probing, its server) can express.
///
/// The `Default` record describes an ANSI backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// `INSERT/UPDATE/DELETE ... RETURNING`.
    pub supports_returning: bool,
    /// `INSERT ... VALUES (...), (...)`.
    pub supports_multivalues_insert: bool,
    /// A native BOOLEAN type.
    pub supports_native_boolean: bool,
    /// A DATE type that stores no time part.
    pub supports_native_date: bool,
    /// `INSERT INTO t DEFAULT VALUES`.
    pub supports_default_values: bool,
    /// `INSERT INTO t () VALUES ()`.
    pub supports_empty_insert: bool,
    /// `x = (SELECT ...)`; without it equality becomes `IN`.
    pub supports_scalar_subquery_comparison: bool,
    /// ORDER BY inside subqueries that have no row limit.
    pub supports_subquery_order_by: bool,
    /// Schema-qualified tables get a generated alias.
    pub alias_schema_qualified_tables: bool,
    /// `ROW_NUMBER() OVER (...)` and friends.
    pub supports_window_functions: bool,
    /// LATERAL rendering.
    pub lateral: LateralStyle,
    /// The new row id of an INSERT is fetched after the statement runs.
    pub postfetch_lastrowid: bool,
    /// The driver reports accurate affected row counts.
    pub supports_sane_rowcount: bool,
    /// Longest identifier the server accepts.
    pub max_identifier_length: usize,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            supports_returning: false,
            supports_multivalues_insert: true,
            supports_native_boolean: true,
            supports_native_date: true,
            supports_default_values: true,
            supports_empty_insert: false,
            supports_scalar_subquery_comparison: true,
            supports_subquery_order_by: true,
            alias_schema_qualified_tables: false,
            supports_window_functions: true,
            lateral: LateralStyle::Lateral,
            postfetch_lastrowid: false,
            supports_sane_rowcount: true,
            max_identifier_length: 128,
        }
    }
}

/// A server version as reported by the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch or build number.
    pub patch: u32,
}

impl ServerVersion {
    /// Creates a version.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Asks a live server for its version. Implemented by the driver layer.
pub trait ServerProbe {
    /// Returns the server's version.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be queried.
    fn server_version(&self) -> Result<ServerVersion>;
}

/// Capabilities that start at their defaults and are replaced, once and as a
/// whole, by the probed record.
///
/// Readers see either the defaults or the complete probed record, never a
/// mix of the two.
#[derive(Debug)]
pub struct CapabilityCell {
    defaults: Capabilities,
    probed: OnceLock<Capabilities>,
}

impl CapabilityCell {
    /// Creates a cell holding `defaults`.
    #[must_use]
    pub const fn new(defaults: Capabilities) -> Self {
        Self {
            defaults,
            probed: OnceLock::new(),
        }
    }

    /// Returns the probed record, or the defaults before probing.
    #[must_use]
    pub fn get(&self) -> Capabilities {
        self.probed.get().copied().unwrap_or(self.defaults)
    }

    /// Returns the pre-probe defaults.
    #[must_use]
    pub const fn defaults(&self) -> Capabilities {
        self.defaults
    }

    /// Returns `true` once a probe has completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.probed.get().is_some()
    }

    /// Probes the server and publishes the derived record.
    ///
    /// Only the first successful call probes; later calls return the
    /// published record. A failed probe publishes nothing.
    ///
    /// # Errors
    ///
    /// Returns the probe's error.
    pub fn initialize_with(
        &self,
        dialect: &'static str,
        probe: &dyn ServerProbe,
        derive: impl FnOnce(Capabilities, ServerVersion) -> Capabilities,
    ) -> Result<Capabilities> {
        if let Some(caps) = self.probed.get() {
            return Ok(*caps);
        }
        let version = probe.server_version()?;
        let derived = derive(self.defaults, version);
        let published = *self.probed.get_or_init(|| derived);
        info!(
            dialect,
            server_version = %version,
            window_functions = published.supports_window_functions,
            native_date = published.supports_native_date,
            returning = published.supports_returning,
            "initialized dialect capabilities"
        );
        Ok(published)
    }
}

impl Clone for CapabilityCell {
    fn clone(&self) -> Self {
        let probed = OnceLock::new();
        if let Some(caps) = self.probed.get() {
            let _ = probed.set(*caps);
        }
        Self {
            defaults: self.defaults,
            probed,
        }
    }
}
