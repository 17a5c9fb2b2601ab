//! Error types for statement construction, compilation and execution.

use thiserror::Error;

/// Error reported by the driver layer behind a [`Cursor`](crate::execution::Cursor).
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while building or compiling statements.
#[derive(Debug, Error)]
pub enum SqlError {
    /// The active dialect cannot express the requested construct.
    #[error("{capability} is not supported by the {dialect} dialect: {detail}")]
    CapabilityViolation {
        /// Dialect name.
        dialect: String,
        /// The missing capability.
        capability: &'static str,
        /// What was requested.
        detail: String,
    },

    /// Values were supplied for names that match no column or parameter.
    #[error("unconsumed column names: {}", .names.join(", "))]
    Unconsumed {
        /// The names that were not consumed, in sorted order.
        names: Vec<String>,
    },

    /// Two parts of a statement contradict each other.
    #[error("structural conflict: {0}")]
    StructuralConflict(String),

    /// A bind parameter cannot be rendered inline.
    #[error("literal rendering not implemented for bind parameter '{param}': {reason}")]
    LiteralUnsupported {
        /// Bind parameter name.
        param: String,
        /// Why rendering failed.
        reason: String,
    },

    /// Two bind parameters claim the same name.
    #[error("bind parameter conflict: {0}")]
    BindConflict(String),

    /// A required bind value was not supplied.
    #[error("a value is required for bind parameter '{0}'")]
    MissingBindValue(String),

    /// A configuration option had an unusable value.
    #[error("invalid value '{value}' for option '{option}'")]
    InvalidConfig {
        /// Option name.
        option: String,
        /// Supplied value.
        value: String,
    },

    /// No dialect is registered under the given name.
    #[error("unknown dialect: {0}")]
    UnknownDialect(String),

    /// A type processor rejected a value.
    #[error("cannot process value for type {type_name}: {message}")]
    Processor {
        /// Logical type name.
        type_name: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// A decimal string could not be parsed.
    #[error("invalid decimal literal: {0}")]
    InvalidDecimal(String),

    /// The driver reported a failure.
    #[error("driver error: {0}")]
    Driver(#[source] DriverError),
}

impl SqlError {
    /// Creates a capability violation for `dialect`.
    #[must_use]
    pub fn capability(
        dialect: impl Into<String>,
        capability: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self::CapabilityViolation {
            dialect: dialect.into(),
            capability,
            detail: detail.into(),
        }
    }

    /// Returns the missing capability for capability violations.
    #[must_use]
    pub const fn missing_capability(&self) -> Option<&'static str> {
        match self {
            Self::CapabilityViolation { capability, .. } => Some(capability),
            _ => None,
        }
    }
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, SqlError>;
