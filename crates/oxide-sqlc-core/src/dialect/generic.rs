//! Generic SQL dialect.

use super::Dialect;

/// A generic SQL dialect using ANSI SQL standards.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericDialect;

impl GenericDialect {
    /// Creates a new generic dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for GenericDialect {
    fn name(&self) -> &'static str {
        "generic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{LimitStrategy, ParamStyle};

    #[test]
    fn test_generic_dialect() {
        let dialect = GenericDialect::new();
        assert_eq!(dialect.name(), "generic");
        assert_eq!(dialect.identifier_quotes(), ('"', '"'));
        assert_eq!(dialect.param_style(), ParamStyle::Qmark);
        assert_eq!(
            dialect.limit_strategy(&dialect.capabilities()),
            LimitStrategy::LimitOffset
        );
        assert!(!dialect.capabilities().supports_returning);
        assert!(dialect.last_inserted_id_query().is_none());
    }
}
