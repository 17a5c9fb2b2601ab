//! A shared cache of compiled statements.
//!
//! Entries are keyed by the statement tree, the dialect identity, the
//! dialect's current capabilities and the compile options. A dialect whose
//! capabilities change after server detection therefore never reuses SQL
//! compiled for its defaults. The capabilities are read once per lookup and
//! the same record is used for the key and for compiling on a miss.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::ast::Statement;
use crate::compiled::CompiledStatement;
use crate::compiler::{CompileOptions, Compiler};
use crate::dialect::{Capabilities, Dialect};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    statement: Statement,
    dialect: String,
    capabilities: Capabilities,
    options: CompileOptions,
}

/// Compiled statements shared across threads.
#[derive(Debug, Default)]
pub struct StatementCache {
    entries: RwLock<HashMap<CacheKey, Arc<CompiledStatement>>>,
}

impl StatementCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached compilation of `statement`, compiling it on a miss.
    ///
    /// # Errors
    ///
    /// Returns the compile error on a miss; failures are not cached.
    pub fn get_or_compile(
        &self,
        statement: &Statement,
        dialect: &dyn Dialect,
        options: CompileOptions,
    ) -> Result<Arc<CompiledStatement>> {
        let capabilities = dialect.capabilities();
        let key = CacheKey {
            statement: statement.clone(),
            dialect: dialect.identity(),
            capabilities,
            options,
        };
        let hit = self.entries.read().get(&key).cloned();
        if let Some(hit) = hit {
            trace!(dialect = key.dialect.as_str(), "statement cache hit");
            return Ok(hit);
        }

        let compiled = Compiler::new(dialect)
            .with_options(options)
            .with_capabilities(capabilities)
            .compile(statement)?;
        let compiled = Arc::new(compiled);
        // Another thread may have compiled the same statement meanwhile.
        let entry = Arc::clone(self.entries.write().entry(key).or_insert(compiled));
        Ok(entry)
    }

    /// Returns the number of cached statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::ast::select;
    use crate::dialect::{GenericDialect, PostgresDialect};
    use crate::schema::{ColumnDef, Table};
    use crate::types::SqlType;

    fn statement() -> Statement {
        let t = Table::new("t", vec![ColumnDef::new("x", SqlType::integer())]).unwrap();
        select(vec![t.c("x")]).from(&t).where_clause(t.c("x").eq(1)).into()
    }

    /// Reports a shorter identifier limit from its second read on, like a
    /// dialect whose server detection publishes while a lookup is in flight.
    #[derive(Debug, Default)]
    struct ShrinkingLimits {
        reads: AtomicUsize,
    }

    impl Dialect for ShrinkingLimits {
        fn name(&self) -> &'static str {
            "shrinking"
        }

        fn capabilities(&self) -> Capabilities {
            let max_identifier_length = if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                128
            } else {
                8
            };
            Capabilities {
                max_identifier_length,
                ..Capabilities::default()
            }
        }
    }

    #[test]
    fn test_key_and_rendering_share_one_capability_read() {
        let t = Table::new("t", vec![ColumnDef::new("x", SqlType::integer())]).unwrap();
        let stmt: Statement = select(vec![t.c("x").label("customer_name")]).from(&t).into();
        let cache = StatementCache::new();
        let dialect = ShrinkingLimits::default();

        let before = cache
            .get_or_compile(&stmt, &dialect, CompileOptions::default())
            .unwrap();
        assert_eq!(before.sql, "SELECT t.x AS customer_name FROM t");

        let after = cache
            .get_or_compile(&stmt, &dialect, CompileOptions::default())
            .unwrap();
        let label = after.result_columns[0].name.clone().unwrap();
        assert_eq!(cache.len(), 2);
        assert!(label.len() <= 8, "{label}");
        assert_ne!(before.sql, after.sql);
    }

    #[test]
    fn test_equal_trees_share_an_entry() {
        let cache = StatementCache::new();
        let dialect = GenericDialect::new();
        let a = cache
            .get_or_compile(&statement(), &dialect, CompileOptions::default())
            .unwrap();
        let b = cache
            .get_or_compile(&statement(), &dialect, CompileOptions::default())
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_dialect_and_options_are_part_of_the_key() {
        let cache = StatementCache::new();
        let generic = cache
            .get_or_compile(&statement(), &GenericDialect::new(), CompileOptions::default())
            .unwrap();
        let postgres = cache
            .get_or_compile(&statement(), &PostgresDialect::new(), CompileOptions::default())
            .unwrap();
        let literal = cache
            .get_or_compile(
                &statement(),
                &GenericDialect::new(),
                CompileOptions {
                    literal_binds: true,
                },
            )
            .unwrap();
        assert_ne!(generic.sql, postgres.sql);
        assert_eq!(literal.sql, "SELECT t.x FROM t WHERE t.x = 1");
        assert_eq!(cache.len(), 3);

        cache.clear();
        assert!(cache.is_empty());
    }
}
