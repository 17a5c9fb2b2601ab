//! Identifier quoting, truncation and alias allocation.

use std::collections::HashSet;
use std::fmt::Write;

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::schema::{ColumnDef, Table};

/// Words every dialect quotes.
pub const ANSI_RESERVED_WORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "between", "binary", "both", "case", "cast", "check", "collate",
    "column", "constraint", "create", "cross", "current_date", "current_role",
    "current_time", "current_timestamp", "current_user", "default", "deferrable", "desc",
    "distinct", "do", "else", "end", "except", "false", "for", "foreign", "freeze", "from",
    "full", "grant", "group", "having", "ilike", "in", "initially", "inner", "intersect",
    "into", "is", "isnull", "join", "leading", "left", "like", "limit", "localtime",
    "localtimestamp", "natural", "new", "not", "notnull", "null", "off", "offset", "old",
    "on", "only", "or", "order", "outer", "overlaps", "placing", "primary", "references",
    "right", "select", "session_user", "similar", "some", "symmetric", "table", "then",
    "to", "trailing", "true", "union", "unique", "user", "using", "verbose", "when",
    "where",
];

const HASH_SUFFIX_LEN: usize = 8;

/// Quotes and formats identifiers for one dialect.
#[derive(Debug, Clone)]
pub struct IdentifierPreparer {
    initial_quote: char,
    final_quote: char,
    reserved: HashSet<&'static str>,
    fold_lowercase: bool,
    max_identifier_length: usize,
}

impl IdentifierPreparer {
    /// Creates a preparer.
    ///
    /// `fold_lowercase` states whether the backend folds unquoted names to
    /// lower case; when it does, names with upper-case letters need quotes.
    #[must_use]
    pub fn new(
        quotes: (char, char),
        reserved: &[&'static str],
        fold_lowercase: bool,
        max_identifier_length: usize,
    ) -> Self {
        Self {
            initial_quote: quotes.0,
            final_quote: quotes.1,
            reserved: reserved.iter().copied().collect(),
            fold_lowercase,
            max_identifier_length,
        }
    }

    /// Returns the maximum identifier length.
    #[must_use]
    pub const fn max_identifier_length(&self) -> usize {
        self.max_identifier_length
    }

    /// Returns `true` if `ident` must be quoted to survive as written.
    #[must_use]
    pub fn requires_quotes(&self, ident: &str) -> bool {
        let Some(first) = ident.chars().next() else {
            return true;
        };
        let lower = ident.to_ascii_lowercase();
        self.reserved.contains(lower.as_str())
            || !(first.is_ascii_alphabetic() || first == '_')
            || !ident
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
            || (self.fold_lowercase && lower != ident)
    }

    /// Always quotes `ident`, doubling embedded closing quotes.
    #[must_use]
    pub fn quote_identifier(&self, ident: &str) -> String {
        let escaped = ident.replace(
            self.final_quote,
            &format!("{}{}", self.final_quote, self.final_quote),
        );
        format!("{}{escaped}{}", self.initial_quote, self.final_quote)
    }

    /// Quotes `ident` only if required.
    #[must_use]
    pub fn quote(&self, ident: &str) -> String {
        if self.requires_quotes(ident) {
            self.quote_identifier(ident)
        } else {
            ident.to_string()
        }
    }

    /// Quotes each part of a dotted schema name.
    #[must_use]
    pub fn quote_schema(&self, schema: &str) -> String {
        schema
            .split('.')
            .map(|part| self.quote(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Formats a table name, optionally schema-qualified.
    #[must_use]
    pub fn format_table(&self, table: &Table, use_schema: bool) -> String {
        let name = self.quote(table.name());
        match table.schema() {
            Some(schema) if use_schema => format!("{}.{name}", self.quote_schema(schema)),
            _ => name,
        }
    }

    /// Formats a column name, optionally qualified by its table.
    #[must_use]
    pub fn format_column(&self, column: &ColumnDef, table: Option<&Table>) -> String {
        let name = self.quote(&column.name);
        match table {
            Some(table) => format!("{}.{name}", self.format_table(table, true)),
            None => name,
        }
    }

    /// Shortens `name` to the maximum identifier length.
    ///
    /// Long names keep a prefix and gain `_` plus eight hex digits of the
    /// SHA-256 of the full name, so the result is stable across runs.
    /// Different names may still truncate to the same result.
    #[must_use]
    pub fn truncate(&self, name: &str) -> String {
        let len = name.chars().count();
        if len <= self.max_identifier_length {
            return name.to_string();
        }
        let digest = Sha256::digest(name.as_bytes());
        let mut suffix = String::with_capacity(HASH_SUFFIX_LEN);
        for byte in digest.iter().take(HASH_SUFFIX_LEN / 2) {
            let _ = write!(suffix, "{byte:02x}");
        }
        let keep = self.max_identifier_length.saturating_sub(HASH_SUFFIX_LEN + 1);
        let prefix: String = name.chars().take(keep).collect();
        let truncated = if keep == 0 {
            suffix.chars().take(self.max_identifier_length).collect()
        } else {
            format!("{prefix}_{suffix}")
        };
        warn!(
            identifier = name,
            truncated = truncated.as_str(),
            max_length = self.max_identifier_length,
            "identifier exceeds maximum length; truncating"
        );
        truncated
    }

    /// Returns `base`, or `base_1`, `base_2`, ... whichever is first not in
    /// `used`, truncated to the maximum length, and records it.
    pub fn unique_alias(&self, base: &str, used: &mut HashSet<String>) -> String {
        let mut candidate = self.truncate(base);
        let mut n = 0_usize;
        while used.contains(&candidate) {
            n += 1;
            candidate = self.truncate(&format!("{base}_{n}"));
        }
        used.insert(candidate.clone());
        candidate
    }
}
