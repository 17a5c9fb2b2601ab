//! Properties that hold for every statement.

mod common;

use std::collections::HashSet;

use common::*;
use oxide_sqlc_core::ast::{Expr, select};
use oxide_sqlc_core::compiler::{CompileOptions, Compiler};
use oxide_sqlc_core::decimal::Decimal;
use oxide_sqlc_core::dialect::{Dialect, DialectOptions, GenericDialect, PostgresDialect};
use proptest::prelude::*;

fn any_of(values: &[i64]) -> Expr {
    let u = users();
    let mut terms = values.iter().map(|v| u.c("id").eq(*v));
    let first = terms.next().unwrap_or_else(|| u.c("id").is_null());
    terms.fold(first, Expr::or)
}

proptest! {
    #[test]
    fn compilation_is_deterministic(
        values in prop::collection::vec(any::<i64>(), 1..6),
        limit in 1u64..1000,
    ) {
        let u = users();
        let query = select(vec![u.c("name")])
            .where_clause(any_of(&values))
            .order_by(u.c("id"))
            .limit(limit);
        let dialect = PostgresDialect::new();
        let first = compiled(query.clone(), &dialect);
        let second = compiled(query, &dialect);
        prop_assert_eq!(&first.sql, &second.sql);
        prop_assert_eq!(
            first.bind_names().collect::<Vec<_>>(),
            second.bind_names().collect::<Vec<_>>()
        );
    }

    #[test]
    fn bind_names_never_collide(values in prop::collection::vec(any::<i64>(), 1..20)) {
        let u = users();
        let compiled = compiled(select(vec![u.c("name")]).where_clause(any_of(&values)), &GenericDialect::new());
        let names: HashSet<&str> = compiled.bind_names().collect();
        prop_assert_eq!(names.len(), values.len());
        prop_assert_eq!(compiled.sql.matches('?').count(), values.len());
    }

    #[test]
    fn decimal_literals_keep_every_digit(
        negative in any::<bool>(),
        digits in "[1-9][0-9]{0,30}",
        scale in 0i32..12,
    ) {
        let value = Decimal::from_parts(negative, &digits, -scale).unwrap();
        let o = orders();
        let query = select(vec![o.c("id")]).where_clause(o.c("total").eq(value.clone()));
        let dialect = GenericDialect::new();
        let compiled = Compiler::new(&dialect)
            .with_options(CompileOptions { literal_binds: true })
            .compile(&query.into())
            .unwrap();
        let rendered = compiled.sql.rsplit(" = ").next().unwrap_or_default();
        let parsed: Decimal = rendered.parse().unwrap();
        prop_assert!(parsed.numeric_eq(&value), "{} rendered as {}", value, rendered);
    }

    #[test]
    fn limited_compound_members_are_derived_tables(
        limit in 1u64..1000,
        offset in 0u64..1000,
        first in any::<bool>(),
    ) {
        let u = users();
        let paged = select(vec![u.c("id")])
            .from(&u)
            .order_by(u.c("id"))
            .limit(limit)
            .offset(offset);
        let plain = select(vec![u.c("id")]).from(&u);
        let union = if first { paged.union_all(plain) } else { plain.union_all(paged) };
        let page = format!("ORDER BY users.id LIMIT {limit} OFFSET {offset}) AS anon_");
        for dialect in [&GenericDialect::new() as &dyn Dialect, &PostgresDialect::new()] {
            let sql = sql(union.clone(), dialect);
            prop_assert!(sql.contains(&page), "{}", sql);
            prop_assert_eq!(sql.matches(" UNION ALL ").count(), 1);
        }
    }

    #[test]
    fn labels_fit_the_identifier_limit(
        label in "[a-z][a-z_]{0,80}",
        limit in 8usize..64,
    ) {
        let options = DialectOptions {
            max_identifier_length: limit,
            ..DialectOptions::default()
        };
        let dialect = PostgresDialect::with_options(&options);
        let u = users();
        let compiled = compiled(select(vec![u.c("name").label(label.as_str())]), &dialect);
        let name = compiled.result_columns[0].name.clone().unwrap_or_default();
        prop_assert!(name.chars().count() <= limit);
        if label.chars().count() <= limit {
            prop_assert_eq!(name, label);
        }
    }
}
