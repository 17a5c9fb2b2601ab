//! End-to-end compilation with the built-in dialects.

mod common;

use common::*;
use oxide_sqlc_core::ast::{Expr, FromItem, Insert, bindparam, exists, func, select};
use oxide_sqlc_core::compiled::{Params, StatementKind};
use oxide_sqlc_core::compiler::{CompileOptions, Compiler};
use oxide_sqlc_core::decimal::Decimal;
use oxide_sqlc_core::dialect::{DialectRegistry, GenericDialect, PostgresDialect};
use oxide_sqlc_core::types::SqlType;
use oxide_sqlc_core::value::SqlValue;
use oxide_sqlc_core::SqlError;

#[test]
fn report_query_for_postgres() {
    init_tracing();
    let u = users();
    let o = orders();
    let spent = Expr::from(func("sum", vec![o.c("total")]));
    let query = select(vec![u.c("name"), spent.clone().label("spent")])
        .from(FromItem::from(&u).join(&o, o.c("user_id").eq(u.c("id"))))
        .where_clause(u.c("active").eq(true))
        .group_by(vec![u.c("name")])
        .having(spent.gt(100))
        .order_by(u.c("name").desc())
        .limit(10);

    let compiled = compiled(query, &PostgresDialect::new());
    assert_eq!(
        compiled.sql,
        "SELECT users.name, sum(orders.total) AS spent FROM users JOIN orders ON orders.user_id = users.id \
         WHERE users.active = $1 GROUP BY users.name HAVING sum(orders.total) > $2 ORDER BY users.name DESC LIMIT 10"
    );
    assert_eq!(compiled.kind, StatementKind::Select);
    let names: Vec<_> = compiled
        .result_columns
        .iter()
        .filter_map(|c| c.name.as_deref())
        .collect();
    assert_eq!(names, vec!["name", "spent"]);

    let bound = compiled.bind(&Params::new()).unwrap();
    assert_eq!(
        compiled.positional_values(&bound),
        vec![SqlValue::Bool(true), SqlValue::Int(100)]
    );
}

#[test]
fn generated_bind_names_are_unique() {
    let u = users();
    let query = select(vec![u.c("name")]).where_clause(u.c("id").eq(1).or(u.c("id").eq(2)));
    let compiled = compiled(query, &GenericDialect::new());
    assert_eq!(
        compiled.sql,
        "SELECT users.name FROM users WHERE users.id = ? OR users.id = ?"
    );
    assert_eq!(compiled.bind_names().collect::<Vec<_>>(), vec!["id", "id_1"]);
}

#[test]
fn named_parameters_are_supplied_at_execution() {
    let u = users();
    let query = select(vec![u.c("id")])
        .where_clause(u.c("name").eq(bindparam("user_name", SqlType::string(None))));
    let compiled = compiled(query, &GenericDialect::new());

    let err = compiled.bind(&Params::new()).unwrap_err();
    assert!(matches!(err, SqlError::MissingBindValue(ref name) if name == "user_name"));

    let bound = compiled.bind(&Params::new().set("user_name", "ann")).unwrap();
    assert_eq!(bound, vec![(String::from("user_name"), SqlValue::Text(String::from("ann")))]);

    let err = compiled
        .bind(&Params::new().set("user_name", "ann").set("usr_name", "bob"))
        .unwrap_err();
    assert_eq!(err.to_string(), "unconsumed column names: usr_name");
}

#[test]
fn schema_qualified_tables_keep_their_schema() {
    let inv = invoices();
    assert_eq!(
        sql(select(vec![inv.c("id")]).where_clause(inv.c("amount").gt(0)), &GenericDialect::new()),
        "SELECT billing.invoices.id FROM billing.invoices WHERE billing.invoices.amount > ?"
    );
}

#[test]
fn correlated_exists_draws_from_the_outer_query() {
    let u = users();
    let o = orders();
    let has_orders = exists(select(vec![o.c("id")]).where_clause(o.c("user_id").eq(u.c("id"))));
    let query = select(vec![u.c("name")]).from(&u).where_clause(has_orders.not());
    assert_eq!(
        sql(query, &PostgresDialect::new()),
        "SELECT users.name FROM users WHERE NOT EXISTS (SELECT orders.id FROM orders WHERE orders.user_id = users.id)"
    );
}

#[test]
fn literal_decimals_are_exact() {
    let o = orders();
    let total: Decimal = "12345678901234567890.12".parse().unwrap();
    let query = select(vec![o.c("id")]).where_clause(o.c("total").gt(total));
    let dialect = GenericDialect::new();
    let compiled = Compiler::new(&dialect)
        .with_options(CompileOptions { literal_binds: true })
        .compile(&query.into())
        .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT orders.id FROM orders WHERE orders.total > 12345678901234567890.12"
    );
}

#[test]
fn returning_depends_on_the_dialect() {
    let u = users();
    let insert = Insert::into_table(&u)
        .value("name", "ann")
        .returning(vec![u.c("id")])
        .build()
        .unwrap();
    let err = compile_err(insert.clone(), &GenericDialect::new());
    assert_eq!(err.missing_capability(), Some("RETURNING"));

    let compiled = compiled(insert, &PostgresDialect::new());
    assert_eq!(compiled.sql, "INSERT INTO users (name) VALUES ($1) RETURNING users.id");
    assert_eq!(compiled.kind, StatementKind::Insert);
}

#[test]
fn dialects_resolve_from_urls() {
    let registry = DialectRegistry::with_builtin();
    let dialect = registry
        .from_url("postgresql://app@db/shop?max_identifier_length=30")
        .unwrap();
    assert_eq!(dialect.name(), "postgresql");
    assert_eq!(dialect.capabilities().max_identifier_length, 30);

    let err = registry.from_url("oracle://db/shop").unwrap_err();
    assert!(matches!(err, SqlError::UnknownDialect(_)));
}
