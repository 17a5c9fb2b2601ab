//! Executing compiled statements through the SQL Server execution context.

mod common;

use chrono::NaiveDate;
use common::*;
use oxide_sqlc_core::ast::{Insert, select};
use oxide_sqlc_core::compiled::Params;
use oxide_sqlc_core::execution::execute;
use oxide_sqlc_core::schema::{ColumnDef, Table};
use oxide_sqlc_core::types::SqlType;
use oxide_sqlc_core::value::SqlValue;
use oxide_sqlc_core::SqlError;
use oxide_sqlc_mssql::{MssqlDialect, MssqlDriver};

#[test]
fn generated_id_is_fetched_with_at_at_identity() {
    init_tracing();
    let dialect = mssql();
    let insert = Insert::into_table(&users()).value("name", "bob").build().unwrap();
    let stmt = compiled(insert, &dialect);
    let mut cursor = MockCursor::new()
        .respond(vec![])
        .respond(vec![vec![SqlValue::Int(41)]]);

    let outcome = execute(&dialect, &stmt, &Params::new(), &mut cursor).unwrap();

    assert_eq!(
        cursor.statements(),
        vec!["INSERT INTO users (name) VALUES (?)", "SELECT @@IDENTITY AS lastrowid"]
    );
    assert_eq!(cursor.executed[0].1, vec![SqlValue::Text(String::from("bob"))]);
    assert_eq!(outcome.last_inserted_ids, Some(vec![SqlValue::Int(41)]));
}

#[test]
fn explicit_identity_toggles_identity_insert() {
    let dialect = mssql();
    let insert = Insert::into_table(&users())
        .value("id", 7)
        .value("name", "bob")
        .build()
        .unwrap();
    let stmt = compiled(insert, &dialect);
    let mut cursor = MockCursor::new();

    let outcome = execute(&dialect, &stmt, &Params::new(), &mut cursor).unwrap();

    assert_eq!(
        cursor.statements(),
        vec![
            "SET IDENTITY_INSERT users ON",
            "INSERT INTO users (id, name) VALUES (?, ?)",
            "SET IDENTITY_INSERT users OFF",
        ]
    );
    assert_eq!(outcome.last_inserted_ids, Some(vec![SqlValue::Int(7)]));
}

#[test]
fn identity_insert_is_restored_when_insert_fails() {
    let dialect = mssql();
    let insert = Insert::into_table(&users()).value("id", 7).build().unwrap();
    let stmt = compiled(insert, &dialect);
    let mut cursor = MockCursor::new().failing_on("INSERT INTO");

    let err = execute(&dialect, &stmt, &Params::new(), &mut cursor).unwrap_err();

    assert!(matches!(err, SqlError::Driver(_)));
    assert_eq!(cursor.statements().last(), Some(&"SET IDENTITY_INSERT users OFF"));
}

#[test]
fn explicit_identity_in_parameters_is_detected() {
    let dialect = mssql();
    let insert = Insert::into_table(&users())
        .value("id", SqlValue::Null)
        .value("name", "bob")
        .build()
        .unwrap();
    let stmt = compiled(insert, &dialect);

    let mut cursor = MockCursor::new();
    let params = Params::new().set("id", 12);
    execute(&dialect, &stmt, &params, &mut cursor).unwrap();
    assert_eq!(cursor.statements()[0], "SET IDENTITY_INSERT users ON");

    let mut cursor = MockCursor::new();
    execute(&dialect, &stmt, &Params::new(), &mut cursor).unwrap();
    assert!(!cursor.statements().iter().any(|s| s.contains("IDENTITY_INSERT")));
}

#[test]
fn identity_insert_can_be_disabled() {
    let dialect = mssql_with(|o| o.auto_identity_insert = false);
    let insert = Insert::into_table(&users()).value("id", 7).build().unwrap();
    let stmt = compiled(insert, &dialect);
    let mut cursor = MockCursor::new();

    execute(&dialect, &stmt, &Params::new(), &mut cursor).unwrap();

    assert_eq!(cursor.statements(), vec!["INSERT INTO users (id) VALUES (?)"]);
}

#[test]
fn scope_identity_is_batched() {
    let dialect = mssql_with(|o| o.use_scope_identity = true);
    let insert = Insert::into_table(&users()).value("name", "bob").build().unwrap();
    let stmt = compiled(insert, &dialect);
    let mut cursor = MockCursor::new().respond(vec![vec![SqlValue::Int(9)]]);

    let outcome = execute(&dialect, &stmt, &Params::new(), &mut cursor).unwrap();

    assert_eq!(
        cursor.statements(),
        vec!["INSERT INTO users (name) VALUES (?); SELECT scope_identity() AS lastrowid"]
    );
    assert_eq!(outcome.last_inserted_ids, Some(vec![SqlValue::Int(9)]));
    assert!(outcome.rows.is_empty());
}

#[test]
fn query_timeout_reaches_the_cursor() {
    let dialect = mssql_with(|o| o.query_timeout = Some(30));
    let stmt = compiled(select(vec![users().c("name")]), &dialect);
    let mut cursor = MockCursor::new();

    execute(&dialect, &stmt, &Params::new(), &mut cursor).unwrap();

    assert_eq!(cursor.timeouts, vec![Some(30)]);
}

#[test]
fn smalldatetime_results_are_read_as_dates() {
    let dialect = mssql();
    let o = orders();
    let stmt = compiled(select(vec![o.c("id"), o.c("placed")]), &dialect);
    let placed = NaiveDate::from_ymd_opt(2008, 2, 29).unwrap();
    let mut cursor = MockCursor::new().respond(vec![vec![
        SqlValue::Int(1),
        SqlValue::DateTime(placed.and_hms_opt(0, 0, 0).unwrap()),
    ]]);

    let outcome = execute(&dialect, &stmt, &Params::new(), &mut cursor).unwrap();

    assert_eq!(outcome.rows, vec![vec![SqlValue::Int(1), SqlValue::Date(placed)]]);
}

#[test]
fn date_parameters_are_bound_as_text() {
    let dialect = mssql();
    let o = orders();
    let day = NaiveDate::from_ymd_opt(2007, 3, 14).unwrap();
    let stmt = compiled(select(vec![o.c("id")]).where_clause(o.c("placed").gt(day)), &dialect);
    let mut cursor = MockCursor::new();

    execute(&dialect, &stmt, &Params::new(), &mut cursor).unwrap();

    assert_eq!(cursor.executed[0].1, vec![SqlValue::Text(String::from("2007-03-14"))]);
}

#[test]
fn tds_binds_binary_as_hex() {
    let blobs = Table::new(
        "blobs",
        vec![
            ColumnDef::new("id", SqlType::integer()).primary_key(),
            ColumnDef::new("data", SqlType::binary(None)),
        ],
    )
    .unwrap();
    let insert = Insert::into_table(&blobs)
        .value("data", vec![0xCA_u8, 0xFE])
        .build()
        .unwrap();

    let tds = MssqlDialect::new(MssqlDriver::Tds);
    let stmt = compiled(insert.clone(), &tds);
    let mut cursor = MockCursor::new();
    execute(&tds, &stmt, &Params::new(), &mut cursor).unwrap();
    assert_eq!(cursor.executed[0].1, vec![SqlValue::Text(String::from("CAFE"))]);

    let odbc = mssql();
    let stmt = compiled(insert, &odbc);
    let mut cursor = MockCursor::new();
    execute(&odbc, &stmt, &Params::new(), &mut cursor).unwrap();
    assert_eq!(cursor.executed[0].1, vec![SqlValue::Blob(vec![0xCA, 0xFE])]);
}
