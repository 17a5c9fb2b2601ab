//! Invoicing System - Schema and Report Queries
//!
//! This example demonstrates:
//! - Declaring a multi-tenant invoicing schema with `MetaData`
//! - Emitting DDL in dependency order
//! - Compiling the same report query for two dialects
//! - Paging with LIMIT/OFFSET
//!
//! Run with: cargo run --example invoicing

use oxide_sqlc_core::ast::{FromItem, Insert, Statement, count_star, func, select};
use oxide_sqlc_core::dialect::{Dialect, GenericDialect, PostgresDialect};
use oxide_sqlc_core::schema::{ColumnDef, MetaData, Table};
use oxide_sqlc_core::types::SqlType;
use oxide_sqlc_core::{Expr, Result, compile};

// =============================================================================
// SCHEMA DEFINITIONS
// =============================================================================

fn companies() -> Result<Table> {
    Table::new(
        "companies",
        vec![
            ColumnDef::new("id", SqlType::integer()).primary_key(),
            ColumnDef::new("name", SqlType::string(Some(200))).not_null(),
            ColumnDef::new("tax_id", SqlType::string(Some(40))),
            ColumnDef::new("default_currency", SqlType::char(Some(3))).not_null(),
        ],
    )
}

fn clients() -> Result<Table> {
    Table::new(
        "clients",
        vec![
            ColumnDef::new("id", SqlType::integer()).primary_key(),
            ColumnDef::new("company_id", SqlType::integer())
                .not_null()
                .references("companies", "id"),
            ColumnDef::new("name", SqlType::string(Some(200))).not_null(),
            ColumnDef::new("email", SqlType::string(Some(320))),
            ColumnDef::new("payment_terms_days", SqlType::small_integer()),
        ],
    )
}

fn invoices() -> Result<Table> {
    Table::new(
        "invoices",
        vec![
            ColumnDef::new("id", SqlType::integer()).primary_key(),
            ColumnDef::new("client_id", SqlType::integer())
                .not_null()
                .references("clients", "id"),
            ColumnDef::new("number", SqlType::string(Some(30))).not_null().unique(),
            ColumnDef::new("status", SqlType::string(Some(10))).not_null(),
            ColumnDef::new("currency", SqlType::char(Some(3))).not_null(),
            ColumnDef::new("total", SqlType::numeric(14, 2)).not_null(),
            ColumnDef::new("issued", SqlType::date()),
        ],
    )
}

// =============================================================================
// QUERIES
// =============================================================================

/// Outstanding totals per client, largest first.
fn outstanding_report(clients: &Table, invoices: &Table) -> Statement {
    let outstanding = Expr::from(func("sum", vec![invoices.c("total")]));
    select(vec![
        clients.c("name"),
        invoices.c("currency"),
        count_star().label("open_invoices"),
        outstanding.clone().label("outstanding"),
    ])
    .from(FromItem::from(clients).join(invoices, invoices.c("client_id").eq(clients.c("id"))))
    .where_clause(invoices.c("status").in_list(vec!["sent", "overdue"]))
    .group_by(vec![clients.c("name"), invoices.c("currency")])
    .order_by(outstanding.desc())
    .into()
}

/// One page of a client's invoices.
fn invoice_page(invoices: &Table, client_id: i64, page: u64) -> Statement {
    select(vec![invoices.c("number"), invoices.c("issued"), invoices.c("total")])
        .where_clause(invoices.c("client_id").eq(client_id))
        .order_by(invoices.c("issued"))
        .limit(20)
        .offset(page * 20)
        .into()
}

fn print_for(dialect: &dyn Dialect, statements: &[(&str, Statement)]) -> Result<()> {
    println!("--- {} ---", dialect.name());
    for (title, stmt) in statements {
        let compiled = compile(stmt, dialect)?;
        println!("{title}:\n{}\n", compiled.sql);
    }
    Ok(())
}

fn main() -> Result<()> {
    let mut metadata = MetaData::new();
    // Registered out of order on purpose; DDL still comes out parents first.
    let invoices = metadata.add(invoices()?)?;
    let clients = metadata.add(clients()?)?;
    metadata.add(companies()?)?;

    let dialect = GenericDialect::new();
    for table in metadata.sorted_tables() {
        println!("{};\n", compile(&Statement::create_table(table), &dialect)?.sql);
    }

    let new_invoice = Insert::into_table(&invoices)
        .value("client_id", 12)
        .value("number", "2024-0042")
        .value("status", "draft")
        .value("currency", "EUR")
        .value("total", "1250.00".parse::<oxide_sqlc_core::decimal::Decimal>()?)
        .build()?;

    let statements = [
        ("new invoice", new_invoice.into()),
        ("outstanding report", outstanding_report(&clients, &invoices)),
        ("invoice page 3", invoice_page(&invoices, 12, 3)),
    ];
    print_for(&GenericDialect::new(), &statements)?;
    print_for(&PostgresDialect::new(), &statements)?;
    Ok(())
}
