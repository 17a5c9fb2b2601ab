//! CREATE/DROP TABLE and CREATE/DROP INDEX rendering.

use super::Compilation;
use crate::ast::Index;
use crate::error::Result;
use crate::schema::{ColumnDef, ColumnDefault, Constraint, ForeignKeyAction, Nullability, Table};
use crate::types::resolve_with;

impl Compilation<'_> {
    pub(super) fn create_table(&self, table: &Table, if_not_exists: bool) -> Result<String> {
        let autoinc = table.autoincrement_column().map(|c| c.name.clone());
        let mut specs = Vec::with_capacity(table.columns().len());
        for column in table.columns() {
            specs.push(self.column_spec(column, autoinc.as_deref() == Some(column.name.as_str()))?);
        }
        specs.extend(self.table_constraints(table));

        let exists = if if_not_exists { "IF NOT EXISTS " } else { "" };
        Ok(format!(
            "CREATE TABLE {exists}{} (\n\t{}\n)",
            self.preparer.format_table(table, true),
            specs.join(",\n\t")
        ))
    }

    pub(super) fn drop_table(&self, table: &Table, if_exists: bool) -> String {
        let exists = if if_exists { "IF EXISTS " } else { "" };
        format!("DROP TABLE {exists}{}", self.preparer.format_table(table, true))
    }

    pub(super) fn create_index(&self, index: &Index) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        let columns: Vec<String> = index.columns.iter().map(|c| self.preparer.quote(c)).collect();
        format!(
            "CREATE {unique}INDEX {} ON {} ({})",
            self.preparer.quote(&self.preparer.truncate(&index.name)),
            self.preparer.format_table(&index.table, true),
            columns.join(", ")
        )
    }

    pub(super) fn drop_index(&self, index: &Index) -> String {
        format!("DROP INDEX {}", self.dialect.drop_index_target(index, &self.preparer))
    }

    fn column_spec(&self, column: &ColumnDef, autoincrement: bool) -> Result<String> {
        let mut spec = self.preparer.quote(&column.name);
        spec.push(' ');

        let native_autoinc = if autoincrement {
            self.dialect.autoincrement_type(column)
        } else {
            None
        };
        let has_native_autoinc = native_autoinc.is_some();
        spec.push_str(&native_autoinc.unwrap_or_else(|| {
            resolve_with(&column.sql_type, self.dialect, &self.caps)
        }));

        match column.nullable {
            Nullability::NotNull => spec.push_str(" NOT NULL"),
            Nullability::Null if column.primary_key => spec.push_str(" NOT NULL"),
            Nullability::Null => spec.push_str(" NULL"),
            Nullability::Unspecified if column.primary_key => spec.push_str(" NOT NULL"),
            Nullability::Unspecified => {}
        }

        if autoincrement {
            if !has_native_autoinc {
                if let Some(clause) = self.dialect.autoincrement_clause(column) {
                    spec.push(' ');
                    spec.push_str(&clause);
                }
            }
            return Ok(spec);
        }

        match &column.default {
            Some(ColumnDefault::Value(value)) => {
                let literal = if value.is_null() {
                    String::from("NULL")
                } else {
                    match self.dialect.literal_processor(&column.sql_type, &self.caps) {
                        Some(processor) => processor(value)?,
                        None => value.to_sql_inline()?,
                    }
                };
                spec.push_str(" DEFAULT ");
                spec.push_str(&literal);
            }
            Some(ColumnDefault::Expression(expr)) => {
                spec.push_str(" DEFAULT ");
                spec.push_str(expr);
            }
            Some(ColumnDefault::Sequence(_)) | None => {}
        }
        Ok(spec)
    }

    fn constraint_prefix(&self, name: Option<&String>) -> String {
        name.map_or_else(String::new, |n| {
            format!("CONSTRAINT {} ", self.preparer.quote(&self.preparer.truncate(n)))
        })
    }

    fn quoted_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.preparer.quote(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn foreign_key(
        &self,
        prefix: &str,
        columns: &[String],
        table: &str,
        references: &[String],
        on_delete: Option<ForeignKeyAction>,
        on_update: Option<ForeignKeyAction>,
    ) -> String {
        let mut sql = format!(
            "{prefix}FOREIGN KEY({}) REFERENCES {} ({})",
            self.quoted_list(columns),
            self.preparer.quote_schema(table),
            self.quoted_list(references)
        );
        if let Some(action) = on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(action.as_sql());
        }
        if let Some(action) = on_update {
            sql.push_str(" ON UPDATE ");
            sql.push_str(action.as_sql());
        }
        sql
    }

    fn table_constraints(&self, table: &Table) -> Vec<String> {
        let mut out = Vec::new();

        let pk: Vec<String> = table.primary_key().iter().map(|c| c.name.clone()).collect();
        if !pk.is_empty() {
            let name = table.constraints().iter().find_map(|c| match c {
                Constraint::PrimaryKey { name, .. } => name.as_ref(),
                _ => None,
            });
            out.push(format!(
                "{}PRIMARY KEY ({})",
                self.constraint_prefix(name),
                self.quoted_list(&pk)
            ));
        }

        for column in table.columns() {
            if let Some(fk) = &column.foreign_key {
                out.push(self.foreign_key(
                    "",
                    std::slice::from_ref(&column.name),
                    &fk.table,
                    std::slice::from_ref(&fk.column),
                    None,
                    None,
                ));
            }
        }
        for column in table.columns().iter().filter(|c| c.unique) {
            out.push(format!("UNIQUE ({})", self.preparer.quote(&column.name)));
        }

        for constraint in table.constraints() {
            match constraint {
                Constraint::PrimaryKey { .. } => {}
                Constraint::ForeignKey {
                    name,
                    columns,
                    references_table,
                    references_columns,
                    on_delete,
                    on_update,
                } => out.push(self.foreign_key(
                    &self.constraint_prefix(name.as_ref()),
                    columns,
                    references_table,
                    references_columns,
                    *on_delete,
                    *on_update,
                )),
                Constraint::Unique { name, columns } => out.push(format!(
                    "{}UNIQUE ({})",
                    self.constraint_prefix(name.as_ref()),
                    self.quoted_list(columns)
                )),
                Constraint::Check { name, expression } => out.push(format!(
                    "{}CHECK ({expression})",
                    self.constraint_prefix(name.as_ref())
                )),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Index, Statement};
    use crate::compiler::compile;
    use crate::dialect::{GenericDialect, PostgresDialect};
    use crate::schema::{ColumnDef, Constraint, ForeignKeyAction, Table};
    use crate::types::SqlType;
    use crate::value::SqlValue;

    fn users() -> Table {
        Table::new(
            "users",
            vec![
                ColumnDef::new("id", SqlType::integer()).primary_key(),
                ColumnDef::new("email", SqlType::string(Some(100))).not_null().unique(),
                ColumnDef::new("active", SqlType::boolean()).default_value(SqlValue::Bool(true)),
                ColumnDef::new("created", SqlType::datetime()).server_default("CURRENT_TIMESTAMP"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_create_table() {
        let compiled = compile(&Statement::create_table(&users()), &GenericDialect::new()).unwrap();
        assert_eq!(
            compiled.sql,
            "CREATE TABLE users (\n\
             \tid INTEGER NOT NULL GENERATED BY DEFAULT AS IDENTITY,\n\
             \temail VARCHAR(100) NOT NULL,\n\
             \tactive BOOLEAN DEFAULT TRUE,\n\
             \tcreated TIMESTAMP DEFAULT CURRENT_TIMESTAMP,\n\
             \tPRIMARY KEY (id),\n\
             \tUNIQUE (email)\n\
             )"
        );
    }

    #[test]
    fn test_serial_replaces_type() {
        let compiled = compile(&Statement::create_table(&users()), &PostgresDialect::new()).unwrap();
        assert!(compiled.sql.contains("\tid SERIAL NOT NULL,\n"));
    }

    #[test]
    fn test_table_constraints() {
        let orders = Table::builder("orders")
            .column(ColumnDef::new("id", SqlType::integer()).primary_key().no_autoincrement())
            .column(ColumnDef::new("user_id", SqlType::integer()).references("users", "id"))
            .column(ColumnDef::new("qty", SqlType::integer()))
            .constraint(Constraint::check("qty > 0").named("ck_qty"))
            .constraint(
                Constraint::foreign_key(&["qty"], "dbo.sizes", &["n"])
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .build()
            .unwrap();
        let compiled = compile(&Statement::create_table(&orders), &GenericDialect::new()).unwrap();
        assert!(compiled.sql.contains("\tid INTEGER NOT NULL,\n"));
        assert!(compiled.sql.contains("FOREIGN KEY(user_id) REFERENCES users (id)"));
        assert!(compiled.sql.contains("CONSTRAINT ck_qty CHECK (qty > 0)"));
        assert!(compiled
            .sql
            .contains("FOREIGN KEY(qty) REFERENCES dbo.sizes (n) ON DELETE CASCADE"));
    }

    #[test]
    fn test_drop_and_index() {
        let t = users();
        let drop = Statement::DropTable {
            table: t.clone(),
            if_exists: true,
        };
        assert_eq!(
            compile(&drop, &GenericDialect::new()).unwrap().sql,
            "DROP TABLE IF EXISTS users"
        );

        let index = Index::new("ix_users_email", &t, &["email"]).unwrap().unique();
        assert_eq!(
            compile(&Statement::CreateIndex(index.clone()), &GenericDialect::new())
                .unwrap()
                .sql,
            "CREATE UNIQUE INDEX ix_users_email ON users (email)"
        );
        assert_eq!(
            compile(&Statement::DropIndex(index), &GenericDialect::new())
                .unwrap()
                .sql,
            "DROP INDEX ix_users_email"
        );
    }
}
