//! INSERT, UPDATE and DELETE rendering.

use super::Compilation;
use crate::ast::{BindParam, Delete, Expr, Insert, InsertSource, Update};
use crate::compiled::{IdentitySource, InsertInfo};
use crate::dialect::{MultiValuesStrategy, ReturningStrategy};
use crate::error::Result;
use crate::value::SqlValue;

impl Compilation<'_> {
    pub(super) fn insert(&mut self, insert: &Insert) -> Result<String> {
        let table = &insert.table;
        self.dml_target = Some(table.key());
        let mut sql = format!("INSERT INTO {}", self.preparer.format_table(table, true));
        let autoinc = table.autoincrement_column();

        let explicit_identity = match &insert.source {
            InsertSource::DefaultValues => {
                if self.caps.supports_default_values {
                    sql.push_str(" DEFAULT VALUES");
                } else if self.caps.supports_empty_insert {
                    sql.push_str(" () VALUES ()");
                } else {
                    return Err(self.capability_error(
                        "DEFAULT VALUES",
                        format!("INSERT into {} without values", table.name()),
                    ));
                }
                None
            }
            InsertSource::Values { columns, rows } => {
                if rows.len() > 1
                    && self.dialect.multivalues_strategy(&self.caps) == MultiValuesStrategy::Unsupported
                {
                    return Err(self.capability_error(
                        "multi-row VALUES",
                        format!("{} rows in one INSERT", rows.len()),
                    ));
                }
                sql.push_str(&format!(" ({}) VALUES ", self.column_names(columns)));

                let identity_at =
                    autoinc.and_then(|col| columns.iter().position(|name| *name == col.name));
                let mut bound = Vec::new();
                let mut inline = false;
                let mut rendered = Vec::with_capacity(rows.len());
                for row in rows {
                    let mut values = Vec::with_capacity(row.len());
                    for (i, value) in row.iter().enumerate() {
                        values.push(self.expr(value)?);
                        if identity_at != Some(i) {
                            continue;
                        }
                        match value {
                            Expr::Literal(SqlValue::Null) => {}
                            Expr::Bind(bind) if !self.options.literal_binds => {
                                if let Some(name) = self.rendered_bind_name(bind) {
                                    bound.push(name);
                                }
                            }
                            Expr::Bind(BindParam {
                                value: Some(SqlValue::Null) | None,
                                ..
                            }) => {}
                            _ => inline = true,
                        }
                    }
                    rendered.push(format!("({})", values.join(", ")));
                }
                sql.push_str(&rendered.join(", "));

                if inline {
                    Some(IdentitySource::Inline)
                } else if bound.is_empty() {
                    None
                } else {
                    Some(IdentitySource::Bound(bound))
                }
            }
            InsertSource::Select { columns, query } => {
                sql.push_str(&format!(" ({}) ", self.column_names(columns)));
                sql.push_str(&self.query(query, false)?);
                autoinc
                    .filter(|col| columns.contains(&col.name))
                    .map(|_| IdentitySource::Inline)
            }
        };

        if !insert.returning.is_empty() {
            sql.push_str(&self.returning(&insert.returning)?);
        }

        let postfetch_lastrowid = self.caps.postfetch_lastrowid
            && autoinc.is_some()
            && !self.has_returning
            && explicit_identity.is_none()
            && insert.row_count() <= 1;
        self.insert = Some(InsertInfo {
            table: table.clone(),
            autoincrement_column: autoinc.map(|c| c.name.clone()),
            autoincrement_key: autoinc.map(|c| c.key.clone()),
            explicit_identity,
            postfetch_lastrowid,
        });
        Ok(sql)
    }

    pub(super) fn update(&mut self, update: &Update) -> Result<String> {
        self.dml_target = Some(update.table.key());
        let mut sql = format!("UPDATE {} SET ", self.preparer.format_table(&update.table, true));
        let mut assignments = Vec::with_capacity(update.assignments.len());
        for (name, value) in &update.assignments {
            let value = self.expr(value)?;
            assignments.push(format!("{} = {value}", self.preparer.quote(name)));
        }
        sql.push_str(&assignments.join(", "));
        if let Some(where_clause) = &update.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&self.expr(where_clause)?);
        }
        if !update.returning.is_empty() {
            sql.push_str(&self.returning(&update.returning)?);
        }
        Ok(sql)
    }

    pub(super) fn delete(&mut self, delete: &Delete) -> Result<String> {
        self.dml_target = Some(delete.table.key());
        let mut sql = format!("DELETE FROM {}", self.preparer.format_table(&delete.table, true));
        if let Some(where_clause) = &delete.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&self.expr(where_clause)?);
        }
        if !delete.returning.is_empty() {
            sql.push_str(&self.returning(&delete.returning)?);
        }
        Ok(sql)
    }

    fn column_names(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.preparer.quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn returning(&mut self, exprs: &[Expr]) -> Result<String> {
        if self.dialect.returning_strategy(&self.caps) != ReturningStrategy::Returning {
            return Err(self.capability_error(
                "RETURNING",
                "generated values are fetched after the statement instead",
            ));
        }
        self.has_returning = true;
        Ok(format!(" RETURNING {}", self.columns(exprs, &[], true)?))
    }

    /// The placeholder name most recently given to `bind`.
    fn rendered_bind_name(&self, bind: &BindParam) -> Option<String> {
        let index = if bind.unique {
            self.binds.len().checked_sub(1)?
        } else {
            *self.named_binds.get(&self.preparer.truncate(&bind.key))?
        };
        self.binds.get(index).map(|b| b.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Delete, Expr, Insert, Statement, Update, func, select};
    use crate::compiled::IdentitySource;
    use crate::compiler::{CompileOptions, Compiler, compile};
    use crate::dialect::{GenericDialect, PostgresDialect};
    use crate::error::SqlError;
    use crate::schema::{ColumnDef, Table};
    use crate::types::SqlType;

    fn users() -> Table {
        Table::new(
            "users",
            vec![
                ColumnDef::new("id", SqlType::integer()).primary_key(),
                ColumnDef::new("name", SqlType::string(Some(50))),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_insert_values() {
        let t = users();
        let insert = Insert::into_table(&t).value("name", "bob").build().unwrap();
        let compiled = compile(&insert.into(), &GenericDialect::new()).unwrap();
        assert_eq!(compiled.sql, "INSERT INTO users (name) VALUES (?)");
        let info = compiled.insert.unwrap();
        assert_eq!(info.autoincrement_column.as_deref(), Some("id"));
        assert_eq!(info.explicit_identity, None);
    }

    #[test]
    fn test_insert_multiple_rows() {
        let t = users();
        let insert = Insert::into_table(&t)
            .values(vec![("name", "a")])
            .values(vec![("name", "b")])
            .build()
            .unwrap();
        let compiled = compile(&insert.into(), &PostgresDialect::new()).unwrap();
        assert_eq!(compiled.sql, "INSERT INTO users (name) VALUES ($1), ($2)");
        assert_eq!(compiled.bind_names().collect::<Vec<_>>(), vec!["name_m0", "name_m1"]);
    }

    #[test]
    fn test_explicit_identity_is_recorded() {
        let t = users();
        let insert = Insert::into_table(&t)
            .values(vec![("id", 5)])
            .build()
            .unwrap();
        let compiled = compile(&insert.into(), &GenericDialect::new()).unwrap();
        assert_eq!(
            compiled.insert.unwrap().explicit_identity,
            Some(IdentitySource::Bound(vec![String::from("id")]))
        );

        let insert = Insert::into_table(&t)
            .value("id", Expr::from(func("next_id", vec![])))
            .build()
            .unwrap();
        let compiled = compile(&insert.into(), &GenericDialect::new()).unwrap();
        assert_eq!(compiled.sql, "INSERT INTO users (id) VALUES (next_id())");
        assert_eq!(
            compiled.insert.unwrap().explicit_identity,
            Some(IdentitySource::Inline)
        );
    }

    #[test]
    fn test_literal_insert_marks_identity_inline() {
        let t = users();
        let insert = Insert::into_table(&t).value("id", 5).build().unwrap();
        let compiled = Compiler::new(&GenericDialect::new())
            .with_options(CompileOptions {
                literal_binds: true,
            })
            .compile(&insert.into())
            .unwrap();
        assert_eq!(compiled.sql, "INSERT INTO users (id) VALUES (5)");
        assert_eq!(
            compiled.insert.unwrap().explicit_identity,
            Some(IdentitySource::Inline)
        );
    }

    #[test]
    fn test_default_values() {
        let insert = Insert::into_table(&users()).build().unwrap();
        let compiled = compile(&insert.into(), &GenericDialect::new()).unwrap();
        assert_eq!(compiled.sql, "INSERT INTO users DEFAULT VALUES");
    }

    #[test]
    fn test_insert_from_select() {
        let t = users();
        let src = Table::new("staging", vec![ColumnDef::new("name", SqlType::string(Some(50)))])
            .unwrap();
        let insert = Insert::into_table(&t)
            .from_select(&["name"], select(vec![src.c("name")]))
            .build()
            .unwrap();
        let compiled = compile(&insert.into(), &GenericDialect::new()).unwrap();
        assert_eq!(
            compiled.sql,
            "INSERT INTO users (name) SELECT staging.name FROM staging"
        );
        assert!(compiled.result_columns.is_empty());
    }

    #[test]
    fn test_returning_requires_support() {
        let t = users();
        let insert = Insert::into_table(&t)
            .value("name", "bob")
            .returning(vec![t.c("id")])
            .build()
            .unwrap();
        let stmt: Statement = insert.into();
        let err = compile(&stmt, &GenericDialect::new()).unwrap_err();
        assert!(matches!(err, SqlError::CapabilityViolation { capability: "RETURNING", .. }));

        let compiled = compile(&stmt, &PostgresDialect::new()).unwrap();
        assert_eq!(
            compiled.sql,
            "INSERT INTO users (name) VALUES ($1) RETURNING users.id"
        );
        assert!(compiled.has_returning);
        assert!(!compiled.insert.unwrap().postfetch_lastrowid);
        assert_eq!(compiled.result_columns.len(), 1);
    }

    #[test]
    fn test_update_and_delete() {
        let t = users();
        let update = Update::table(&t)
            .set("name", "carol")
            .where_clause(t.c("id").eq(3))
            .build()
            .unwrap();
        let compiled = compile(&update.into(), &GenericDialect::new()).unwrap();
        assert_eq!(compiled.sql, "UPDATE users SET name = ? WHERE users.id = ?");
        assert_eq!(compiled.bind_names().collect::<Vec<_>>(), vec!["name", "id"]);

        let delete = Delete::from_table(&t).where_clause(t.c("id").eq(3));
        let compiled = compile(&delete.into(), &GenericDialect::new()).unwrap();
        assert_eq!(compiled.sql, "DELETE FROM users WHERE users.id = ?");
    }
}
