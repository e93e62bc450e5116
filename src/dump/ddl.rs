//! CREATE TABLE statement rendering (spec.md §4.A).
//!
//! The dump engine captures column metadata during discovery, not a
//! driver-native `SHOW CREATE TABLE`/`pg_dump`-style definition, so DDL is
//! reconstructed from [`TableDescriptor`] rather than fetched verbatim —
//! the inverse of the teacher's DDL-extraction regex, now generating text
//! instead of parsing it.

use crate::dialect::Dialect;
use crate::model::{ColumnDescriptor, TableDescriptor};

/// Render `DROP TABLE IF EXISTS ...;` for `table`.
pub fn render_drop(table: &TableDescriptor, dialect: Dialect) -> String {
    format!(
        "DROP TABLE IF EXISTS {};",
        dialect.quote_qualified(&table.schema, &table.name)
    )
}

/// Render `CREATE TABLE ...` including column definitions and an inline
/// primary key constraint when one was captured.
pub fn render_create(table: &TableDescriptor, dialect: Dialect) -> String {
    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|c| render_column(c, dialect))
        .collect();

    if table.has_primary_key() {
        let quoted_cols: Vec<String> = table
            .primary_key
            .iter()
            .map(|c| dialect.quote_ident(c))
            .collect();
        lines.push(format!("PRIMARY KEY ({})", quoted_cols.join(", ")));
    }

    format!(
        "CREATE TABLE {} (\n  {}\n);",
        dialect.quote_qualified(&table.schema, &table.name),
        lines.join(",\n  ")
    )
}

fn render_column(column: &ColumnDescriptor, dialect: Dialect) -> String {
    let mut parts = vec![dialect.quote_ident(&column.name), column.sql_type.clone()];

    if !column.nullable {
        parts.push("NOT NULL".to_string());
    }

    if let Some(default) = &column.default {
        parts.push(format!("DEFAULT {default}"));
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> TableDescriptor {
        TableDescriptor {
            schema: "public".into(),
            name: "users".into(),
            columns: vec![
                ColumnDescriptor {
                    name: "id".into(),
                    sql_type: "INTEGER".into(),
                    nullable: false,
                    default: None,
                },
                ColumnDescriptor {
                    name: "email".into(),
                    sql_type: "VARCHAR(255)".into(),
                    nullable: true,
                    default: Some("NULL".into()),
                },
            ],
            primary_key: vec!["id".into()],
            row_count_estimate: Some(2),
        }
    }

    #[test]
    fn drop_statement_is_guarded() {
        let stmt = render_drop(&sample_table(), Dialect::Postgres);
        assert_eq!(stmt, r#"DROP TABLE IF EXISTS "public"."users";"#);
    }

    #[test]
    fn create_statement_includes_not_null_and_primary_key() {
        let stmt = render_create(&sample_table(), Dialect::MySql);
        assert!(stmt.contains("`id` INTEGER NOT NULL"));
        assert!(stmt.contains("`email` VARCHAR(255) DEFAULT NULL"));
        assert!(stmt.contains("PRIMARY KEY (`id`)"));
    }

    #[test]
    fn create_statement_omits_primary_key_clause_when_absent() {
        let mut table = sample_table();
        table.primary_key.clear();
        let stmt = render_create(&table, Dialect::Postgres);
        assert!(!stmt.contains("PRIMARY KEY"));
    }
}
