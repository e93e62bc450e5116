//! Dump Engine (spec.md §4.A): table discovery, filtering, and SQL emission.

pub mod catalog;
pub mod ddl;
pub mod glob;
pub mod value;

use std::io::Write;

use crate::db::Database;
use crate::dialect::{ConnectionInfo, Dialect};
use crate::error::BackupError;
use crate::model::TableDescriptor;
use value::SqlValue;

/// Row batches are flushed once their rendered `INSERT` statement would
/// exceed this many bytes, rather than row-by-row, so a million-row table
/// doesn't emit a million single-row statements.
const INSERT_BATCH_BYTES: usize = 256 * 1024;

pub struct DumpEngine {
    db: Database,
    dialect: Dialect,
    schema: String,
}

impl DumpEngine {
    pub fn connect(
        connection_info: &ConnectionInfo,
        username: &str,
        password: &str,
    ) -> Result<Self, BackupError> {
        let db = Database::connect(connection_info, username, password)?;
        let dialect = db.dialect();
        let schema = connection_info
            .schema
            .clone()
            .unwrap_or_else(|| "public".to_string());
        Ok(Self { db, dialect, schema })
    }

    /// Discover every user table visible to the connection, with full
    /// column and primary-key metadata.
    pub fn discover_tables(&mut self) -> Result<Vec<TableDescriptor>, BackupError> {
        let names = self.db.fetch_table_names()?;
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let columns = self.db.fetch_columns(&name)?;
            let primary_key = self.db.fetch_primary_key(&name)?;
            tables.push(TableDescriptor {
                schema: self.schema.clone(),
                name,
                columns,
                primary_key,
                row_count_estimate: None,
            });
        }
        Ok(tables)
    }

    /// Discover, apply the include/system/exclude filter pipeline, and
    /// return the surviving tables in ascending name order — the exact
    /// table set a dump will emit.
    pub fn discover_filtered_tables(
        &mut self,
        include_patterns: &[String],
        exclude_system_tables: bool,
        exclude_patterns: &[String],
    ) -> Result<Vec<TableDescriptor>, BackupError> {
        let tables = self.discover_tables()?;
        Ok(catalog::apply_filters(
            tables,
            include_patterns,
            exclude_system_tables,
            exclude_patterns,
            self.dialect,
        ))
    }

    /// Write a complete logical dump of `tables` to `out`: the stable header
    /// comment pair from spec.md §6, the dialect preamble, then per table a
    /// DROP, CREATE, and batched INSERT statements in primary-key order,
    /// then the dialect epilogue.
    pub fn dump_tables(
        &mut self,
        tables: &[TableDescriptor],
        out: &mut impl Write,
        generated_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), BackupError> {
        writeln!(
            out,
            "-- {} Database Backup by db-backup4j",
            self.dialect.display_name()
        )
        .map_err(BackupError::WriteFailed)?;
        writeln!(out, "-- Generated: {}", generated_at.to_rfc3339())
            .map_err(BackupError::WriteFailed)?;
        writeln!(out, "{}", self.dialect.preamble()).map_err(BackupError::WriteFailed)?;

        for table in tables {
            writeln!(out).map_err(BackupError::WriteFailed)?;
            writeln!(out, "{}", ddl::render_drop(table, self.dialect)).map_err(BackupError::WriteFailed)?;
            writeln!(out, "{}", ddl::render_create(table, self.dialect)).map_err(BackupError::WriteFailed)?;
            self.dump_table_rows(table, out)?;
        }

        writeln!(out).map_err(BackupError::WriteFailed)?;
        writeln!(out, "{}", self.dialect.epilogue()).map_err(BackupError::WriteFailed)?;
        Ok(())
    }

    fn dump_table_rows(
        &mut self,
        table: &TableDescriptor,
        out: &mut impl Write,
    ) -> Result<(), BackupError> {
        let dialect = self.dialect;
        let column_list: Vec<String> = table
            .columns
            .iter()
            .map(|c| dialect.quote_ident(&c.name))
            .collect();
        let insert_prefix = format!(
            "INSERT INTO {} ({}) VALUES ",
            dialect.quote_qualified(&table.schema, &table.name),
            column_list.join(", ")
        );

        let mut batch: Vec<String> = Vec::new();
        let mut batch_bytes = insert_prefix.len();
        let mut write_err: Option<BackupError> = None;

        self.db.stream_table_rows(
            &table.schema,
            &table.name,
            &table.primary_key,
            |values: Vec<SqlValue>| {
                let row_literal = render_row_tuple(&values, dialect);
                batch_bytes += row_literal.len() + 2;
                batch.push(row_literal);

                if batch_bytes >= INSERT_BATCH_BYTES {
                    if let Err(e) = flush_batch(out, &insert_prefix, &mut batch) {
                        write_err = Some(e);
                    }
                    batch_bytes = insert_prefix.len();
                }
                Ok(())
            },
        )?;

        if let Some(e) = write_err {
            return Err(e);
        }
        flush_batch(out, &insert_prefix, &mut batch)?;
        Ok(())
    }
}

fn render_row_tuple(values: &[SqlValue], dialect: Dialect) -> String {
    let rendered: Vec<String> = values.iter().map(|v| v.to_literal(dialect)).collect();
    format!("({})", rendered.join(", "))
}

fn flush_batch(
    out: &mut impl Write,
    prefix: &str,
    batch: &mut Vec<String>,
) -> Result<(), BackupError> {
    if batch.is_empty() {
        return Ok(());
    }
    writeln!(out, "{prefix}{};", batch.join(", ")).map_err(BackupError::WriteFailed)?;
    batch.clear();
    Ok(())
}
