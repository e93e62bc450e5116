//! Catalog queries and the table-name filter pipeline (spec.md §4.A).
//!
//! Filter order is fixed: include patterns (if any are given, a table must
//! match at least one) are applied first, then `excludeSystemTables`, then
//! explicit exclude patterns — after which the surviving tables are emitted
//! in ascending name order.

use crate::dialect::Dialect;
use crate::dump::glob::matches_any;
use crate::model::TableDescriptor;

/// Query enumerating user tables in the target schema, per dialect.
/// `excludeSystemTables` is applied in Rust against [`Dialect::system_table_patterns`]
/// rather than folded into the SQL, so the same query works whether or not
/// that option is set.
pub fn list_tables_query(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::MySql => {
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'"
        }
        Dialect::Postgres => {
            "SELECT tablename AS table_name FROM pg_catalog.pg_tables \
             WHERE schemaname = $1"
        }
    }
}

/// Query enumerating a table's columns in declaration order, per dialect.
pub fn list_columns_query(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::MySql => {
            "SELECT column_name, column_type, is_nullable, column_default \
             FROM information_schema.columns \
             WHERE table_schema = DATABASE() AND table_name = ? \
             ORDER BY ordinal_position"
        }
        Dialect::Postgres => {
            "SELECT column_name, data_type, is_nullable, column_default \
             FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 \
             ORDER BY ordinal_position"
        }
    }
}

/// Apply the three-stage filter pipeline to a discovered table list,
/// returning the surviving tables in ascending name order.
pub fn apply_filters(
    mut tables: Vec<TableDescriptor>,
    include_patterns: &[String],
    exclude_system_tables: bool,
    exclude_patterns: &[String],
    dialect: Dialect,
) -> Vec<TableDescriptor> {
    tables.retain(|t| {
        if include_patterns.is_empty() {
            true
        } else {
            matches_any(include_patterns, &t.name) || matches_any(include_patterns, &t.qualified_name())
        }
    });

    if exclude_system_tables {
        let system_patterns = dialect.system_table_patterns();
        tables.retain(|t| {
            !system_patterns
                .iter()
                .any(|p| glob_match_qualified(p, t))
        });
    }

    tables.retain(|t| {
        !matches_any(exclude_patterns, &t.name) && !matches_any(exclude_patterns, &t.qualified_name())
    });

    tables.sort_by(|a, b| a.name.cmp(&b.name));
    tables
}

fn glob_match_qualified(pattern: &str, table: &TableDescriptor) -> bool {
    crate::dump::glob::glob_match(pattern, &table.name)
        || crate::dump::glob::glob_match(pattern, &table.qualified_name())
}
