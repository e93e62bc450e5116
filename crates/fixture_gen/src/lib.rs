//! Deterministic synthetic table/row generator.
//!
//! Produces small in-memory schemas and row sets so the dump engine's
//! value-serialization and row-batching logic can be exercised by property
//! tests without a live database connection.

use chrono::{NaiveDate, NaiveDateTime};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A generated scalar value, loosely typed the way a DB driver row would be.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    BigInt,
    Float,
    Bool,
    Varchar(u32),
    Text,
    Blob,
    Timestamp,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Option<String>,
    pub rows: Vec<Vec<Value>>,
}

const NAME_POOL: &[&str] = &[
    "users", "orders", "order_items", "products", "categories", "invoices", "payments",
    "audit_log", "sessions", "temp_cache",
];

/// Generate a deterministic set of synthetic tables keyed by `seed`.
///
/// Same `seed` + same `num_tables` + same `rows_per_table` always yields
/// byte-identical output, which is what makes this useful for property
/// tests that replay the same fixture through multiple code paths.
pub fn generate_schema(seed: u64, num_tables: usize, rows_per_table: usize) -> Vec<Table> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut tables = Vec::with_capacity(num_tables);

    for i in 0..num_tables {
        let name = NAME_POOL[i % NAME_POOL.len()].to_string();
        let name = if i >= NAME_POOL.len() {
            format!("{name}_{}", i / NAME_POOL.len())
        } else {
            name
        };

        let columns = vec![
            Column {
                name: "id".to_string(),
                ty: ColumnType::BigInt,
                nullable: false,
            },
            Column {
                name: "label".to_string(),
                ty: ColumnType::Varchar(255),
                nullable: false,
            },
            Column {
                name: "score".to_string(),
                ty: ColumnType::Float,
                nullable: true,
            },
            Column {
                name: "active".to_string(),
                ty: ColumnType::Bool,
                nullable: false,
            },
            Column {
                name: "notes".to_string(),
                ty: ColumnType::Text,
                nullable: true,
            },
            Column {
                name: "created_at".to_string(),
                ty: ColumnType::Timestamp,
                nullable: false,
            },
        ];

        let mut rows = Vec::with_capacity(rows_per_table);
        for row_id in 0..rows_per_table {
            rows.push(generate_row(&mut rng, row_id as i64));
        }

        tables.push(Table {
            name,
            columns,
            primary_key: Some("id".to_string()),
            rows,
        });
    }

    tables
}

fn generate_row(rng: &mut ChaCha8Rng, id: i64) -> Vec<Value> {
    let label = random_text(rng, 8..24);
    let score = if rng.random_bool(0.15) {
        Value::Null
    } else {
        Value::Float((rng.random::<f64>() * 1000.0 * 100.0).round() / 100.0)
    };
    let active = Value::Bool(rng.random_bool(0.7));
    let notes = if rng.random_bool(0.3) {
        Value::Null
    } else {
        Value::Text(random_text_with_specials(rng))
    };
    let base = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let created_at = Value::Timestamp(base + chrono::Duration::seconds(rng.random_range(0..31_536_000)));

    vec![
        Value::Int(id),
        Value::Text(label),
        score,
        active,
        notes,
        created_at,
    ]
}

fn random_text(rng: &mut ChaCha8Rng, len_range: std::ops::Range<u32>) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 ";
    let len = rng.random_range(len_range);
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Text containing characters that exercise dialect-specific escaping:
/// single quotes, backslashes, and embedded newlines.
fn random_text_with_specials(rng: &mut ChaCha8Rng) -> String {
    let base = random_text(rng, 4..16);
    match rng.random_range(0..4) {
        0 => format!("it's {base}"),
        1 => format!("{base}\\n{base}"),
        2 => format!("{base}\n{base}"),
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_seed() {
        let a = generate_schema(42, 3, 10);
        let b = generate_schema(42, 3, 10);
        assert_eq!(a.len(), b.len());
        for (ta, tb) in a.iter().zip(b.iter()) {
            assert_eq!(ta.name, tb.name);
            assert_eq!(ta.rows.len(), tb.rows.len());
            assert_eq!(ta.rows, tb.rows);
        }
    }

    #[test]
    fn differs_across_seeds() {
        let a = generate_schema(1, 2, 5);
        let b = generate_schema(2, 2, 5);
        assert_ne!(a[0].rows, b[0].rows);
    }

    #[test]
    fn wraps_name_pool_beyond_catalog() {
        let tables = generate_schema(7, NAME_POOL.len() + 2, 1);
        assert_eq!(tables.len(), NAME_POOL.len() + 2);
        assert!(tables[NAME_POOL.len()].name.ends_with("_1"));
    }
}
