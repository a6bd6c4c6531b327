//! Dynamic row decoding.
//!
//! Converts driver rows into JSON maps without knowing the schema ahead
//! of time. Decoding is driven by the reported column type; anything
//! unrecognized falls back to a string read and then to NULL.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo};

use common::models::query::Row as JsonRow;

macro_rules! decode_json {
    ($row:expr, $i:expr, $t:ty) => {
        match $row.try_get::<Option<$t>, _>($i) {
            Ok(Some(v)) => serde_json::json!(v),
            Ok(None) => Value::Null,
            Err(_) => Value::Null,
        }
    };
}

/// Converts a PostgreSQL row into an ordered column → JSON value map.
pub fn pg_row_to_map(row: &PgRow) -> JsonRow {
    let mut map = JsonRow::new();
    for column in row.columns() {
        let i = column.ordinal();
        let value = match column.type_info().name() {
            "BOOL" => decode_json!(row, i, bool),
            "INT2" => decode_json!(row, i, i16),
            "INT4" => decode_json!(row, i, i32),
            "INT8" | "OID" => decode_json!(row, i, i64),
            "FLOAT4" => decode_json!(row, i, f32),
            "FLOAT8" => decode_json!(row, i, f64),
            "NUMERIC" => match row.try_get::<Option<Decimal>, _>(i) {
                Ok(Some(v)) => Value::String(v.to_string()),
                _ => Value::Null,
            },
            "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" => {
                decode_json!(row, i, String)
            }
            "UUID" => decode_json!(row, i, uuid::Uuid),
            "JSON" | "JSONB" => decode_json!(row, i, Value),
            "DATE" => decode_json!(row, i, NaiveDate),
            "TIME" => decode_json!(row, i, NaiveTime),
            "TIMESTAMP" => decode_json!(row, i, NaiveDateTime),
            "TIMESTAMPTZ" => decode_json!(row, i, DateTime<Utc>),
            "BYTEA" => match row.try_get::<Option<Vec<u8>>, _>(i) {
                Ok(Some(v)) => Value::String(hex(&v)),
                _ => Value::Null,
            },
            _ => decode_json!(row, i, String),
        };
        map.insert(column.name().to_string(), value);
    }
    map
}

/// Converts a SQLite row into an ordered column → JSON value map.
pub fn sqlite_row_to_map(row: &SqliteRow) -> JsonRow {
    let mut map = JsonRow::new();
    for column in row.columns() {
        let i = column.ordinal();
        let value = match column.type_info().name() {
            "NULL" => Value::Null,
            "INTEGER" => decode_json!(row, i, i64),
            "REAL" => decode_json!(row, i, f64),
            "BOOLEAN" => decode_json!(row, i, bool),
            "BLOB" => match row.try_get::<Option<Vec<u8>>, _>(i) {
                Ok(Some(v)) => Value::String(hex(&v)),
                _ => Value::Null,
            },
            // TEXT and anything declared with an exotic affinity
            _ => decode_json!(row, i, String),
        };
        map.insert(column.name().to_string(), value);
    }
    map
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_renders_bytea_style() {
        assert_eq!(hex(&[0xde, 0xad, 0x01]), "\\xdead01");
        assert_eq!(hex(&[]), "\\x");
    }
}
