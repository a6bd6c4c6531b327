//! SQL query models.
//!
//! Contains models for ad-hoc SQL execution and paged table browsing.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// A row as an ordered column-name → value mapping. Relies on
/// serde_json's `preserve_order` feature: keys keep insertion order, so
/// columns stay in SELECT order rather than sorting alphabetically.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Request body for executing a SQL statement.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct QueryRequest {
    /// SQL statement to execute, passed to the backend verbatim.
    #[validate(length(min = 1, message = "SQL statement is required"))]
    pub sql: String,
}

/// Result of a SQL execution.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryResult {
    /// Column names in result order (keys of the first row; empty when
    /// the statement returned no rows).
    pub columns: Vec<String>,

    /// Row data.
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<Row>,

    /// Number of rows returned.
    pub row_count: usize,

    /// Query execution time in milliseconds.
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Builds a result from rows, deriving columns from the first row.
    pub fn from_rows(rows: Vec<Row>, execution_time_ms: u64) -> Self {
        let columns = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            columns,
            row_count: rows.len(),
            rows,
            execution_time_ms,
        }
    }
}

/// Paged slice of a table, for the data browser.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TableDataResult {
    /// Column names in result order.
    pub columns: Vec<String>,

    /// Row data for the requested page.
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<Row>,

    /// Total row count of the table.
    pub total: i64,

    /// Page size used.
    pub limit: i64,

    /// Page offset used.
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_derive_from_first_row() {
        let mut row = Row::new();
        row.insert("id".into(), serde_json::json!(1));
        row.insert("name".into(), serde_json::json!("a"));
        let result = QueryResult::from_rows(vec![row], 3);
        assert_eq!(result.columns, vec!["id", "name"]);
        assert_eq!(result.row_count, 1);
    }

    #[test]
    fn columns_keep_select_order_not_alphabetical() {
        let mut row = Row::new();
        row.insert("zeta".into(), serde_json::json!(1));
        row.insert("alpha".into(), serde_json::json!(2));
        let result = QueryResult::from_rows(vec![row], 0);
        assert_eq!(result.columns, vec!["zeta", "alpha"]);
    }

    #[test]
    fn empty_result_has_no_columns() {
        let result = QueryResult::from_rows(vec![], 0);
        assert!(result.columns.is_empty());
        assert_eq!(result.row_count, 0);
    }
}
