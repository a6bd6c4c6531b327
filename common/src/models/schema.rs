//! Schema introspection and mutation models.
//!
//! Table and column descriptors are produced on demand by adapter
//! introspection and never cached; column definitions are the input to
//! the SQLite schema-mutation operations.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Kind of a relation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// Base table.
    Table,
    /// View.
    View,
}

/// Introspected table shape.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TableDescriptor {
    /// Table name.
    pub name: String,
    /// Table or view.
    pub kind: TableKind,
    /// Row count (approximate for PostgreSQL).
    pub row_count: i64,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDescriptor>,
}

/// Introspected column shape.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// Declared data type.
    pub data_type: String,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
    /// Default value expression, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// Column definition for schema-mutation operations.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ColumnDefinition {
    /// Column name.
    #[validate(length(min = 1, max = 128, message = "Column name must be 1-128 characters"))]
    pub name: String,
    /// Declared data type (e.g. TEXT, INTEGER).
    #[validate(length(min = 1, message = "Column type is required"))]
    pub data_type: String,
    /// Whether NULL is allowed.
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Whether the column is the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Default value expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Whether the column auto-increments (implies INTEGER PRIMARY KEY).
    #[serde(default)]
    pub auto_increment: bool,
}

fn default_true() -> bool {
    true
}

/// Request body for creating a table.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTableRequest {
    /// New table name.
    #[validate(length(min = 1, max = 128, message = "Table name must be 1-128 characters"))]
    pub name: String,
    /// Column definitions, at least one.
    #[validate(length(min = 1, message = "At least one column is required"))]
    pub columns: Vec<ColumnDefinition>,
}

/// Request body for renaming a table.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenameTableRequest {
    /// New table name.
    #[validate(length(min = 1, max = 128, message = "Table name must be 1-128 characters"))]
    pub new_name: String,
}
