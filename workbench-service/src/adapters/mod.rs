//! Backend driver adapters.
//!
//! Each adapter wraps one database backend behind the same operation set.
//! Adapters are stateless across requests: every instance owns a fresh
//! single-connection pool and nothing is cached or shared between calls.

pub mod postgres;
pub mod sqlite;
pub mod value;

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

use common::config::AppConfig;
use common::errors::AppResult;
use common::models::connection::ConnectionConfig;
use common::models::query::{QueryResult, TableDataResult};
use common::models::schema::TableDescriptor;

pub use postgres::PostgresAdapter;
pub use sqlite::SqliteAdapter;

/// Uniform operation set over one database backend.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Probes the backend and gathers server facts.
    async fn test_connection(&self) -> AppResult<TestReport>;

    /// Introspects all tables and views with their columns. Re-queries
    /// the backend on every call; one extra round trip per table.
    async fn get_tables(&self) -> AppResult<Vec<TableDescriptor>>;

    /// Returns one page of a table, ordered by the first column.
    async fn get_table_data(
        &self,
        table: &str,
        limit: i64,
        offset: i64,
    ) -> AppResult<TableDataResult>;

    /// Executes caller-supplied SQL verbatim. No allow-list: the caller
    /// is trusted.
    async fn execute_query(&self, sql: &str) -> AppResult<QueryResult>;
}

/// Successful connection-test payload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TestReport {
    /// Server version string.
    pub server_version: String,
    /// Human-formatted database size.
    pub database_size: String,
    /// Number of user tables.
    pub table_count: i64,
    /// Whether the connection uses TLS.
    pub ssl: bool,
    /// Probe round-trip time in milliseconds.
    pub latency_ms: u64,
}

/// Builds the adapter matching the supplied connection config.
pub fn adapter_for(
    config: &ConnectionConfig,
    app: &AppConfig,
) -> AppResult<Box<dyn DatabaseAdapter>> {
    match config {
        ConnectionConfig::Postgres(pg) => Ok(Box::new(PostgresAdapter::new(pg, app)?)),
        ConnectionConfig::Sqlite(sq) => Ok(Box::new(SqliteAdapter::open(&sq.file_path)?)),
    }
}

/// Quotes an identifier for interpolation into SQL.
///
/// Table and column names arrive from the client and cannot be bound as
/// parameters, so they are double-quoted with embedded quotes doubled.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idents_are_double_quoted() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
