//! PostgreSQL adapter.
//!
//! Wraps a remote PostgreSQL server behind the uniform adapter
//! operations. Each adapter instance carries its own lazily-connected
//! single-connection pool; nothing survives the request.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use common::config::AppConfig;
use common::errors::{classify_backend_error, AppResult};
use common::models::connection::PostgresConfig;
use common::models::query::{QueryResult, TableDataResult};
use common::models::schema::{ColumnDescriptor, TableDescriptor, TableKind};

use super::value::pg_row_to_map;
use super::{quote_ident, DatabaseAdapter, TestReport};

/// Adapter over one PostgreSQL database.
pub struct PostgresAdapter {
    pool: PgPool,
    ssl: bool,
}

impl PostgresAdapter {
    /// Builds an adapter for the given config. The pool connects lazily;
    /// the first operation surfaces any connection failure.
    pub fn new(config: &PostgresConfig, app: &AppConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(app.max_connections)
            .acquire_timeout(Duration::from_secs(app.connect_timeout_secs))
            .connect_lazy(&config.to_url())
            .map_err(|e| classify_backend_error(&e))?;
        Ok(Self {
            pool,
            ssl: config.ssl,
        })
    }

    async fn columns_for(&self, table: &str) -> AppResult<Vec<ColumnDescriptor>> {
        let rows = sqlx::query(
            "SELECT c.column_name,
                    c.data_type,
                    c.is_nullable = 'YES' AS nullable,
                    c.column_default,
                    EXISTS (
                        SELECT 1
                        FROM information_schema.table_constraints tc
                        JOIN information_schema.key_column_usage kcu
                          ON kcu.constraint_name = tc.constraint_name
                         AND kcu.table_schema = tc.table_schema
                        WHERE tc.table_schema = 'public'
                          AND tc.table_name = c.table_name
                          AND tc.constraint_type = 'PRIMARY KEY'
                          AND kcu.column_name = c.column_name
                    ) AS primary_key
             FROM information_schema.columns c
             WHERE c.table_schema = 'public' AND c.table_name = $1
             ORDER BY c.ordinal_position",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify_backend_error(&e))?;

        Ok(rows
            .iter()
            .map(|row| ColumnDescriptor {
                name: row.get("column_name"),
                data_type: row.get("data_type"),
                nullable: row.get("nullable"),
                primary_key: row.get("primary_key"),
                default_value: row.get("column_default"),
            })
            .collect())
    }
}

#[async_trait]
impl DatabaseAdapter for PostgresAdapter {
    async fn test_connection(&self) -> AppResult<TestReport> {
        let start = Instant::now();

        let version: String = sqlx::query_scalar("SELECT version()")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify_backend_error(&e))?;

        let database_size: String =
            sqlx::query_scalar("SELECT pg_size_pretty(pg_database_size(current_database()))")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| classify_backend_error(&e))?;

        let table_count: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM information_schema.tables WHERE table_schema = 'public'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify_backend_error(&e))?;

        Ok(TestReport {
            server_version: version,
            database_size,
            table_count,
            ssl: self.ssl,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn get_tables(&self) -> AppResult<Vec<TableDescriptor>> {
        let rows = sqlx::query(
            "SELECT t.table_name,
                    t.table_type,
                    COALESCE(s.n_tup_ins - s.n_tup_del, 0)::bigint AS row_estimate
             FROM information_schema.tables t
             LEFT JOIN pg_stat_user_tables s
               ON s.relname = t.table_name AND s.schemaname = 'public'
             WHERE t.table_schema = 'public'
               AND t.table_type IN ('BASE TABLE', 'VIEW')
             ORDER BY t.table_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify_backend_error(&e))?;

        // One column-metadata query per table. O(tables) round trips,
        // unbatched on purpose.
        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.get("table_name");
            let table_type: String = row.get("table_type");
            let columns = self.columns_for(&name).await?;
            tables.push(TableDescriptor {
                kind: if table_type == "VIEW" {
                    TableKind::View
                } else {
                    TableKind::Table
                },
                row_count: row.get("row_estimate"),
                name,
                columns,
            });
        }
        Ok(tables)
    }

    async fn get_table_data(
        &self,
        table: &str,
        limit: i64,
        offset: i64,
    ) -> AppResult<TableDataResult> {
        let ident = quote_ident(table);

        let total: i64 = sqlx::query_scalar(&format!("SELECT count(*) FROM {ident}"))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify_backend_error(&e))?;

        // Ordering by ordinal position 1, not necessarily the primary key.
        let rows = sqlx::query(&format!(
            "SELECT * FROM {ident} ORDER BY 1 LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify_backend_error(&e))?;

        let rows: Vec<_> = rows.iter().map(pg_row_to_map).collect();
        Ok(TableDataResult {
            columns: rows
                .first()
                .map(|r| r.keys().cloned().collect())
                .unwrap_or_default(),
            rows,
            total,
            limit,
            offset,
        })
    }

    async fn execute_query(&self, sql: &str) -> AppResult<QueryResult> {
        let start = Instant::now();
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify_backend_error(&e))?;
        let elapsed = start.elapsed().as_millis() as u64;

        let rows: Vec<_> = rows.iter().map(pg_row_to_map).collect();
        Ok(QueryResult::from_rows(rows, elapsed))
    }
}
