//! SQLite adapter.
//!
//! Mirrors the PostgreSQL read path over a local database file and adds
//! the schema-mutation operations. Column modification and removal use
//! the shadow-table rebuild pattern because SQLite cannot alter columns
//! in place; every rebuild runs inside one transaction so a failure
//! leaves the original table untouched.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqlitePoolOptions};
use sqlx::{Row, SqlitePool, Transaction};

use common::errors::{classify_backend_error, AppError, AppResult};
use common::models::query::{QueryResult, TableDataResult};
use common::models::schema::{ColumnDefinition, ColumnDescriptor, TableDescriptor, TableKind};

use super::value::sqlite_row_to_map;
use super::{quote_ident, DatabaseAdapter, TestReport};

/// Adapter over one SQLite database file.
pub struct SqliteAdapter {
    pool: SqlitePool,
}

impl SqliteAdapter {
    /// Opens the database file at `path`. The file must already exist
    /// (uploads create it); the pool connects lazily.
    pub fn open(path: &str) -> AppResult<Self> {
        Self::from_url(&format!("sqlite:{path}"))
    }

    /// Opens any sqlx SQLite URL (tests use `sqlite::memory:`).
    pub fn from_url(url: &str) -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_lazy(url)
            .map_err(|e| classify_backend_error(&e))?;
        Ok(Self { pool })
    }

    async fn table_columns<'e, E>(executor: E, table: &str) -> AppResult<Vec<ColumnDescriptor>>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_ident(table)))
            .fetch_all(executor)
            .await
            .map_err(|e| classify_backend_error(&e))?;

        Ok(rows
            .iter()
            .map(|row| ColumnDescriptor {
                name: row.get("name"),
                data_type: row.get("type"),
                nullable: row.get::<i64, _>("notnull") == 0,
                primary_key: row.get::<i64, _>("pk") > 0,
                default_value: row.get("dflt_value"),
            })
            .collect())
    }

    /// Creates a new table from column definitions.
    pub async fn create_table(&self, name: &str, columns: &[ColumnDefinition]) -> AppResult<()> {
        let sql = create_table_sql(name, columns);
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_backend_error(&e))?;
        tracing::info!(table = name, "table created");
        Ok(())
    }

    /// Renames a table.
    pub async fn rename_table(&self, old: &str, new: &str) -> AppResult<()> {
        let sql = format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_ident(old),
            quote_ident(new)
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_backend_error(&e))?;
        tracing::info!(from = old, to = new, "table renamed");
        Ok(())
    }

    /// Drops a table.
    pub async fn drop_table(&self, name: &str) -> AppResult<()> {
        sqlx::query(&format!("DROP TABLE {}", quote_ident(name)))
            .execute(&self.pool)
            .await
            .map_err(|e| classify_backend_error(&e))?;
        tracing::info!(table = name, "table dropped");
        Ok(())
    }

    /// Appends a column to a table.
    pub async fn add_column(&self, table: &str, column: &ColumnDefinition) -> AppResult<()> {
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {}",
            quote_ident(table),
            column_sql(column, false)
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_backend_error(&e))?;
        tracing::info!(table, column = %column.name, "column added");
        Ok(())
    }

    /// Replaces a column definition via shadow-table rebuild.
    ///
    /// The target definition may carry a new name. Atomic: commits only
    /// after the shadow table has fully replaced the original.
    pub async fn modify_column(
        &self,
        table: &str,
        column: &str,
        definition: &ColumnDefinition,
    ) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify_backend_error(&e))?;

        let existing = Self::table_columns(&mut *tx, table).await?;
        if !existing.iter().any(|c| c.name == column) {
            return Err(AppError::NotFound(format!("column {column} in {table}")));
        }

        let targets: Vec<ColumnDefinition> = existing
            .iter()
            .map(|c| {
                if c.name == column {
                    definition.clone()
                } else {
                    descriptor_to_definition(c)
                }
            })
            .collect();

        let source_names: Vec<String> = existing.iter().map(|c| quote_ident(&c.name)).collect();
        let target_names: Vec<String> = targets.iter().map(|c| quote_ident(&c.name)).collect();

        rebuild(&mut tx, table, &targets, &target_names, &source_names).await?;

        tx.commit().await.map_err(|e| classify_backend_error(&e))?;
        tracing::info!(table, column, new = %definition.name, "column modified");
        Ok(())
    }

    /// Removes a column via shadow-table rebuild. Atomic.
    pub async fn drop_column(&self, table: &str, column: &str) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify_backend_error(&e))?;

        let existing = Self::table_columns(&mut *tx, table).await?;
        if !existing.iter().any(|c| c.name == column) {
            return Err(AppError::NotFound(format!("column {column} in {table}")));
        }
        if existing.len() == 1 {
            return Err(AppError::Validation(
                "cannot drop the only column of a table".into(),
            ));
        }

        let kept: Vec<&ColumnDescriptor> =
            existing.iter().filter(|c| c.name != column).collect();
        let targets: Vec<ColumnDefinition> =
            kept.iter().map(|c| descriptor_to_definition(c)).collect();
        let names: Vec<String> = kept.iter().map(|c| quote_ident(&c.name)).collect();

        rebuild(&mut tx, table, &targets, &names, &names).await?;

        tx.commit().await.map_err(|e| classify_backend_error(&e))?;
        tracing::info!(table, column, "column dropped");
        Ok(())
    }
}

/// Shadow-table rebuild: create the shadow with the target schema, copy
/// the data across, drop the original and rename the shadow into place.
/// Runs on the caller's transaction; any error rolls everything back.
async fn rebuild(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    targets: &[ColumnDefinition],
    target_names: &[String],
    source_names: &[String],
) -> AppResult<()> {
    let shadow = format!("{table}__rebuild");

    sqlx::query(&create_table_sql(&shadow, targets))
        .execute(&mut **tx)
        .await
        .map_err(|e| classify_backend_error(&e))?;

    sqlx::query(&format!(
        "INSERT INTO {} ({}) SELECT {} FROM {}",
        quote_ident(&shadow),
        target_names.join(", "),
        source_names.join(", "),
        quote_ident(table)
    ))
    .execute(&mut **tx)
    .await
    .map_err(|e| classify_backend_error(&e))?;

    sqlx::query(&format!("DROP TABLE {}", quote_ident(table)))
        .execute(&mut **tx)
        .await
        .map_err(|e| classify_backend_error(&e))?;

    sqlx::query(&format!(
        "ALTER TABLE {} RENAME TO {}",
        quote_ident(&shadow),
        quote_ident(table)
    ))
    .execute(&mut **tx)
    .await
    .map_err(|e| classify_backend_error(&e))?;

    Ok(())
}

fn create_table_sql(name: &str, columns: &[ColumnDefinition]) -> String {
    // A composite primary key must be a table-level constraint; SQLite
    // rejects more than one per-column PRIMARY KEY clause.
    let composite = columns
        .iter()
        .filter(|c| c.primary_key && !c.auto_increment)
        .count()
        > 1;
    let mut defs: Vec<String> = columns.iter().map(|c| column_sql(c, composite)).collect();
    if composite {
        let keys: Vec<String> = columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| quote_ident(&c.name))
            .collect();
        defs.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }
    format!("CREATE TABLE {} ({})", quote_ident(name), defs.join(", "))
}

fn column_sql(def: &ColumnDefinition, suppress_pk: bool) -> String {
    if def.auto_increment {
        return format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote_ident(&def.name));
    }
    let mut sql = format!("{} {}", quote_ident(&def.name), def.data_type)
        .trim_end()
        .to_string();
    if def.primary_key && !suppress_pk {
        sql.push_str(" PRIMARY KEY");
    }
    if !def.nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &def.default_value {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    sql
}

fn descriptor_to_definition(c: &ColumnDescriptor) -> ColumnDefinition {
    ColumnDefinition {
        name: c.name.clone(),
        data_type: c.data_type.clone(),
        nullable: c.nullable,
        primary_key: c.primary_key,
        default_value: c.default_value.clone(),
        auto_increment: false,
    }
}

/// Human-formatted byte size, in the spirit of `pg_size_pretty`.
fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["bytes", "kB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} bytes")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    async fn test_connection(&self) -> AppResult<TestReport> {
        let start = Instant::now();

        let version: String = sqlx::query_scalar("SELECT sqlite_version()")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify_backend_error(&e))?;

        let size_bytes: i64 = sqlx::query_scalar(
            "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify_backend_error(&e))?;

        let table_count: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify_backend_error(&e))?;

        Ok(TestReport {
            server_version: format!("SQLite {version}"),
            database_size: format_bytes(size_bytes),
            table_count,
            ssl: false,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn get_tables(&self) -> AppResult<Vec<TableDescriptor>> {
        let rows = sqlx::query(
            "SELECT name, type FROM sqlite_master
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify_backend_error(&e))?;

        // One COUNT plus one PRAGMA per table, mirroring the PostgreSQL
        // adapter's per-table round trips.
        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.get("name");
            let kind: String = row.get("type");

            let row_count: i64 =
                sqlx::query_scalar(&format!("SELECT count(*) FROM {}", quote_ident(&name)))
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| classify_backend_error(&e))?;

            let columns = Self::table_columns(&self.pool, &name).await?;
            tables.push(TableDescriptor {
                kind: if kind == "view" {
                    TableKind::View
                } else {
                    TableKind::Table
                },
                name,
                row_count,
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

        let rows = sqlx::query(&format!(
            "SELECT * FROM {ident} ORDER BY 1 LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify_backend_error(&e))?;

        let rows: Vec<_> = rows.iter().map(sqlite_row_to_map).collect();
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

        let rows: Vec<_> = rows.iter().map(sqlite_row_to_map).collect();
        Ok(QueryResult::from_rows(rows, elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, data_type: &str) -> ColumnDefinition {
        ColumnDefinition {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
            default_value: None,
            auto_increment: false,
        }
    }

    async fn adapter_with_users() -> SqliteAdapter {
        let adapter = SqliteAdapter::from_url("sqlite::memory:").unwrap();
        let id = ColumnDefinition {
            auto_increment: true,
            ..column("id", "INTEGER")
        };
        let name = ColumnDefinition {
            nullable: false,
            ..column("name", "TEXT")
        };
        adapter
            .create_table("users", &[id, name, column("age", "INTEGER")])
            .await
            .unwrap();
        for (name, age) in [("ann", 31), ("bob", 42), ("cid", 27), ("dee", 35)] {
            adapter
                .execute_query(&format!("INSERT INTO users (name, age) VALUES ('{name}', {age})"))
                .await
                .unwrap();
        }
        adapter
    }

    #[tokio::test]
    async fn test_connection_reports_version() {
        let adapter = adapter_with_users().await;
        let report = adapter.test_connection().await.unwrap();
        assert!(report.server_version.starts_with("SQLite"));
        assert_eq!(report.table_count, 1);
        assert!(!report.ssl);
    }

    #[tokio::test]
    async fn get_tables_describes_columns() {
        let adapter = adapter_with_users().await;
        let tables = adapter.get_tables().await.unwrap();
        assert_eq!(tables.len(), 1);

        let users = &tables[0];
        assert_eq!(users.name, "users");
        assert_eq!(users.kind, TableKind::Table);
        assert_eq!(users.row_count, 4);

        let names: Vec<_> = users.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "age"]);
        assert!(users.columns[0].primary_key);
        assert!(!users.columns[1].nullable);
    }

    #[tokio::test]
    async fn pagination_pages_are_disjoint_and_complete() {
        let adapter = adapter_with_users().await;
        let first = adapter.get_table_data("users", 2, 0).await.unwrap();
        let second = adapter.get_table_data("users", 2, 2).await.unwrap();

        assert_eq!(first.total, 4);
        assert_eq!(first.rows.len(), 2);
        assert_eq!(second.rows.len(), 2);

        let ids = |page: &TableDataResult| -> Vec<i64> {
            page.rows
                .iter()
                .map(|r| r.get("id").and_then(|v| v.as_i64()).unwrap())
                .collect()
        };
        let mut all = ids(&first);
        all.extend(ids(&second));
        all.sort_unstable();
        assert_eq!(all, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn execute_query_returns_columns_of_first_row() {
        let adapter = adapter_with_users().await;
        let result = adapter
            .execute_query("SELECT name, age FROM users WHERE age > 30 ORDER BY age")
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["name", "age"]);
        assert_eq!(result.row_count, 3);

        let empty = adapter
            .execute_query("SELECT * FROM users WHERE age > 100")
            .await
            .unwrap();
        assert!(empty.columns.is_empty());
        assert_eq!(empty.row_count, 0);
    }

    #[tokio::test]
    async fn invalid_sql_surfaces_driver_message() {
        let adapter = adapter_with_users().await;
        let err = adapter.execute_query("SELEC nonsense").await.unwrap_err();
        assert!(matches!(err, AppError::QueryExecution(_)));
    }

    #[tokio::test]
    async fn rename_and_drop_table() {
        let adapter = adapter_with_users().await;
        adapter.rename_table("users", "people").await.unwrap();
        let tables = adapter.get_tables().await.unwrap();
        assert_eq!(tables[0].name, "people");

        adapter.drop_table("people").await.unwrap();
        assert!(adapter.get_tables().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_column_with_default() {
        let adapter = adapter_with_users().await;
        let col = ColumnDefinition {
            default_value: Some("'unknown'".into()),
            ..column("city", "TEXT")
        };
        adapter.add_column("users", &col).await.unwrap();

        let result = adapter
            .execute_query("SELECT city FROM users LIMIT 1")
            .await
            .unwrap();
        assert_eq!(result.rows[0]["city"], serde_json::json!("unknown"));
    }

    #[tokio::test]
    async fn modify_column_renames_and_keeps_data() {
        let adapter = adapter_with_users().await;
        adapter
            .modify_column("users", "age", &column("years", "INTEGER"))
            .await
            .unwrap();

        let tables = adapter.get_tables().await.unwrap();
        let names: Vec<_> = tables[0].columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "years"]);
        assert_eq!(tables[0].row_count, 4);

        let result = adapter
            .execute_query("SELECT years FROM users WHERE name = 'bob'")
            .await
            .unwrap();
        assert_eq!(result.rows[0]["years"], serde_json::json!(42));
    }

    #[tokio::test]
    async fn drop_column_keeps_remaining_data() {
        let adapter = adapter_with_users().await;
        adapter.drop_column("users", "age").await.unwrap();

        let tables = adapter.get_tables().await.unwrap();
        let names: Vec<_> = tables[0].columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name"]);
        assert_eq!(tables[0].row_count, 4);
    }

    #[tokio::test]
    async fn drop_column_on_composite_primary_key_table() {
        let adapter = SqliteAdapter::from_url("sqlite::memory:").unwrap();
        adapter
            .execute_query(
                "CREATE TABLE link (a INTEGER, b INTEGER, note TEXT, PRIMARY KEY (a, b))",
            )
            .await
            .unwrap();
        adapter
            .execute_query("INSERT INTO link VALUES (1, 2, 'x'), (3, 4, 'y')")
            .await
            .unwrap();

        adapter.drop_column("link", "note").await.unwrap();

        let tables = adapter.get_tables().await.unwrap();
        assert_eq!(tables[0].row_count, 2);
        let pk: Vec<_> = tables[0]
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(pk, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failed_rebuild_leaves_original_table_intact() {
        let adapter = adapter_with_users().await;
        let broken = ColumnDefinition {
            default_value: Some("(".into()),
            ..column("age", "INTEGER")
        };
        let err = adapter.modify_column("users", "age", &broken).await;
        assert!(err.is_err());

        // Original schema and data survive the rollback.
        let tables = adapter.get_tables().await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "users");
        assert_eq!(tables[0].row_count, 4);
        let names: Vec<_> = tables[0].columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "age"]);
    }

    #[tokio::test]
    async fn modifying_missing_column_is_not_found() {
        let adapter = adapter_with_users().await;
        let err = adapter
            .modify_column("users", "ghost", &column("ghost", "TEXT"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
