//! 工作台服务模块
//!
//! 将 HTTP 层的请求分发到对应后端的适配器。每次调用独立构建适配器，
//! 请求之间不共享任何状态。

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::connection::ConnectionConfig;
use common::models::query::{QueryResult, TableDataResult};
use common::models::schema::{ColumnDefinition, TableDescriptor};

use crate::adapters::{adapter_for, SqliteAdapter, TestReport};

/// 多后端工作台服务
pub struct WorkbenchService {
    config: AppConfig,
}

impl WorkbenchService {
    /// 创建新的工作台服务实例
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// 测试数据库连接
    pub async fn test_connection(&self, config: &ConnectionConfig) -> AppResult<TestReport> {
        adapter_for(config, &self.config)?.test_connection().await
    }

    /// 列出所有表及其列信息
    pub async fn get_tables(&self, config: &ConnectionConfig) -> AppResult<Vec<TableDescriptor>> {
        adapter_for(config, &self.config)?.get_tables().await
    }

    /// 分页读取表数据
    pub async fn get_table_data(
        &self,
        config: &ConnectionConfig,
        table: &str,
        limit: i64,
        offset: i64,
    ) -> AppResult<TableDataResult> {
        adapter_for(config, &self.config)?
            .get_table_data(table, limit, offset)
            .await
    }

    /// 执行任意 SQL
    pub async fn execute_query(
        &self,
        config: &ConnectionConfig,
        sql: &str,
    ) -> AppResult<QueryResult> {
        adapter_for(config, &self.config)?.execute_query(sql).await
    }

    /// 创建表（仅 SQLite）
    pub async fn create_table(
        &self,
        config: &ConnectionConfig,
        name: &str,
        columns: &[ColumnDefinition],
    ) -> AppResult<()> {
        self.sqlite(config)?.create_table(name, columns).await
    }

    /// 重命名表（仅 SQLite）
    pub async fn rename_table(
        &self,
        config: &ConnectionConfig,
        old: &str,
        new: &str,
    ) -> AppResult<()> {
        self.sqlite(config)?.rename_table(old, new).await
    }

    /// 删除表（仅 SQLite）
    pub async fn drop_table(&self, config: &ConnectionConfig, name: &str) -> AppResult<()> {
        self.sqlite(config)?.drop_table(name).await
    }

    /// 新增列（仅 SQLite）
    pub async fn add_column(
        &self,
        config: &ConnectionConfig,
        table: &str,
        column: &ColumnDefinition,
    ) -> AppResult<()> {
        self.sqlite(config)?.add_column(table, column).await
    }

    /// 修改列（仅 SQLite，影子表重建）
    pub async fn modify_column(
        &self,
        config: &ConnectionConfig,
        table: &str,
        column: &str,
        definition: &ColumnDefinition,
    ) -> AppResult<()> {
        self.sqlite(config)?
            .modify_column(table, column, definition)
            .await
    }

    /// 删除列（仅 SQLite，影子表重建）
    pub async fn drop_column(
        &self,
        config: &ConnectionConfig,
        table: &str,
        column: &str,
    ) -> AppResult<()> {
        self.sqlite(config)?.drop_column(table, column).await
    }

    /// 结构变更仅支持 SQLite 后端
    fn sqlite(&self, config: &ConnectionConfig) -> AppResult<SqliteAdapter> {
        match config {
            ConnectionConfig::Sqlite(sq) => SqliteAdapter::open(&sq.file_path),
            ConnectionConfig::Postgres(_) => Err(AppError::UnsupportedDatabaseType(
                "schema mutations are only supported for sqlite".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::connection::PostgresConfig;

    #[test]
    fn schema_mutations_reject_postgres() {
        let service = WorkbenchService::new(AppConfig::load_with_service("test"));
        let config = ConnectionConfig::Postgres(PostgresConfig {
            host: "localhost".into(),
            port: 5432,
            database: "db".into(),
            username: "u".into(),
            password: "p".into(),
            ssl: false,
        });
        assert!(matches!(
            service.sqlite(&config),
            Err(AppError::UnsupportedDatabaseType(_))
        ));
    }
}
