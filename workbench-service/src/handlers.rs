//! Handler模块

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header::HeaderName, HeaderMap},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use common::errors::{AppError, AppResult};
use common::models::connection::ConnectionConfig;
use common::models::query::{QueryRequest, QueryResult, TableDataResult};
use common::models::schema::{
    ColumnDefinition, CreateTableRequest, RenameTableRequest, TableDescriptor,
};
use common::response::ApiResponse;
use crate::service::WorkbenchService;
use crate::state::AppState;
use crate::upload::UploadedFile;

/// Header carrying the JSON-encoded connection config.
pub static CONNECTION_CONFIG_HEADER: HeaderName = HeaderName::from_static("x-connection-config");

/// Extracts and normalizes the per-request connection config.
fn connection_config(headers: &HeaderMap) -> AppResult<ConnectionConfig> {
    let raw = headers
        .get(&CONNECTION_CONFIG_HEADER)
        .ok_or(AppError::ConfigMissing)?
        .to_str()
        .map_err(|_| AppError::ConfigInvalid("header is not valid UTF-8".into()))?;
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| AppError::ConfigInvalid(e.to_string()))?;
    ConnectionConfig::resolve(&value)
}

/// 测试数据库连接
#[utoipa::path(
    post,
    path = "/api/connections/test",
    tag = "connections",
    responses(
        (status = 200, description = "连接测试结果", body = ApiResponse<ConnectionTestResult>),
        (status = 400, description = "连接配置缺失或无效")
    )
)]
pub async fn test_connection(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<ConnectionTestResult>>, AppError> {
    let config = ConnectionConfig::resolve(&body)?;
    let service = WorkbenchService::new(state.config);
    let result = match service.test_connection(&config).await {
        Ok(report) => ConnectionTestResult {
            success: true,
            server_version: Some(report.server_version),
            database_size: Some(report.database_size),
            table_count: Some(report.table_count),
            ssl: Some(report.ssl),
            latency_ms: Some(report.latency_ms),
            error: None,
        },
        Err(e) => ConnectionTestResult {
            success: false,
            server_version: None,
            database_size: None,
            table_count: None,
            ssl: None,
            latency_ms: None,
            error: Some(e.to_string()),
        },
    };
    Ok(Json(ApiResponse::ok_with_service(result, "workbench-service")))
}

/// 列出所有表及其结构
#[utoipa::path(
    get,
    path = "/api/connections/{id}/tables",
    tag = "connections",
    params(
        ("id" = String, Path, description = "客户端侧连接标识")
    ),
    responses(
        (status = 200, description = "表列表", body = ApiResponse<Vec<TableDescriptor>>),
        (status = 400, description = "连接配置缺失或无效")
    )
)]
pub async fn get_tables(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<TableDescriptor>>>, AppError> {
    let config = connection_config(&headers)?;
    tracing::debug!(connection = %id, backend = config.backend(), "listing tables");
    let service = WorkbenchService::new(state.config);
    let tables = service.get_tables(&config).await?;
    Ok(Json(ApiResponse::ok_with_service(tables, "workbench-service")))
}

/// 分页参数
#[derive(Debug, Deserialize, ToSchema)]
pub struct PageParams {
    /// 页大小（默认 50）
    pub limit: Option<i64>,
    /// 偏移量（默认 0）
    pub offset: Option<i64>,
}

/// 分页读取表数据
#[utoipa::path(
    get,
    path = "/api/connections/{id}/tables/{table}/data",
    tag = "connections",
    params(
        ("id" = String, Path, description = "客户端侧连接标识"),
        ("table" = String, Path, description = "表名"),
        ("limit" = Option<i64>, Query, description = "页大小"),
        ("offset" = Option<i64>, Query, description = "偏移量")
    ),
    responses(
        (status = 200, description = "表数据", body = ApiResponse<TableDataResult>),
        (status = 400, description = "连接配置缺失或无效")
    )
)]
pub async fn get_table_data(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
    Query(page): Query<PageParams>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<TableDataResult>>, AppError> {
    let config = connection_config(&headers)?;
    tracing::debug!(connection = %id, table = %table, "reading table data");
    let service = WorkbenchService::new(state.config);
    let data = service
        .get_table_data(
            &config,
            &table,
            page.limit.unwrap_or(50),
            page.offset.unwrap_or(0),
        )
        .await?;
    Ok(Json(ApiResponse::ok_with_service(data, "workbench-service")))
}

/// 执行 SQL 查询
#[utoipa::path(
    post,
    path = "/api/connections/{id}/query",
    tag = "query",
    request_body = QueryRequest,
    params(
        ("id" = String, Path, description = "客户端侧连接标识")
    ),
    responses(
        (status = 200, description = "查询执行成功", body = ApiResponse<QueryResult>),
        (status = 400, description = "连接配置缺失或无效"),
        (status = 500, description = "SQL 执行失败")
    )
)]
pub async fn execute_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<QueryRequest>,
) -> Result<Json<ApiResponse<QueryResult>>, AppError> {
    req.validate()?;
    let config = connection_config(&headers)?;
    tracing::debug!(connection = %id, backend = config.backend(), "executing query");
    let service = WorkbenchService::new(state.config);
    let result = service.execute_query(&config, &req.sql).await?;
    let duration = result.execution_time_ms;
    Ok(Json(
        ApiResponse::ok_with_service(result, "workbench-service").with_duration(duration),
    ))
}

/// 创建表
#[utoipa::path(
    post,
    path = "/api/connections/{id}/schema/tables",
    tag = "schema",
    request_body = CreateTableRequest,
    params(
        ("id" = String, Path, description = "客户端侧连接标识")
    ),
    responses(
        (status = 200, description = "表已创建", body = ApiResponse<bool>),
        (status = 400, description = "配置无效或后端不支持结构变更")
    )
)]
pub async fn create_table(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateTableRequest>,
) -> Result<Json<ApiResponse<bool>>, AppError> {
    req.validate()?;
    let config = connection_config(&headers)?;
    tracing::debug!(connection = %id, table = %req.name, "creating table");
    let service = WorkbenchService::new(state.config);
    service.create_table(&config, &req.name, &req.columns).await?;
    Ok(Json(ApiResponse::ok_with_service(true, "workbench-service")))
}

/// 重命名表
#[utoipa::path(
    put,
    path = "/api/connections/{id}/schema/tables/{table}",
    tag = "schema",
    request_body = RenameTableRequest,
    params(
        ("id" = String, Path, description = "客户端侧连接标识"),
        ("table" = String, Path, description = "原表名")
    ),
    responses(
        (status = 200, description = "表已重命名", body = ApiResponse<bool>)
    )
)]
pub async fn rename_table(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
    headers: HeaderMap,
    Json(req): Json<RenameTableRequest>,
) -> Result<Json<ApiResponse<bool>>, AppError> {
    req.validate()?;
    let config = connection_config(&headers)?;
    tracing::debug!(connection = %id, from = %table, to = %req.new_name, "renaming table");
    let service = WorkbenchService::new(state.config);
    service.rename_table(&config, &table, &req.new_name).await?;
    Ok(Json(ApiResponse::ok_with_service(true, "workbench-service")))
}

/// 删除表
#[utoipa::path(
    delete,
    path = "/api/connections/{id}/schema/tables/{table}",
    tag = "schema",
    params(
        ("id" = String, Path, description = "客户端侧连接标识"),
        ("table" = String, Path, description = "表名")
    ),
    responses(
        (status = 200, description = "表已删除", body = ApiResponse<bool>)
    )
)]
pub async fn drop_table(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<bool>>, AppError> {
    let config = connection_config(&headers)?;
    tracing::debug!(connection = %id, table = %table, "dropping table");
    let service = WorkbenchService::new(state.config);
    service.drop_table(&config, &table).await?;
    Ok(Json(ApiResponse::ok_with_service(true, "workbench-service")))
}

/// 新增列
#[utoipa::path(
    post,
    path = "/api/connections/{id}/schema/tables/{table}/columns",
    tag = "schema",
    request_body = ColumnDefinition,
    params(
        ("id" = String, Path, description = "客户端侧连接标识"),
        ("table" = String, Path, description = "表名")
    ),
    responses(
        (status = 200, description = "列已新增", body = ApiResponse<bool>)
    )
)]
pub async fn add_column(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
    headers: HeaderMap,
    Json(column): Json<ColumnDefinition>,
) -> Result<Json<ApiResponse<bool>>, AppError> {
    column.validate()?;
    let config = connection_config(&headers)?;
    tracing::debug!(connection = %id, table = %table, column = %column.name, "adding column");
    let service = WorkbenchService::new(state.config);
    service.add_column(&config, &table, &column).await?;
    Ok(Json(ApiResponse::ok_with_service(true, "workbench-service")))
}

/// 修改列（影子表重建）
#[utoipa::path(
    put,
    path = "/api/connections/{id}/schema/tables/{table}/columns/{column}",
    tag = "schema",
    request_body = ColumnDefinition,
    params(
        ("id" = String, Path, description = "客户端侧连接标识"),
        ("table" = String, Path, description = "表名"),
        ("column" = String, Path, description = "原列名")
    ),
    responses(
        (status = 200, description = "列已修改", body = ApiResponse<bool>)
    )
)]
pub async fn modify_column(
    State(state): State<AppState>,
    Path((id, table, column)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(definition): Json<ColumnDefinition>,
) -> Result<Json<ApiResponse<bool>>, AppError> {
    definition.validate()?;
    let config = connection_config(&headers)?;
    tracing::debug!(connection = %id, table = %table, column = %column, "modifying column");
    let service = WorkbenchService::new(state.config);
    service
        .modify_column(&config, &table, &column, &definition)
        .await?;
    Ok(Json(ApiResponse::ok_with_service(true, "workbench-service")))
}

/// 删除列（影子表重建）
#[utoipa::path(
    delete,
    path = "/api/connections/{id}/schema/tables/{table}/columns/{column}",
    tag = "schema",
    params(
        ("id" = String, Path, description = "客户端侧连接标识"),
        ("table" = String, Path, description = "表名"),
        ("column" = String, Path, description = "列名")
    ),
    responses(
        (status = 200, description = "列已删除", body = ApiResponse<bool>)
    )
)]
pub async fn drop_column(
    State(state): State<AppState>,
    Path((id, table, column)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<bool>>, AppError> {
    let config = connection_config(&headers)?;
    tracing::debug!(connection = %id, table = %table, column = %column, "dropping column");
    let service = WorkbenchService::new(state.config);
    service.drop_column(&config, &table, &column).await?;
    Ok(Json(ApiResponse::ok_with_service(true, "workbench-service")))
}

/// 上传 SQLite 数据库文件
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    responses(
        (status = 200, description = "文件已保存", body = ApiResponse<UploadedFile>),
        (status = 400, description = "缺少 file 字段或扩展名不被接受")
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadedFile>>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original = field
            .file_name()
            .map(String::from)
            .ok_or_else(|| AppError::Validation("file field has no file name".into()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
        let saved = state.file_store.save(&original, &bytes).await?;
        return Ok(Json(ApiResponse::ok_with_service(saved, "workbench-service")));
    }
    Err(AppError::Validation("multipart field 'file' is required".into()))
}

/// 列出已上传的数据库文件
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    responses(
        (status = 200, description = "文件列表", body = ApiResponse<Vec<UploadedFile>>)
    )
)]
pub async fn list_files(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<UploadedFile>>>, AppError> {
    let files = state.file_store.list().await?;
    Ok(Json(ApiResponse::ok_with_service(files, "workbench-service")))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "workbench-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// 连接测试结果
#[derive(Serialize, ToSchema)]
pub struct ConnectionTestResult {
    /// 测试是否成功
    pub success: bool,
    /// 服务器版本
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
    /// 数据库大小（已格式化）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_size: Option<String>,
    /// 用户表数量
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_count: Option<i64>,
    /// 是否启用 SSL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl: Option<bool>,
    /// 连接延迟（毫秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// 错误信息（如果测试失败）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_header_is_config_missing() {
        let headers = HeaderMap::new();
        assert!(matches!(
            connection_config(&headers).unwrap_err(),
            AppError::ConfigMissing
        ));
    }

    #[test]
    fn malformed_header_is_config_invalid() {
        let mut headers = HeaderMap::new();
        headers.insert(&CONNECTION_CONFIG_HEADER, HeaderValue::from_static("{not json"));
        assert!(matches!(
            connection_config(&headers).unwrap_err(),
            AppError::ConfigInvalid(_)
        ));
    }

    #[test]
    fn sqlite_header_resolves() {
        let mut headers = HeaderMap::new();
        headers.insert(
            &CONNECTION_CONFIG_HEADER,
            HeaderValue::from_static(
                r#"{"type":"sqlite","file_path":"/data/uploads/1-test.sqlite"}"#,
            ),
        );
        let config = connection_config(&headers).unwrap();
        assert_eq!(config.backend(), "sqlite");
    }
}
