//! 数据库工作台微服务
//!
//! 面向浏览器客户端的数据库工作台后端，包括：
//! - 连接测试（PostgreSQL / SQLite）
//! - 表结构与数据浏览
//! - 任意 SQL 执行
//! - SQLite 表结构变更（建表、改列、影子表重建）
//! - SQLite 数据库文件上传

mod adapters;
mod handlers;
mod routes;
mod service;
mod state;
mod upload;

use axum::{middleware, routing::get, Json, Router};
use common::config::AppConfig;
use common::middleware::request_id::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use upload::FileStore;
use utoipa::OpenApi;

const SERVICE_NAME: &str = "workbench-service";
const DEFAULT_PORT: u16 = 8082;
const DEFAULT_UPLOAD_DIR: &str = "./uploads";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "数据库工作台 API",
        version = "0.1.0",
        description = "多后端数据库浏览、查询与结构变更微服务"
    ),
    paths(
        handlers::test_connection,
        handlers::get_tables,
        handlers::get_table_data,
        handlers::execute_query,
        handlers::create_table,
        handlers::rename_table,
        handlers::drop_table,
        handlers::add_column,
        handlers::modify_column,
        handlers::drop_column,
        handlers::upload_file,
        handlers::list_files,
        handlers::health_check,
    ),
    components(schemas(
        common::models::CreateTableRequest,
        common::models::RenameTableRequest,
        common::models::ColumnDefinition,
        common::models::TableDescriptor,
        common::models::ColumnDescriptor,
        common::models::QueryRequest,
        common::models::QueryResult,
        common::models::TableDataResult,
        handlers::ConnectionTestResult,
        handlers::HealthResponse,
        upload::UploadedFile,
    )),
    tags(
        (name = "connections", description = "连接与数据浏览端点"),
        (name = "query", description = "SQL 执行端点"),
        (name = "schema", description = "表结构变更端点"),
        (name = "files", description = "文件上传端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Load .env file (if present) before anything else
    load_dotenv();

    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置
    let mut config = AppConfig::load_with_service(SERVICE_NAME);
    config.port = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    // 准备上传目录
    let upload_dir =
        std::env::var("UPLOAD_DIR").unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.to_string());
    let file_store = FileStore::new(&upload_dir);
    file_store
        .ensure_dir()
        .await
        .expect("Failed to create upload directory (check UPLOAD_DIR)");

    // 创建应用状态
    let state = AppState::new(config.clone(), file_store);

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = format!("{}:{}", config.host, config.port);
    info!(service = SERVICE_NAME, address = %addr, upload_dir = %upload_dir, "启动服务");

    let listener = TcpListener::bind(&addr).await.expect("绑定地址失败");
    axum::serve(listener, app).await.expect("服务启动失败");
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Load .env file from the working directory (best-effort, no error if missing).
fn load_dotenv() {
    let env_path = std::path::Path::new(".env");
    if env_path.exists() {
        if let Ok(content) = std::fs::read_to_string(env_path) {
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim();
                    // Only set if not already set by the environment
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
        }
    }
}
