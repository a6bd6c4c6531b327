//! 工作台路由模块

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// 创建工作台路由
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/connections/test", post(handlers::test_connection))
        .route("/api/connections/{id}/tables", get(handlers::get_tables))
        .route(
            "/api/connections/{id}/tables/{table}/data",
            get(handlers::get_table_data),
        )
        .route("/api/connections/{id}/query", post(handlers::execute_query))
        .route(
            "/api/connections/{id}/schema/tables",
            post(handlers::create_table),
        )
        .route(
            "/api/connections/{id}/schema/tables/{table}",
            put(handlers::rename_table).delete(handlers::drop_table),
        )
        .route(
            "/api/connections/{id}/schema/tables/{table}/columns",
            post(handlers::add_column),
        )
        .route(
            "/api/connections/{id}/schema/tables/{table}/columns/{column}",
            put(handlers::modify_column).delete(handlers::drop_column),
        )
        .route("/api/files/upload", post(handlers::upload_file))
        .route("/api/files", get(handlers::list_files))
        .route("/api/health", get(handlers::health_check))
}
