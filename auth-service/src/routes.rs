//! 认证服务路由模块

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// 创建认证路由
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/init-db", post(handlers::init_db))
        .route("/api/auth/users/{id}", get(handlers::get_user))
        .route("/api/health", get(handlers::health_check))
}
