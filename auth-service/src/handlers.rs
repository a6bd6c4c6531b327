//! Handler模块

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use common::errors::AppError;
use common::models::user::{LoginRequest, RegisterRequest, UserInfo};
use common::response::ApiResponse;
use crate::state::AppState;

/// 注册新用户
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "用户已创建", body = ApiResponse<UserInfo>),
        (status = 400, description = "参数校验失败"),
        (status = 409, description = "用户名或邮箱已存在")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, AppError> {
    req.validate()?;
    let user = state.store.create_user(req).await?;
    Ok(Json(ApiResponse::ok_with_service(user, "auth-service")))
}

/// 用户登录
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "登录成功", body = ApiResponse<UserInfo>),
        (status = 401, description = "用户名或密码错误")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, AppError> {
    req.validate()?;
    match state
        .store
        .verify_password(&req.identifier, &req.password)
        .await?
    {
        Some(user) => Ok(Json(ApiResponse::ok_with_service(user, "auth-service"))),
        None => Err(AppError::Unauthorized),
    }
}

/// 初始化用户数据库（幂等）
#[utoipa::path(
    post,
    path = "/api/auth/init-db",
    tag = "auth",
    responses(
        (status = 200, description = "用户表已就绪", body = ApiResponse<bool>)
    )
)]
pub async fn init_db(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<bool>>, AppError> {
    state.store.init_schema().await?;
    Ok(Json(ApiResponse::ok_with_service(true, "auth-service")))
}

/// 根据 ID 获取用户
#[utoipa::path(
    get,
    path = "/api/auth/users/{id}",
    tag = "auth",
    params(
        ("id" = String, Path, description = "用户 ID")
    ),
    responses(
        (status = 200, description = "用户详情", body = ApiResponse<UserInfo>),
        (status = 404, description = "用户未找到")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserInfo>>, AppError> {
    match state.store.get_by_id(&id).await? {
        Some(user) => Ok(Json(ApiResponse::ok_with_service(user, "auth-service"))),
        None => Err(AppError::NotFound(format!("user {id}"))),
    }
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
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "auth-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        users: state.store.user_count().await,
    })
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
    /// 已注册用户数
    pub users: usize,
}
