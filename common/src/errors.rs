//! Application error taxonomy.
//!
//! Every service maps its failures onto [`AppError`]; the `IntoResponse`
//! impl renders the standard [`ApiResponse`] error envelope with the
//! matching HTTP status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used across all services.
pub type AppResult<T> = Result<T, AppError>;

/// Unified application error.
#[derive(Debug, Error)]
pub enum AppError {
    /// No connection config was supplied with the request.
    #[error("connection config is missing")]
    ConfigMissing,

    /// The supplied connection config could not be parsed.
    #[error("invalid connection config: {0}")]
    ConfigInvalid(String),

    /// Request body validation failed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The requested operation is not supported for this backend.
    #[error("unsupported database type: {0}")]
    UnsupportedDatabaseType(String),

    /// A user with this username already exists.
    #[error("username is already taken")]
    DuplicateUsername,

    /// A user with this email already exists.
    #[error("email is already registered")]
    DuplicateEmail,

    /// Credentials did not match any user.
    #[error("invalid credentials")]
    Unauthorized,

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend host could not be reached.
    #[error("database unreachable: {0}")]
    BackendUnreachable(String),

    /// The backend rejected the supplied credentials.
    #[error("database authentication failed: {0}")]
    BackendAuthFailure(String),

    /// TLS negotiation with the backend failed.
    #[error("database SSL failure: {0}")]
    BackendSslFailure(String),

    /// A caller-supplied SQL statement failed; the driver message is
    /// surfaced verbatim.
    #[error("query failed: {0}")]
    QueryExecution(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable error code for the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ConfigMissing => "CONFIG_MISSING",
            AppError::ConfigInvalid(_) => "CONFIG_INVALID",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::UnsupportedDatabaseType(_) => "UNSUPPORTED_DB_TYPE",
            AppError::DuplicateUsername => "DUPLICATE_USERNAME",
            AppError::DuplicateEmail => "DUPLICATE_EMAIL",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BackendUnreachable(_) => "BACKEND_UNREACHABLE",
            AppError::BackendAuthFailure(_) => "BACKEND_AUTH_FAILURE",
            AppError::BackendSslFailure(_) => "BACKEND_SSL_FAILURE",
            AppError::QueryExecution(_) => "QUERY_EXECUTION_FAILURE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ConfigMissing
            | AppError::ConfigInvalid(_)
            | AppError::Validation(_)
            | AppError::UnsupportedDatabaseType(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateUsername | AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BackendUnreachable(_)
            | AppError::BackendAuthFailure(_)
            | AppError::BackendSslFailure(_)
            | AppError::QueryExecution(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }
        let body = Json(ApiResponse::err(self.code(), self.to_string()));
        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Classifies an sqlx error against a remote backend.
///
/// SQLSTATE codes are preferred when the driver exposes them; message
/// substrings are only consulted for transport-level failures that carry
/// no structured code.
pub fn classify_backend_error(e: &sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(db) => {
            let message = db.message().to_string();
            match db.code().as_deref() {
                // invalid_password / invalid_authorization_specification
                Some("28P01") | Some("28000") => AppError::BackendAuthFailure(message),
                // invalid_catalog_name: the database does not exist
                Some("3D000") => AppError::NotFound(message),
                _ => AppError::QueryExecution(message),
            }
        }
        sqlx::Error::Tls(_) => AppError::BackendSslFailure(e.to_string()),
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => {
            AppError::BackendUnreachable(classify_transport_message(&e.to_string()))
        }
        sqlx::Error::Configuration(_) => AppError::ConfigInvalid(e.to_string()),
        _ => AppError::QueryExecution(e.to_string()),
    }
}

/// Maps well-known transport error wording to a friendlier message.
/// Fragile by construction: depends on upstream error text.
pub fn classify_transport_message(message: &str) -> String {
    let lower = message.to_lowercase();
    if lower.contains("name or service not known")
        || lower.contains("failed to lookup address")
        || lower.contains("no such host")
    {
        "host not found".to_string()
    } else if lower.contains("connection refused") {
        "connection refused".to_string()
    } else if lower.contains("ssl") || lower.contains("tls") {
        "SSL negotiation failed".to_string()
    } else {
        message.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_map_to_400() {
        assert_eq!(AppError::ConfigMissing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::ConfigInvalid("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn duplicates_map_to_409() {
        assert_eq!(AppError::DuplicateUsername.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::DuplicateEmail.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn adapter_failures_map_to_500() {
        assert_eq!(
            AppError::QueryExecution("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::BackendUnreachable("down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn transport_messages_are_normalized() {
        assert_eq!(
            classify_transport_message("error: Name or service not known"),
            "host not found"
        );
        assert_eq!(
            classify_transport_message("tcp connect error: Connection refused (os error 111)"),
            "connection refused"
        );
        assert_eq!(
            classify_transport_message("weird driver message"),
            "weird driver message"
        );
    }
}
