//! User account models.
//!
//! The full database record carries the password hash and never leaves
//! the auth service; [`UserInfo`] is the client-safe projection returned
//! by the API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Full user record as stored in the credential store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: String,
    /// Unique username.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// bcrypt hash of the password.
    pub password_hash: String,
}

impl User {
    /// Strips the password hash for API responses.
    pub fn into_info(self) -> UserInfo {
        UserInfo {
            id: self.id,
            username: self.username,
            email: self.email,
            name: self.name,
        }
    }
}

/// Client-safe user projection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    /// Unique user identifier.
    pub id: String,
    /// Unique username.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Display name.
    pub name: String,
}

/// Request body for registering a new user.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Username: 3-20 alphanumeric/underscore characters.
    #[validate(
        length(min = 3, max = 20, message = "Username must be 3-20 characters"),
        regex(
            path = *USERNAME_RE,
            message = "Username may contain only letters, digits and underscores"
        )
    )]
    pub username: String,

    /// Email address.
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    /// Display name.
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Plain-text password, hashed before storage.
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

static USERNAME_RE: std::sync::LazyLock<regex::Regex> =
    std::sync::LazyLock::new(|| regex::Regex::new(r"^[A-Za-z0-9_]+$").expect("valid regex"));

/// Request body for logging in.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Email or username.
    #[validate(length(min = 1, message = "Identifier is required"))]
    pub identifier: String,

    /// Plain-text password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            name: "Test User".into(),
            password: "hunter2hunter2".into(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(register("alice_01", "alice@example.com").validate().is_ok());
    }

    #[test]
    fn bad_usernames_are_rejected() {
        for username in ["ab", "way_too_long_username_here", "has space", "dash-ed"] {
            assert!(
                register(username, "a@example.com").validate().is_err(),
                "{username}"
            );
        }
    }

    #[test]
    fn bad_email_is_rejected() {
        assert!(register("alice", "not-an-email").validate().is_err());
    }

    #[test]
    fn info_projection_drops_hash() {
        let user = User {
            id: "u1".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            name: "Alice".into(),
            password_hash: "$2b$10$abcdefgh".into(),
        };
        let json = serde_json::to_value(user.into_info()).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
