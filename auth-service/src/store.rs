//! Credential store.
//!
//! Persists user accounts in an embedded SQLite database via sqlx. The
//! store is constructed once at startup and injected into handlers
//! through the application state.

use bcrypt::{hash, verify};
use sqlx::error::ErrorKind;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use common::errors::{AppError, AppResult};
use common::models::user::{RegisterRequest, User, UserInfo};
use common::utils::IdGenerator;

/// Fixed bcrypt cost factor for all stored hashes.
const HASH_COST: u32 = 10;

/// A syntactically valid hash used to equalize timing when the looked-up
/// user does not exist.
const DUMMY_HASH: &str = "$2b$10$7EqJtq98hPqEX7fNZaFWoOhi5B0a9edeNDidpMZcS1D1xPSO1jBhm";

/// SQLite-backed user account store.
#[derive(Clone)]
pub struct CredentialStore {
    pool: SqlitePool,
}

impl CredentialStore {
    /// Opens the store at the given sqlx SQLite URL (e.g.
    /// `sqlite:data/auth.db?mode=rwc` or `sqlite::memory:`).
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(|e| AppError::Internal(format!("failed to open credential store: {e}")))?;
        Ok(Self { pool })
    }

    /// Idempotently creates the users table and its unique indexes.
    pub async fn init_schema(&self) -> AppResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id            TEXT PRIMARY KEY,
                username      TEXT NOT NULL,
                email         TEXT NOT NULL,
                name          TEXT NOT NULL,
                password_hash TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("failed to create users table: {e}")))?;

        sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users (email)")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("failed to create email index: {e}")))?;

        sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username ON users (username)")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("failed to create username index: {e}")))?;

        tracing::info!("credential store schema ensured");
        Ok(())
    }

    /// Hashes the password and inserts a new user.
    ///
    /// Uniqueness violations are mapped to [`AppError::DuplicateUsername`]
    /// or [`AppError::DuplicateEmail`] by matching the offending column in
    /// the constraint message.
    pub async fn create_user(&self, req: RegisterRequest) -> AppResult<UserInfo> {
        let password_hash = hash(&req.password, HASH_COST)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;

        let user = User {
            id: IdGenerator::user_id(),
            username: req.username,
            email: req.email,
            name: req.name,
            password_hash,
        };

        sqlx::query(
            "INSERT INTO users (id, username, email, name, password_hash)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        tracing::info!(id = %user.id, username = %user.username, "user created");
        Ok(user.into_info())
    }

    /// Checks the supplied password against the stored hash.
    ///
    /// Returns the user record (without hash) on match, `None` otherwise.
    /// "No such user" and "wrong password" are indistinguishable to the
    /// caller; a dummy verify runs in the missing-user case.
    pub async fn verify_password(
        &self,
        identifier: &str,
        password: &str,
    ) -> AppResult<Option<UserInfo>> {
        match self.find_by_email_or_username(identifier).await? {
            Some(user) => {
                let ok = verify(password, &user.password_hash).unwrap_or(false);
                Ok(ok.then(|| user.into_info()))
            }
            None => {
                let _ = verify(password, DUMMY_HASH);
                Ok(None)
            }
        }
    }

    /// Looks a user up by email or username.
    pub async fn find_by_email_or_username(&self, identifier: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, name, password_hash
             FROM users WHERE email = ?1 OR username = ?1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("user lookup failed: {e}")))
    }

    /// Looks a user up by ID.
    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<UserInfo>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, name, password_hash FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("user lookup failed: {e}")))?;
        Ok(user.map(User::into_info))
    }

    /// Number of registered users (health endpoint).
    pub async fn user_count(&self) -> usize {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .unwrap_or((0,));
        row.0 as usize
    }
}

/// Maps an insert failure, discriminating duplicate username vs email by
/// the column named in the unique-constraint message.
fn map_insert_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.kind() == ErrorKind::UniqueViolation {
            let message = db.message();
            if message.contains("users.username") {
                return AppError::DuplicateUsername;
            }
            if message.contains("users.email") {
                return AppError::DuplicateEmail;
            }
        }
    }
    AppError::Internal(format!("failed to insert user: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> CredentialStore {
        let store = CredentialStore::connect("sqlite::memory:").await.unwrap();
        store.init_schema().await.unwrap();
        store
    }

    fn register(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            name: "Test User".into(),
            password: "correct horse battery".into(),
        }
    }

    #[tokio::test]
    async fn init_schema_is_idempotent() {
        let store = store().await;
        store.init_schema().await.unwrap();
        store.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn created_user_is_returned_without_hash() {
        let store = store().await;
        let info = store
            .create_user(register("alice", "alice@example.com"))
            .await
            .unwrap();
        assert_eq!(info.username, "alice");
        assert!(!info.id.is_empty());

        let found = store.get_by_id(&info.id).await.unwrap().unwrap();
        assert_eq!(found.email, "alice@example.com");
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = store().await;
        store
            .create_user(register("alice", "alice@example.com"))
            .await
            .unwrap();
        let err = store
            .create_user(register("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = store().await;
        store
            .create_user(register("alice", "alice@example.com"))
            .await
            .unwrap();
        let err = store
            .create_user(register("bob", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
    }

    #[tokio::test]
    async fn verify_password_accepts_correct_credentials() {
        let store = store().await;
        store
            .create_user(register("alice", "alice@example.com"))
            .await
            .unwrap();

        let by_username = store
            .verify_password("alice", "correct horse battery")
            .await
            .unwrap();
        assert!(by_username.is_some());

        let by_email = store
            .verify_password("alice@example.com", "correct horse battery")
            .await
            .unwrap();
        assert!(by_email.is_some());
    }

    #[tokio::test]
    async fn wrong_password_and_missing_user_are_indistinguishable() {
        let store = store().await;
        store
            .create_user(register("alice", "alice@example.com"))
            .await
            .unwrap();

        let wrong = store.verify_password("alice", "nope").await.unwrap();
        let missing = store.verify_password("nobody", "nope").await.unwrap();
        assert!(wrong.is_none());
        assert!(missing.is_none());
    }
}
