//! Shared data models for all services.

pub mod connection;
pub mod query;
pub mod schema;
pub mod user;

// Re-export commonly used types
pub use connection::{ConnectionConfig, PostgresConfig, PostgresParams, SqliteConfig};
pub use query::{QueryRequest, QueryResult, TableDataResult};
pub use schema::{
    ColumnDefinition, ColumnDescriptor, CreateTableRequest, RenameTableRequest, TableDescriptor,
    TableKind,
};
pub use user::{LoginRequest, RegisterRequest, User, UserInfo};
