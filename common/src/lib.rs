//! Shared building blocks for the workbench services.
//!
//! Contains the data models, error taxonomy, API response envelope,
//! configuration loader and middleware used by every service binary.

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;
