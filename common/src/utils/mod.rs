//! Utility functions and helpers.

pub mod file_name;
pub mod id_generator;

// Re-export commonly used types
pub use id_generator::IdGenerator;
