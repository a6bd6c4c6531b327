//! Unique ID generator.
//!
//! Provides utilities for generating unique identifiers.

use uuid::Uuid;

/// Generates unique identifiers for various entities.
pub struct IdGenerator;

impl IdGenerator {
    /// Generates a unique user ID.
    pub fn user_id() -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_is_unique() {
        let id1 = IdGenerator::user_id();
        let id2 = IdGenerator::user_id();
        assert_ne!(id1, id2);
    }
}
