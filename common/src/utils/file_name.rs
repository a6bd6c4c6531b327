//! Upload file naming helpers.
//!
//! Uploaded SQLite files land in a shared directory; names are prefixed
//! with a millisecond timestamp so concurrent uploads of the same file
//! name cannot collide.

/// File extensions accepted for SQLite database uploads.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["sqlite", "db", "sqlite3"];

/// Returns true if the file name carries an accepted SQLite extension.
pub fn has_allowed_extension(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}

/// Builds the stored name for an upload: `{unix_millis}-{sanitized}`.
pub fn timestamped(original: &str) -> String {
    format!("{}-{}", chrono::Utc::now().timestamp_millis(), sanitize(original))
}

/// Strips path separators and control characters from a client-supplied
/// file name.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '\0'..='\x1f' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_extensions_are_allowed() {
        assert!(has_allowed_extension("test.sqlite"));
        assert!(has_allowed_extension("test.db"));
        assert!(has_allowed_extension("Test.SQLITE3"));
    }

    #[test]
    fn other_extensions_are_rejected() {
        assert!(!has_allowed_extension("test.exe"));
        assert!(!has_allowed_extension("test"));
        assert!(!has_allowed_extension(".sqlite"));
    }

    #[test]
    fn stored_name_differs_from_original() {
        let stored = timestamped("test.sqlite");
        assert_ne!(stored, "test.sqlite");
        assert!(stored.ends_with("-test.sqlite"));
    }

    #[test]
    fn path_separators_are_stripped() {
        assert_eq!(sanitize("../../etc/passwd"), ".._.._etc_passwd");
    }
}
