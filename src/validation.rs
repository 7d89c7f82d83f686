//! Input validation for SheetDB
//!
//! Table names become sheet qualifiers inside A1 ranges, so they are checked
//! against the spreadsheet's own sheet-name rules before any request is built.

use thiserror::Error;

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid name '{0}': {1}")]
    InvalidName(String, &'static str),

    #[error("Name '{0}' is too long (max {1} characters)")]
    TooLong(String, usize),

    #[error("Name cannot be empty")]
    Empty,
}

/// Maximum length of a sheet title
pub const MAX_TABLE_NAME_LENGTH: usize = 100;

/// Characters a sheet title may not contain
const FORBIDDEN_CHARS: &[char] = &['[', ']', '*', '?', '/', '\\', ':'];

/// Validate a table (sheet) name
///
/// Rules:
/// - Must be 1-100 characters
/// - None of `[ ] * ? / \ :`
/// - No control characters
/// - Cannot start or end with an apostrophe
pub fn validate_table_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::Empty);
    }

    if name.chars().count() > MAX_TABLE_NAME_LENGTH {
        return Err(ValidationError::TooLong(name.to_string(), MAX_TABLE_NAME_LENGTH));
    }

    if name.trim().is_empty() {
        return Err(ValidationError::InvalidName(
            name.to_string(),
            "cannot be only whitespace",
        ));
    }

    for c in name.chars() {
        if FORBIDDEN_CHARS.contains(&c) {
            return Err(ValidationError::InvalidName(
                name.to_string(),
                "contains a character not allowed in sheet names",
            ));
        }
        if c.is_control() {
            return Err(ValidationError::InvalidName(
                name.to_string(),
                "contains control characters",
            ));
        }
    }

    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(ValidationError::InvalidName(
            name.to_string(),
            "cannot start or end with an apostrophe",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_table_name("users").is_ok());
        assert!(validate_table_name("Invite Codes").is_ok());
        assert!(validate_table_name("authenticators-2024").is_ok());
        assert!(validate_table_name("Bob's sheet").is_ok());
    }

    #[test]
    fn test_forbidden_characters() {
        assert!(validate_table_name("a/b").is_err());
        assert!(validate_table_name("a:b").is_err());
        assert!(validate_table_name("[users]").is_err());
        assert!(validate_table_name("what?").is_err());
        assert!(validate_table_name("tab\there").is_err());
    }

    #[test]
    fn test_apostrophes_at_edges() {
        assert!(validate_table_name("'users").is_err());
        assert!(validate_table_name("users'").is_err());
    }

    #[test]
    fn test_empty_and_too_long() {
        assert!(matches!(validate_table_name(""), Err(ValidationError::Empty)));
        assert!(validate_table_name("   ").is_err());
        let long_name = "a".repeat(101);
        assert!(matches!(
            validate_table_name(&long_name),
            Err(ValidationError::TooLong(_, 100))
        ));
        assert!(validate_table_name(&"a".repeat(100)).is_ok());
    }
}
