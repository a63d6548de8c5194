//! Database name validation
//!
//! A database name doubles as the name of its directory under the registry
//! root, so it must be a single, non-hidden path component.
//!
//! ## Validation
//!
//! Database names must:
//! - Be 1-255 bytes
//! - Not be `.` or `..`, nor start with `.`
//! - Not contain `/`, `\` or NUL

use crate::error::KvdbError;
use std::fmt;

/// Maximum length of a database name in bytes
pub const MAX_DB_NAME_LENGTH: usize = 255;

/// Error when validating a database name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbNameError {
    /// Name is empty
    Empty,
    /// Name exceeds maximum length
    TooLong {
        /// Actual length of the name in bytes
        length: usize,
        /// Maximum allowed length
        max: usize,
    },
    /// Name contains a path separator or NUL
    InvalidChar {
        /// The invalid character
        char: char,
        /// Byte position of the invalid character
        position: usize,
    },
    /// Name starts with a dot
    Hidden,
}

impl fmt::Display for DbNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbNameError::Empty => write!(f, "database name cannot be empty"),
            DbNameError::TooLong { length, max } => {
                write!(f, "database name too long: {} bytes (max {})", length, max)
            }
            DbNameError::InvalidChar { char, position } => {
                write!(
                    f,
                    "invalid character {:?} at position {} in database name",
                    char, position
                )
            }
            DbNameError::Hidden => write!(f, "database name cannot start with '.'"),
        }
    }
}

impl std::error::Error for DbNameError {}

impl From<DbNameError> for KvdbError {
    fn from(e: DbNameError) -> Self {
        KvdbError::InvalidArgument(e.to_string())
    }
}

/// Validate a database name
pub fn validate_db_name(name: &str) -> Result<(), DbNameError> {
    if name.is_empty() {
        return Err(DbNameError::Empty);
    }

    if name.len() > MAX_DB_NAME_LENGTH {
        return Err(DbNameError::TooLong {
            length: name.len(),
            max: MAX_DB_NAME_LENGTH,
        });
    }

    // Covers "." and ".." as well
    if name.starts_with('.') {
        return Err(DbNameError::Hidden);
    }

    if let Some((position, char)) = name
        .char_indices()
        .find(|(_, c)| matches!(c, '/' | '\\' | '\0'))
    {
        return Err(DbNameError::InvalidChar { char, position });
    }

    Ok(())
}
