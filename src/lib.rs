//! # Userstore
//!
//! One user record, five ways to persist it.
//!
//! Userstore keeps a small user record (or list of records) behind a single
//! CRUD-plus-observation contract and lets callers switch the storage backend
//! at runtime without changing how they read, write, or subscribe.
//!
//! ## Backends
//!
//! - Flat key-value file with per-key change listeners (the legacy layout)
//! - Key-value preferences file migrated from the legacy layout
//! - Structured single-record file migrated from the legacy layout
//! - Structured list-of-records file
//! - `SQLite` table
//!
//! ## Example
//!
//! ```rust,ignore
//! use userstore::{Method, StoreConfig, UserRecord, UserRepository, Profession};
//!
//! let mut repo = UserRepository::open(&StoreConfig::load_default())?;
//! repo.set_method(Method::Table);
//! repo.add_user(&UserRecord::new("Ana", "ana@example.com", 7, Profession::Engineer))?;
//! let users = repo.read_users()?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::path::PathBuf;
use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::StoreConfig;
pub use models::{Method, Profession, UserPatch, UserRecord};
pub use services::{UserRepository, UsersStream};
pub use storage::{ListRecordStore, RecordStore, RecordStream};

/// Error type for userstore operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Form validation fails, a list write carries no code |
/// | `OperationFailed` | File writes, `SQLite` statements, config loading fail |
/// | `Corruption` | Stored bytes exist but cannot be decoded |
/// | `NotFound` | Replacing a code that is not in the list |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A form field is blank or cannot be parsed
    /// - A list backend receives a patch without a code
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` statements fail
    /// - Filesystem writes fail
    /// - The configuration file cannot be read or parsed
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Stored data is unreadable.
    ///
    /// Unlike transient read failures, corruption is never replaced by a
    /// default value.
    #[error("corrupt data in {}: {cause}", path.display())]
    Corruption {
        /// File (or database) holding the data.
        path: PathBuf,
        /// Decoder message.
        cause: String,
    },

    /// No record carries the given code.
    #[error("no user with code {0}")]
    NotFound(i32),
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from any displayable cause.
    pub fn operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for userstore operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::OperationFailed {
            operation: "test".to_string(),
            cause: "failed".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'test' failed: failed");

        let err = Error::Corruption {
            path: PathBuf::from("/tmp/user.json"),
            cause: "expected value".to_string(),
        };
        assert_eq!(err.to_string(), "corrupt data in /tmp/user.json: expected value");

        assert_eq!(Error::NotFound(9).to_string(), "no user with code 9");
    }

    #[test]
    fn test_operation_helper() {
        let err = Error::operation("write_file", "disk full");
        assert!(matches!(
            err,
            Error::OperationFailed { ref operation, ref cause }
                if operation == "write_file" && cause == "disk full"
        ));
    }
}
