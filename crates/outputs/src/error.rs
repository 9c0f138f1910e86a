//! Error types for the outputs crate

use foreignkey::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output store operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document is not valid JSON
    #[error("corrupt output document at {location}: {source}")]
    Corrupt {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    /// Env or name cannot be used as a storage key
    #[error("invalid {what} '{value}': must be non-empty and contain no '/', '\\' or '..'")]
    InvalidName { what: &'static str, value: String },

    /// A stored row or directory names a kind this build does not know
    #[error("unknown resource kind in store: {0}")]
    UnknownKind(String),

    /// Store root does not exist or is not a directory
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The connection mutex was poisoned by a panicking thread
    #[error("database connection lock poisoned")]
    LockPoisoned,
}

impl From<Error> for StoreError {
    fn from(err: Error) -> Self {
        StoreError::backend(err)
    }
}

/// Result type for output store operations
pub type Result<T> = std::result::Result<T, Error>;
