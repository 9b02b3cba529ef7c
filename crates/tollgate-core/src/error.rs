//! Error types for `tollgate-core`.
//!
//! All fallible operations in the core library return [`CoreResult<T>`],
//! which is an alias for `Result<T, CoreError>`.
//!
//! Invalid credentials are *not* errors: [`crate::CredentialStore::validate`]
//! reports them as `Ok(false)`. A `CoreError` always means a fault in the
//! configuration source or an internal dependency.

use std::path::PathBuf;

/// Unified error type for all core operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The credentials file does not exist.
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    /// The process lacks permission to read the credentials file.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The credentials file is malformed at the given (1-based) line.
    #[error("config parse error at line {line}: {message}")]
    ConfigParse { line: usize, message: String },

    /// A reload produced no tenants while tenants were previously configured,
    /// typically a file caught mid-write.
    #[error("credentials source is empty: {0}")]
    EmptySource(PathBuf),

    /// A tenant identity string is not a canonical hyphenated UUID.
    #[error("invalid tenant id: {0}")]
    InvalidTenantId(String),

    /// The filesystem watch could not be established.
    #[error("watch error: {0}")]
    Watch(String),

    /// An internal dependency (hashing routine, worker thread) failed.
    #[error("internal error: {0}")]
    Internal(String),

    /// An I/O error that doesn't fit a more specific variant.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<notify::Error> for CoreError {
    fn from(e: notify::Error) -> Self {
        CoreError::Watch(e.to_string())
    }
}

/// Convenience alias used throughout `tollgate-core`.
pub type CoreResult<T> = Result<T, CoreError>;
