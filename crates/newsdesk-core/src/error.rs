//! Error types for newsdesk.

use thiserror::Error;

/// Result type alias using newsdesk's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for newsdesk operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// News record not found
    #[error("News not found: {0}")]
    NewsNotFound(uuid::Uuid),

    /// Caller lacks the scope required for the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Result cache backend failed
    #[error("Cache error: {0}")]
    Cache(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification callers use to pick a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Forbidden,
    NotFound,
    InvalidInput,
    Internal,
}

impl Error {
    /// Collapse the variant into the kind a transport layer maps to a status.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::NotFound(_) | Error::NewsNotFound(_) => ErrorKind::NotFound,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Database(_)
            | Error::Cache(_)
            | Error::Serialization(_)
            | Error::Config(_)
            | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Access denial with the standard message.
    pub fn permission_denied() -> Self {
        Error::Forbidden("permission denied".to_string())
    }

    /// Wrap a backend failure as `Internal`, prefixed with the operation that failed.
    ///
    /// Authorization, lookup and validation errors pass through untouched so the
    /// caller can still tell them apart.
    pub fn internal_context(self, op: &str) -> Self {
        match self.kind() {
            ErrorKind::Internal => Error::Internal(format!("{}: {}", op, self)),
            _ => self,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
