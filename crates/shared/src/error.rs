//! Application-wide error types.
//!
//! The variants follow the callable-function error taxonomy: each one maps to
//! a stable wire code and an HTTP status.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Required input missing or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No credentials were presented.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Credentials present but insufficient for the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A state-machine guard rejected the operation.
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Concurrent modification detected by the store.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) => 400,
            Self::Unauthenticated(_) => 401,
            Self::PermissionDenied(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::FailedPrecondition(_) => 412,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid-argument",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::PermissionDenied(_) => "permission-denied",
            Self::NotFound(_) => "not-found",
            Self::FailedPrecondition(_) => "failed-precondition",
            Self::Conflict(_) => "aborted",
            Self::Database(_) | Self::Internal(_) => "internal",
        }
    }

    /// Returns the human-readable message without the variant prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidArgument(m)
            | Self::Unauthenticated(m)
            | Self::PermissionDenied(m)
            | Self::NotFound(m)
            | Self::FailedPrecondition(m)
            | Self::Conflict(m)
            | Self::Database(m)
            | Self::Internal(m) => m,
        }
    }
}
