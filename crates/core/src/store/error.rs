//! Store error types.

use thiserror::Error;

/// Errors raised by a ledger store backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A uniqueness or serialization conflict; the transaction was not applied.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backend failed (connection, query, ...).
    #[error("Store backend error: {0}")]
    Backend(String),

    /// A persisted document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Conflict(_) => "aborted",
            Self::Backend(_) | Self::Serialization(_) => "internal",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Conflict(_) => 409,
            Self::Backend(_) | Self::Serialization(_) => 500,
        }
    }

    /// Returns true if retrying the whole transaction may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Backend(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
