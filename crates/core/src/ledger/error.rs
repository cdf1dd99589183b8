//! Ledger error types for entry writes.
//!
//! Status transitions have their own taxonomy in
//! [`crate::workflow::WorkflowError`]; this module covers the plain
//! document operations (create, update, delete, read).

use solaris_shared::types::EntryId;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during entry writes and reads.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry value is negative or not a number.
    #[error("Valor do lançamento inválido: {0}")]
    InvalidAmount(String),

    /// Unknown `tipo`.
    #[error("Tipo de lançamento inválido: {0}")]
    InvalidKind(String),

    /// Unknown `status`, or a status an entry cannot be created with.
    #[error("Status de lançamento inválido: {0}")]
    InvalidStatus(String),

    /// A date field could not be normalized.
    #[error("Data inválida em {0}")]
    InvalidDate(&'static str),

    // ========== State Errors ==========
    /// Entry not found.
    #[error("Lançamento não encontrado.")]
    EntryNotFound(EntryId),

    // ========== Store Errors ==========
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) | Self::InvalidKind(_) | Self::InvalidStatus(_) | Self::InvalidDate(_) => {
                "invalid-argument"
            }
            Self::EntryNotFound(_) => "not-found",
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount(_) | Self::InvalidKind(_) | Self::InvalidStatus(_) | Self::InvalidDate(_) => 400,

            // 404 Not Found
            Self::EntryNotFound(_) => 404,

            Self::Store(e) => e.status_code(),
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::InvalidAmount("-1".into()).error_code(), "invalid-argument");
        assert_eq!(LedgerError::InvalidDate("data_vencimento").error_code(), "invalid-argument");
        assert_eq!(LedgerError::EntryNotFound(EntryId::new()).error_code(), "not-found");
        assert_eq!(LedgerError::Store(StoreError::Conflict("x".into())).error_code(), "aborted");
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::InvalidKind("TRANSFER".into()).status_code(), 400);
        assert_eq!(LedgerError::EntryNotFound(EntryId::new()).status_code(), 404);
        assert_eq!(LedgerError::Store(StoreError::Backend("down".into())).status_code(), 500);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LedgerError::Store(StoreError::Conflict("x".into())).is_retryable());
        assert!(!LedgerError::InvalidStatus("ESTORNADO".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            LedgerError::InvalidAmount("abc".into()).to_string(),
            "Valor do lançamento inválido: abc"
        );
        assert_eq!(LedgerError::EntryNotFound(EntryId::new()).to_string(), "Lançamento não encontrado.");
    }
}
