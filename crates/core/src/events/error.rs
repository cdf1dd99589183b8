//! Errors raised while delivering change events to handlers.

use solaris_shared::types::EventId;
use thiserror::Error;

use crate::store::StoreError;

/// Handler failure. The dispatcher records it on the outbox event and
/// retries the delivery later.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The event does not carry what the handler needs.
    #[error("Evento {event_id} inválido para {handler}: {reason}")]
    InvalidEvent {
        /// Event being delivered.
        event_id: EventId,
        /// Handler name.
        handler: &'static str,
        /// What is missing.
        reason: String,
    },

    /// Store failure inside the handler transaction.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProcessError {
    /// Returns the error code for logs and API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEvent { .. } => "invalid-argument",
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidEvent { .. } => 400,
            Self::Store(e) => e.status_code(),
        }
    }

    /// An invalid event fails the same way on every attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidEvent { .. } => false,
            Self::Store(e) => e.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_retry() {
        let invalid = ProcessError::InvalidEvent {
            event_id: EventId::new(),
            handler: "financeiro_mensal",
            reason: "sem lançamento".into(),
        };
        assert_eq!(invalid.error_code(), "invalid-argument");
        assert_eq!(invalid.status_code(), 400);
        assert!(!invalid.is_retryable());

        let store = ProcessError::from(StoreError::Backend("connection reset".into()));
        assert_eq!(store.error_code(), "internal");
        assert_eq!(store.status_code(), 500);
        assert!(store.is_retryable());
    }
}
