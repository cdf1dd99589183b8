//! Workflow error types for the entry status state machine.
//!
//! Every variant maps onto the RPC error taxonomy through
//! [`WorkflowError::error_code`]. Messages are the ones shown to the caller.

use thiserror::Error;

use crate::ledger::types::EntryStatus;
use crate::store::StoreError;

/// Errors raised by confirm, cancel and reverse.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Tenant or entry id missing from the request.
    #[error("empresaId e lancamentoId são obrigatórios.")]
    MissingIdentifiers,

    /// Requested final status is outside the confirmed set.
    #[error("Status final precisa ser CONFIRMADO, RECEBIDO ou PAGO.")]
    InvalidFinalStatus,

    /// Malformed request field.
    #[error("{0}")]
    InvalidArgument(String),

    /// No authenticated caller.
    #[error("Operação permitida apenas para usuários autenticados.")]
    Unauthenticated,

    /// Authenticated caller is not the backend.
    #[error("Somente o backend está autorizado a executar esta ação.")]
    NotBackendCaller,

    /// Entry does not exist in the tenant.
    #[error("Lançamento não encontrado.")]
    EntryNotFound(solaris_shared::types::EntryId),

    /// Confirm on an entry that is neither pending nor confirmed.
    #[error("Somente lançamentos pendentes podem ser confirmados.")]
    NotPendingForConfirm {
        /// Current status.
        status: EntryStatus,
    },

    /// Cancel on an entry that is neither pending nor cancelled.
    #[error("Somente lançamentos pendentes podem ser cancelados.")]
    NotPendingForCancel {
        /// Current status.
        status: EntryStatus,
    },

    /// Reverse on an entry outside the confirmed set.
    #[error("Somente lançamentos confirmados podem ser estornados.")]
    NotConfirmedForReversal {
        /// Current status.
        status: EntryStatus,
    },

    /// Reverse on an entry whose value is zero.
    #[error("Valor do lançamento inválido para estorno.")]
    InvalidReversalAmount,

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingIdentifiers | Self::InvalidFinalStatus | Self::InvalidArgument(_) => 400,

            Self::Unauthenticated | Self::NotBackendCaller => 403,

            Self::EntryNotFound(_) => 404,

            Self::NotPendingForConfirm { .. }
            | Self::NotPendingForCancel { .. }
            | Self::NotConfirmedForReversal { .. }
            | Self::InvalidReversalAmount => 412,

            Self::Store(e) => e.status_code(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingIdentifiers | Self::InvalidFinalStatus | Self::InvalidArgument(_) => {
                "invalid-argument"
            }
            Self::Unauthenticated | Self::NotBackendCaller => "permission-denied",
            Self::EntryNotFound(_) => "not-found",
            Self::NotPendingForConfirm { .. }
            | Self::NotPendingForCancel { .. }
            | Self::NotConfirmedForReversal { .. }
            | Self::InvalidReversalAmount => "failed-precondition",
            Self::Store(e) => e.error_code(),
        }
    }
}
