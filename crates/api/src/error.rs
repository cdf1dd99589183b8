//! API error responses.
//!
//! Every failure renders as `{"error": <code>, "message": <text>}` with the
//! status of the underlying taxonomy. Internal failures are logged and their
//! details kept out of the body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use solaris_core::ledger::LedgerError;
use solaris_core::store::StoreError;
use solaris_core::workflow::WorkflowError;
use solaris_shared::AppError;

const INTERNAL_MESSAGE: &str = "Erro interno ao processar a solicitação.";

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// State-machine RPC failure.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Entry write or read failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Failure raised by the HTTP layer itself (bad path, foreign tenant, ...).
    #[error("{}", .0.message())]
    App(#[from] AppError),
}

impl ApiError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Workflow(e) => e.error_code(),
            Self::Ledger(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
            Self::App(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        let code = match self {
            Self::Workflow(e) => e.status_code(),
            Self::Ledger(e) => e.status_code(),
            Self::Store(e) => e.status_code(),
            Self::App(e) => e.status_code(),
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(json!({
                "error": self.error_code(),
                "message": message,
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use solaris_core::ledger::types::EntryStatus;
    use solaris_shared::types::EntryId;

    #[rstest]
    #[case(ApiError::Workflow(WorkflowError::MissingIdentifiers), 400, "invalid-argument")]
    #[case(ApiError::Workflow(WorkflowError::Unauthenticated), 403, "permission-denied")]
    #[case(ApiError::Workflow(WorkflowError::EntryNotFound(EntryId::new())), 404, "not-found")]
    #[case(
        ApiError::Workflow(WorkflowError::NotPendingForCancel { status: EntryStatus::Pago }),
        412,
        "failed-precondition"
    )]
    #[case(ApiError::Store(StoreError::Conflict("x".into())), 409, "aborted")]
    #[case(ApiError::Store(StoreError::Backend("x".into())), 500, "internal")]
    #[case(ApiError::App(AppError::InvalidArgument("x".into())), 400, "invalid-argument")]
    #[case(ApiError::App(AppError::PermissionDenied("x".into())), 403, "permission-denied")]
    #[case(ApiError::App(AppError::NotFound("x".into())), 404, "not-found")]
    fn test_error_mapping(#[case] err: ApiError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status_code().as_u16(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_app_error_message_has_no_variant_prefix() {
        let err = ApiError::from(AppError::NotFound("Sem movimento em 2026-01.".into()));
        assert_eq!(err.to_string(), "Sem movimento em 2026-01.");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let response = ApiError::Store(StoreError::Backend("password=hunter2".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
