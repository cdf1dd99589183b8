//! Callable functions: the status-changing RPCs.
//!
//! Bodies and responses use the callable wire names (`empresaId`,
//! `lancamentoId`, `alreadyConfirmed`, ...). Only backend callers may invoke
//! them; the check runs before anything is read.

use axum::{Json, Router, extract::State, routing::post};

use crate::{ApiError, AppState, middleware::AuthUser};
use solaris_core::store::LedgerStore;
use solaris_shared::types::TenantId;
use solaris_core::workflow::{
    CancelOutcome, CancelRequest, ConfirmOutcome, ConfirmRequest, LedgerOperations, ReverseOutcome, ReverseRequest,
};

/// Creates the callable function routes.
pub fn routes<S: LedgerStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/functions/confirmarLancamento", post(confirmar_lancamento::<S>))
        .route("/functions/cancelarLancamentoPendente", post(cancelar_lancamento::<S>))
        .route("/functions/estornarLancamento", post(estornar_lancamento::<S>))
}

fn request_tenant(raw: Option<&str>) -> Option<TenantId> {
    raw.and_then(|s| s.trim().parse().ok())
}

fn touched<S: LedgerStore>(state: &AppState<S>, tenant: Option<TenantId>) {
    match tenant {
        Some(tenant_id) => state.touched(tenant_id),
        None => state.wake_dispatcher(),
    }
}

async fn confirmar_lancamento<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: Option<AuthUser>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<ConfirmOutcome>, ApiError> {
    let principal = caller.map(|c| c.principal());
    let tenant = request_tenant(request.empresa_id.as_deref());
    let outcome = LedgerOperations::new(state.store.clone())
        .confirm(principal.as_ref(), request)
        .await?;
    if !outcome.already_confirmed {
        touched(&state, tenant);
    }
    Ok(Json(outcome))
}

async fn cancelar_lancamento<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: Option<AuthUser>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<CancelOutcome>, ApiError> {
    let principal = caller.map(|c| c.principal());
    let tenant = request_tenant(request.empresa_id.as_deref());
    let outcome = LedgerOperations::new(state.store.clone())
        .cancel(principal.as_ref(), request)
        .await?;
    if !outcome.already_canceled {
        touched(&state, tenant);
    }
    Ok(Json(outcome))
}

async fn estornar_lancamento<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: Option<AuthUser>,
    Json(request): Json<ReverseRequest>,
) -> Result<Json<ReverseOutcome>, ApiError> {
    let principal = caller.map(|c| c.principal());
    let tenant = request_tenant(request.empresa_id.as_deref());
    let outcome = LedgerOperations::new(state.store.clone())
        .reverse(principal.as_ref(), request)
        .await?;
    if !outcome.already_estornado {
        touched(&state, tenant);
    }
    Ok(Json(outcome))
}
