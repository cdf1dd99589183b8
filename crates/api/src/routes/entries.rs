//! Entry routes: manual CRUD, receivables and installment receipt.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::Value;

use crate::{ApiError, AppState, middleware::AuthUser};
use solaris_core::ledger::{Entry, EntryPatch, EntryService, NewEntry};
use solaris_core::store::LedgerStore;
use solaris_core::workflow::{ConfirmCommand, ConfirmOutcome, ConfirmRequest, LedgerOperations};
use solaris_shared::types::{EntryId, TenantId};

/// Creates the entry routes (requires auth middleware to be applied externally).
pub fn routes<S: LedgerStore>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/empresas/{empresa_id}/lancamentos",
            get(list_entries::<S>).post(create_entry::<S>),
        )
        .route(
            "/empresas/{empresa_id}/lancamentos/{lancamento_id}",
            get(get_entry::<S>).patch(update_entry::<S>).delete(delete_entry::<S>),
        )
        .route(
            "/empresas/{empresa_id}/lancamentos/{lancamento_id}/receber",
            post(receber_parcela::<S>),
        )
        .route("/empresas/{empresa_id}/contas-a-receber", get(contas_a_receber::<S>))
}

/// Body of the installment receipt. Everything is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceberRequest {
    /// Payment date in any accepted shape; now when absent.
    #[serde(default)]
    pub data_pagamento: Option<Value>,
    /// Payment method.
    pub metodo_pagamento: Option<String>,
    /// Acting user id recorded on the entry.
    pub usuario_id: Option<String>,
}

async fn list_entries<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(tenant_id): Path<TenantId>,
) -> Result<Json<Vec<Entry>>, ApiError> {
    caller.authorize(tenant_id)?;
    Ok(Json(EntryService::new(state.store.clone()).list(tenant_id).await?))
}

async fn create_entry<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(tenant_id): Path<TenantId>,
    Json(input): Json<NewEntry>,
) -> Result<(StatusCode, Json<Entry>), ApiError> {
    caller.authorize(tenant_id)?;
    let entry = EntryService::new(state.store.clone()).create(tenant_id, input).await?;
    state.touched(tenant_id);
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn get_entry<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path((tenant_id, entry_id)): Path<(TenantId, EntryId)>,
) -> Result<Json<Entry>, ApiError> {
    caller.authorize(tenant_id)?;
    Ok(Json(EntryService::new(state.store.clone()).get(tenant_id, entry_id).await?))
}

async fn update_entry<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path((tenant_id, entry_id)): Path<(TenantId, EntryId)>,
    Json(patch): Json<EntryPatch>,
) -> Result<Json<Entry>, ApiError> {
    caller.authorize(tenant_id)?;
    let entry = EntryService::new(state.store.clone())
        .update(tenant_id, entry_id, patch)
        .await?;
    state.touched(tenant_id);
    Ok(Json(entry))
}

async fn delete_entry<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path((tenant_id, entry_id)): Path<(TenantId, EntryId)>,
) -> Result<StatusCode, ApiError> {
    caller.authorize(tenant_id)?;
    EntryService::new(state.store.clone())
        .delete(tenant_id, entry_id)
        .await?;
    state.touched(tenant_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn receber_parcela<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path((tenant_id, entry_id)): Path<(TenantId, EntryId)>,
    body: Option<Json<ReceberRequest>>,
) -> Result<Json<ConfirmOutcome>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let cmd = ConfirmCommand::try_from(ConfirmRequest {
        empresa_id: Some(tenant_id.to_string()),
        lancamento_id: Some(entry_id.to_string()),
        data_pagamento: body.data_pagamento,
        metodo_pagamento: body.metodo_pagamento,
        usuario_id: body.usuario_id,
        status: None,
    })?;

    let principal = caller.principal();
    let outcome = LedgerOperations::new(state.store.clone())
        .receive_installment(Some(&principal), cmd)
        .await?;
    if !outcome.already_confirmed {
        state.touched(tenant_id);
    }
    Ok(Json(outcome))
}

async fn contas_a_receber<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(tenant_id): Path<TenantId>,
) -> Result<Json<Vec<Entry>>, ApiError> {
    caller.authorize(tenant_id)?;
    Ok(Json(
        EntryService::new(state.store.clone())
            .receivables(tenant_id)
            .await?,
    ))
}
