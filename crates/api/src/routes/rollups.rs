//! Monthly rollup routes (`financeiroMensal`).

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{ApiError, AppState, middleware::AuthUser};
use solaris_core::ledger::calendar::InvalidMonthId;
use solaris_core::ledger::{MonthId, MonthlyRollup};
use solaris_core::store::LedgerStore;
use solaris_shared::AppError;
use solaris_shared::types::TenantId;

/// Creates the rollup routes (requires auth middleware to be applied externally).
pub fn routes<S: LedgerStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/empresas/{empresa_id}/financeiro-mensal", get(list_rollups::<S>))
        .route("/empresas/{empresa_id}/financeiro-mensal/{month_id}", get(get_rollup::<S>))
}

async fn list_rollups<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(tenant_id): Path<TenantId>,
) -> Result<Json<Vec<MonthlyRollup>>, ApiError> {
    caller.authorize(tenant_id)?;
    Ok(Json(state.metrics.rollups(tenant_id).await?))
}

async fn get_rollup<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path((tenant_id, month_id)): Path<(TenantId, String)>,
) -> Result<Json<MonthlyRollup>, ApiError> {
    caller.authorize(tenant_id)?;
    let month: MonthId = month_id
        .parse()
        .map_err(|e: InvalidMonthId| AppError::InvalidArgument(e.to_string()))?;

    state
        .metrics
        .rollup(tenant_id, month)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Sem movimento em {month}.")).into())
}
