//! Financial metrics routes.
//!
//! Every metric is reduced from the tenant's cached entry snapshot. Period
//! endpoints take inclusive local dates `inicio` and `fim` (`YYYY-MM-DD`).

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{ApiError, AppState, middleware::AuthUser};
use solaris_core::metrics::{
    Comparativos, DashboardSummary, DreComparativo, IndicadoresEstrategicos, MonthlyChartData, RelatorioFiltrado,
    RelatorioPeriodo, SalesBreakdown, Totals,
};
use solaris_core::ledger::amount_in_range;
use solaris_core::store::LedgerStore;
use solaris_shared::AppError;
use solaris_shared::types::TenantId;

/// Creates the metrics routes (requires auth middleware to be applied externally).
pub fn routes<S: LedgerStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/empresas/{empresa_id}/financeiro/dashboard", get(dashboard::<S>))
        .route("/empresas/{empresa_id}/financeiro/comparativos", get(comparativos::<S>))
        .route("/empresas/{empresa_id}/financeiro/dre", get(dre::<S>))
        .route("/empresas/{empresa_id}/financeiro/indicadores", get(indicadores::<S>))
        .route("/empresas/{empresa_id}/financeiro/relatorio", get(relatorio::<S>))
        .route("/empresas/{empresa_id}/financeiro/periodo", get(periodo::<S>))
        .route("/empresas/{empresa_id}/financeiro/pagamento", get(pagamento::<S>))
        .route("/empresas/{empresa_id}/financeiro/vendas", get(vendas::<S>))
        .route("/empresas/{empresa_id}/financeiro/relatorio-periodo", get(relatorio_periodo::<S>))
        .route("/empresas/{empresa_id}/financeiro/grafico-mensal", get(grafico_mensal::<S>))
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Inclusive local date range.
#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    /// First day.
    pub inicio: NaiveDate,
    /// Last day.
    pub fim: NaiveDate,
}

/// Query of the yearly chart.
#[derive(Debug, Deserialize)]
pub struct GraficoQuery {
    /// Calendar year, current local year when absent.
    pub ano: Option<i32>,
    /// Monthly revenue target, zero when absent. Must be a storable amount.
    pub meta: Option<Decimal>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn dashboard<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(tenant_id): Path<TenantId>,
) -> Result<Json<DashboardSummary>, ApiError> {
    caller.authorize(tenant_id)?;
    Ok(Json(state.metrics.dashboard(tenant_id, Utc::now()).await?))
}

async fn comparativos<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(tenant_id): Path<TenantId>,
) -> Result<Json<Comparativos>, ApiError> {
    caller.authorize(tenant_id)?;
    Ok(Json(state.metrics.comparativos(tenant_id, Utc::now()).await?))
}

async fn dre<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(tenant_id): Path<TenantId>,
) -> Result<Json<DreComparativo>, ApiError> {
    caller.authorize(tenant_id)?;
    Ok(Json(state.metrics.dre(tenant_id, Utc::now()).await?))
}

async fn indicadores<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(tenant_id): Path<TenantId>,
) -> Result<Json<IndicadoresEstrategicos>, ApiError> {
    caller.authorize(tenant_id)?;
    Ok(Json(state.metrics.indicadores(tenant_id, Utc::now()).await?))
}

async fn relatorio<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(tenant_id): Path<TenantId>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<RelatorioFiltrado>, ApiError> {
    caller.authorize(tenant_id)?;
    Ok(Json(state.metrics.relatorio(tenant_id, query.inicio, query.fim).await?))
}

async fn periodo<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(tenant_id): Path<TenantId>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Totals>, ApiError> {
    caller.authorize(tenant_id)?;
    Ok(Json(state.metrics.periodo(tenant_id, query.inicio, query.fim).await?))
}

async fn pagamento<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(tenant_id): Path<TenantId>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Totals>, ApiError> {
    caller.authorize(tenant_id)?;
    Ok(Json(state.metrics.pagamento(tenant_id, query.inicio, query.fim).await?))
}

async fn vendas<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(tenant_id): Path<TenantId>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<SalesBreakdown>, ApiError> {
    caller.authorize(tenant_id)?;
    Ok(Json(state.metrics.vendas(tenant_id, query.inicio, query.fim).await?))
}

async fn relatorio_periodo<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(tenant_id): Path<TenantId>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<RelatorioPeriodo>, ApiError> {
    caller.authorize(tenant_id)?;
    Ok(Json(
        state
            .metrics
            .relatorio_periodo(tenant_id, query.inicio, query.fim)
            .await?,
    ))
}

async fn grafico_mensal<S: LedgerStore>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(tenant_id): Path<TenantId>,
    Query(query): Query<GraficoQuery>,
) -> Result<Json<MonthlyChartData>, ApiError> {
    caller.authorize(tenant_id)?;
    let year = query
        .ano
        .unwrap_or_else(|| state.calendar().local_date(Utc::now()).year());
    let target = query.meta.unwrap_or(Decimal::ZERO);
    if !amount_in_range(target) {
        return Err(AppError::InvalidArgument(format!("Meta inválida: {target}")).into());
    }
    Ok(Json(state.metrics.grafico_mensal(tenant_id, year, target).await?))
}
