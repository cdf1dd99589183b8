//! Metrics service.
//!
//! Loads a tenant snapshot through the [`MetricsCache`] and reduces it with
//! a [`LedgerView`]. Rollup reads go straight to the store.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use solaris_shared::types::TenantId;
use tracing::debug;

use super::cache::{MetricsCache, Snapshot};
use super::reducers::LedgerView;
use super::types::{
    Comparativo, DashboardSummary, DreComparativo, IndicadoresEstrategicos, MonthlyChartData, RelatorioFiltrado,
    RelatorioPeriodo, SalesBreakdown, Totals,
};
use crate::ledger::calendar::{DateRange, LedgerCalendar, MonthId};
use crate::ledger::error::LedgerError;
use crate::ledger::rollup::MonthlyRollup;
use crate::store::{LedgerStore, StoreError};

/// Both dashboard comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparativos {
    pub realizado_projetado: Comparativo,
    pub entradas_saidas_mes: Comparativo,
}

/// Read side of the ledger.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    store: S,
    cache: MetricsCache,
    calendar: LedgerCalendar,
}

impl<S: LedgerStore> MetricsService<S> {
    pub fn new(store: S, cache: MetricsCache, calendar: LedgerCalendar) -> Self {
        Self { store, cache, calendar }
    }

    /// The cache shared with the dispatcher.
    #[must_use]
    pub fn cache(&self) -> &MetricsCache {
        &self.cache
    }

    #[must_use]
    pub const fn calendar(&self) -> LedgerCalendar {
        self.calendar
    }

    /// Current entry snapshot of a tenant.
    ///
    /// # Errors
    ///
    /// Returns a store error if the snapshot has to be loaded and the load fails.
    pub async fn snapshot(&self, tenant_id: TenantId) -> Result<Snapshot, StoreError> {
        self.cache
            .get_or_load(tenant_id, || async {
                debug!(tenant_id = %tenant_id, "Loading entry snapshot");
                self.store.list_entries(tenant_id).await
            })
            .await
    }

    async fn reduce<R>(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
        reducer: impl FnOnce(&LedgerView<'_>) -> R,
    ) -> Result<R, StoreError> {
        let snapshot = self.snapshot(tenant_id).await?;
        let view = LedgerView::new(&snapshot, self.calendar, now);
        Ok(reducer(&view))
    }

    fn period(&self, inicio: NaiveDate, fim: NaiveDate) -> Result<DateRange, LedgerError> {
        if fim < inicio {
            return Err(LedgerError::InvalidDate("periodo"));
        }
        Ok(self.calendar.days_range(inicio, fim))
    }

    /// Headline figures at `now`.
    ///
    /// # Errors
    ///
    /// Returns a store error if the snapshot cannot be loaded.
    pub async fn dashboard(&self, tenant_id: TenantId, now: DateTime<Utc>) -> Result<DashboardSummary, StoreError> {
        self.reduce(tenant_id, now, |view| view.dashboard()).await
    }

    /// Realized against projected and month inflows against outflows.
    ///
    /// # Errors
    ///
    /// Returns a store error if the snapshot cannot be loaded.
    pub async fn comparativos(&self, tenant_id: TenantId, now: DateTime<Utc>) -> Result<Comparativos, StoreError> {
        self.reduce(tenant_id, now, |view| Comparativos {
            realizado_projetado: view.comparativo_realizado_projetado(),
            entradas_saidas_mes: view.comparativo_entradas_saidas_mes(),
        })
        .await
    }

    /// # Errors
    ///
    /// Returns a store error if the snapshot cannot be loaded.
    pub async fn dre(&self, tenant_id: TenantId, now: DateTime<Utc>) -> Result<DreComparativo, StoreError> {
        self.reduce(tenant_id, now, |view| view.dre_comparativo()).await
    }

    /// # Errors
    ///
    /// Returns a store error if the snapshot cannot be loaded.
    pub async fn indicadores(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<IndicadoresEstrategicos, StoreError> {
        self.reduce(tenant_id, now, |view| view.indicadores_estrategicos()).await
    }

    /// Entries and summary of the local days `inicio..=fim`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDate` if `fim` precedes `inicio`, or a store error.
    pub async fn relatorio(
        &self,
        tenant_id: TenantId,
        inicio: NaiveDate,
        fim: NaiveDate,
    ) -> Result<RelatorioFiltrado, LedgerError> {
        let range = self.period(inicio, fim)?;
        Ok(self.reduce(tenant_id, Utc::now(), |view| view.filtrar_relatorio(range)).await?)
    }

    /// Accrual totals of the local days `inicio..=fim`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDate` if `fim` precedes `inicio`, or a store error.
    pub async fn periodo(&self, tenant_id: TenantId, inicio: NaiveDate, fim: NaiveDate) -> Result<Totals, LedgerError> {
        let range = self.period(inicio, fim)?;
        Ok(self.reduce(tenant_id, Utc::now(), |view| view.periodo_resumo(range)).await?)
    }

    /// Cash totals of the local days `inicio..=fim`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDate` if `fim` precedes `inicio`, or a store error.
    pub async fn pagamento(&self, tenant_id: TenantId, inicio: NaiveDate, fim: NaiveDate) -> Result<Totals, LedgerError> {
        let range = self.period(inicio, fim)?;
        Ok(self.reduce(tenant_id, Utc::now(), |view| view.resumo_pagamento(range)).await?)
    }

    /// # Errors
    ///
    /// Returns `InvalidDate` if `fim` precedes `inicio`, or a store error.
    pub async fn vendas(
        &self,
        tenant_id: TenantId,
        inicio: NaiveDate,
        fim: NaiveDate,
    ) -> Result<SalesBreakdown, LedgerError> {
        let range = self.period(inicio, fim)?;
        Ok(self.reduce(tenant_id, Utc::now(), |view| view.sales_breakdown(range)).await?)
    }

    /// # Errors
    ///
    /// Returns `InvalidDate` if `fim` precedes `inicio`, or a store error.
    pub async fn relatorio_periodo(
        &self,
        tenant_id: TenantId,
        inicio: NaiveDate,
        fim: NaiveDate,
    ) -> Result<RelatorioPeriodo, LedgerError> {
        let range = self.period(inicio, fim)?;
        Ok(self.reduce(tenant_id, Utc::now(), |view| view.relatorio_periodo(range)).await?)
    }

    /// # Errors
    ///
    /// Returns a store error if the snapshot cannot be loaded.
    pub async fn grafico_mensal(
        &self,
        tenant_id: TenantId,
        year: i32,
        target: Decimal,
    ) -> Result<MonthlyChartData, StoreError> {
        self.reduce(tenant_id, Utc::now(), |view| view.monthly_chart_data(year, target))
            .await
    }

    /// Rollup of one month; months without confirmed activity have none.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn rollup(&self, tenant_id: TenantId, month: MonthId) -> Result<Option<MonthlyRollup>, StoreError> {
        self.store.get_rollup(tenant_id, month).await
    }

    /// All rollups of a tenant, ordered by month.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn rollups(&self, tenant_id: TenantId) -> Result<Vec<MonthlyRollup>, StoreError> {
        self.store.list_rollups(tenant_id).await
    }
}
