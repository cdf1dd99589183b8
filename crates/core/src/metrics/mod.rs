//! Derived financial metrics.
//!
//! Reducers are pure functions of an entry snapshot, the ledger calendar and
//! an evaluation instant. The service adds snapshot loading and caching.

pub mod cache;
pub mod reducers;
pub mod service;
pub mod types;

pub use cache::{MetricsCache, Snapshot};
pub use reducers::LedgerView;
pub use service::{Comparativos, MetricsService};
pub use types::{
    CategoryAmount, Comparativo, ComparativoMes, DashboardSummary, DreComparativo, DreResumo, IndicadoresEstrategicos,
    MethodAmount, MonthlyChartData, PaymentMethod, PeriodoResumo, RankingComparativo, RankingEntry, RelatorioFiltrado,
    RelatorioPeriodo, ResumoFinanceiro, SalesBreakdown, Totals,
};
