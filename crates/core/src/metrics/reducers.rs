//! Pure reducers over a tenant's entries.
//!
//! Every figure is derived from the same entry snapshot. Realized figures
//! use [`classify::is_confirmed`](crate::ledger::classify::is_confirmed)
//! and the accrual date rule shared with the monthly rollups, so both paths
//! agree on what counts and where.
//!
//! Basis per figure:
//! - cash position: confirmed entries, all time
//! - day/month cash totals: confirmed entries by payment date
//! - accrual results: confirmed entries by competência
//! - projections: pending entries due strictly after now
//!
//! Sums saturate at the `Decimal` bounds and divisions that cannot be
//! represented read as zero, so a reducer never panics on stored data.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::types::{
    CategoryAmount, Comparativo, ComparativoMes, DashboardSummary, DreComparativo, DreResumo, IndicadoresEstrategicos,
    MethodAmount, MonthlyChartData, PaymentMethod, PeriodoResumo, RankingComparativo, RankingEntry, RelatorioFiltrado,
    RelatorioPeriodo, ResumoFinanceiro, SalesBreakdown, Totals,
};
use crate::ledger::calendar::{DateRange, LedgerCalendar};
use crate::ledger::classify::{accrues_within, competence_of, is_confirmed, settled_within};
use crate::ledger::types::{Entry, EntryKind};

/// Month labels of the yearly chart.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

/// Ranking length.
pub const RANKING_SIZE: usize = 5;

const NO_CLIENT: &str = "Sem cliente";
const NO_CATEGORY: &str = "Sem categoria";

/// Height of the realized-series marker relative to the tallest month.
const MARKER_RATIO: Decimal = Decimal::from_parts(2, 0, 0, false, 2);

fn sum<'a>(entries: impl Iterator<Item = &'a Entry>) -> Decimal {
    entries.fold(Decimal::ZERO, |acc, e| acc.saturating_add(e.amount))
}

/// Sums amounts per label, keeping first-seen order, then sorts by amount
/// descending. Ties keep first-seen order.
fn group_sum<'a, F>(entries: impl Iterator<Item = &'a Entry>, label: F) -> Vec<(String, Decimal)>
where
    F: Fn(&Entry) -> String,
{
    let mut groups: Vec<(String, Decimal)> = Vec::new();
    for entry in entries {
        let key = label(entry);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, amount)) => *amount = amount.saturating_add(entry.amount),
            None => groups.push((key, entry.amount)),
        }
    }
    groups.sort_by(|a, b| b.1.cmp(&a.1));
    groups
}

fn label_or(value: Option<&str>, fallback: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

fn percent_of(value: Decimal, base: Decimal) -> Decimal {
    ratio(value.abs(), base)
        .checked_mul(Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::ZERO)
}

fn comparativo(primary: Decimal, secondary: Decimal) -> Comparativo {
    let base = primary.abs().max(secondary.abs()).max(Decimal::ONE);
    Comparativo {
        primary_value: primary,
        secondary_value: secondary,
        primary_percent: percent_of(primary, base),
        secondary_percent: percent_of(secondary, base),
    }
}

/// A tenant's entries as seen at one instant in one calendar.
#[derive(Debug, Clone, Copy)]
pub struct LedgerView<'a> {
    entries: &'a [Entry],
    calendar: LedgerCalendar,
    now: DateTime<Utc>,
}

impl<'a> LedgerView<'a> {
    #[must_use]
    pub const fn new(entries: &'a [Entry], calendar: LedgerCalendar, now: DateTime<Utc>) -> Self {
        Self { entries, calendar, now }
    }

    /// The snapshot this view reduces.
    #[must_use]
    pub const fn entries(&self) -> &'a [Entry] {
        self.entries
    }

    /// Inclusive range from the start of `inicio` to the end of `fim`, in local days.
    #[must_use]
    pub fn period(&self, inicio: NaiveDate, fim: NaiveDate) -> DateRange {
        self.calendar.days_range(inicio, fim)
    }

    fn confirmed(&self, kind: EntryKind) -> impl Iterator<Item = &'a Entry> {
        self.entries
            .iter()
            .filter(move |e| e.kind == kind && is_confirmed(e))
    }

    fn settled(&self, kind: EntryKind, range: DateRange) -> impl Iterator<Item = &'a Entry> {
        self.entries
            .iter()
            .filter(move |e| settled_within(e, kind, &range))
    }

    fn accrued(&self, kind: EntryKind, range: DateRange) -> impl Iterator<Item = &'a Entry> {
        self.entries
            .iter()
            .filter(move |e| accrues_within(e, kind, &range))
    }

    // ========== Cash position ==========

    /// Confirmed inflows, all time.
    #[must_use]
    pub fn entradas_confirmadas(&self) -> Decimal {
        sum(self.confirmed(EntryKind::Entrada))
    }

    /// Confirmed outflows, all time.
    #[must_use]
    pub fn saidas_confirmadas(&self) -> Decimal {
        sum(self.confirmed(EntryKind::Saida))
    }

    /// Realized cash position.
    #[must_use]
    pub fn caixa_atual(&self) -> Decimal {
        self.entradas_confirmadas()
            .saturating_sub(self.saidas_confirmadas())
    }

    /// Confirmed amount of `kind` paid within `range`.
    #[must_use]
    pub fn settled_total(&self, kind: EntryKind, range: DateRange) -> Decimal {
        sum(self.settled(kind, range))
    }

    /// Confirmed amount of `kind` accrued within `range`.
    #[must_use]
    pub fn accrued_total(&self, kind: EntryKind, range: DateRange) -> Decimal {
        sum(self.accrued(kind, range))
    }

    #[must_use]
    pub fn entradas_dia(&self) -> Decimal {
        self.settled_total(EntryKind::Entrada, self.calendar.day_range(self.now))
    }

    #[must_use]
    pub fn saidas_dia(&self) -> Decimal {
        self.settled_total(EntryKind::Saida, self.calendar.day_range(self.now))
    }

    #[must_use]
    pub fn entradas_mes(&self) -> Decimal {
        self.settled_total(EntryKind::Entrada, self.calendar.month_range(self.now))
    }

    #[must_use]
    pub fn saidas_mes(&self) -> Decimal {
        self.settled_total(EntryKind::Saida, self.calendar.month_range(self.now))
    }

    // ========== Projection ==========

    /// Pending amount of `kind` due strictly after `base`. Overdue
    /// pendencies are not part of the future.
    #[must_use]
    pub fn pending_after(&self, kind: EntryKind, base: DateTime<Utc>) -> Decimal {
        sum(self
            .entries
            .iter()
            .filter(|e| e.kind == kind && e.is_pending())
            .filter(|e| e.due_date.is_some_and(|due| due > base)))
    }

    #[must_use]
    pub fn pendentes_entrada(&self) -> Decimal {
        self.pending_after(EntryKind::Entrada, self.now)
    }

    #[must_use]
    pub fn pendentes_saida(&self) -> Decimal {
        self.pending_after(EntryKind::Saida, self.now)
    }

    /// Cash position plus future pending inflows minus future pending outflows.
    #[must_use]
    pub fn saldo_projetado(&self) -> Decimal {
        self.caixa_atual()
            .saturating_add(self.pendentes_entrada())
            .saturating_sub(self.pendentes_saida())
    }

    // ========== Accrual ==========

    /// Accrual result of the current month.
    #[must_use]
    pub fn resultado_periodo(&self) -> Decimal {
        let month = self.calendar.month_range(self.now);
        self.accrued_total(EntryKind::Entrada, month)
            .saturating_sub(self.accrued_total(EntryKind::Saida, month))
    }

    /// Same figure as [`LedgerView::resultado_periodo`].
    #[must_use]
    pub fn resultado_competencia(&self) -> Decimal {
        self.resultado_periodo()
    }

    // ========== Summaries ==========

    fn settled_totals(&self, range: DateRange) -> Totals {
        Totals::new(
            self.settled_total(EntryKind::Entrada, range),
            self.settled_total(EntryKind::Saida, range),
        )
    }

    fn accrued_totals(&self, range: DateRange) -> Totals {
        Totals::new(
            self.accrued_total(EntryKind::Entrada, range),
            self.accrued_total(EntryKind::Saida, range),
        )
    }

    /// Cash totals of today.
    #[must_use]
    pub fn resumo_dia(&self) -> Totals {
        self.settled_totals(self.calendar.day_range(self.now))
    }

    /// Cash totals of the current month.
    #[must_use]
    pub fn resumo_mes(&self) -> Totals {
        self.settled_totals(self.calendar.month_range(self.now))
    }

    /// Accrual totals of a period.
    #[must_use]
    pub fn periodo_resumo(&self, range: DateRange) -> Totals {
        self.accrued_totals(range)
    }

    /// Cash totals of a period.
    #[must_use]
    pub fn resumo_pagamento(&self, range: DateRange) -> Totals {
        self.settled_totals(range)
    }

    #[must_use]
    pub fn dashboard(&self) -> DashboardSummary {
        DashboardSummary {
            caixa_atual: self.caixa_atual(),
            entradas_dia: self.entradas_dia(),
            entradas_mes: self.entradas_mes(),
            saidas_mes: self.saidas_mes(),
            saldo_projetado: self.saldo_projetado(),
            resultado_periodo: self.resultado_periodo(),
        }
    }

    // ========== Comparisons ==========

    /// Realized position against projected balance.
    #[must_use]
    pub fn comparativo_realizado_projetado(&self) -> Comparativo {
        comparativo(self.caixa_atual(), self.saldo_projetado())
    }

    /// Month inflows against month outflows, by payment date.
    #[must_use]
    pub fn comparativo_entradas_saidas_mes(&self) -> Comparativo {
        comparativo(self.entradas_mes(), self.saidas_mes())
    }

    fn dre(&self, range: DateRange) -> DreResumo {
        let receita_bruta = self.accrued_total(EntryKind::Entrada, range);
        let despesas = self.accrued_total(EntryKind::Saida, range);
        let resultado_operacional = receita_bruta.saturating_sub(despesas);
        let margem = if receita_bruta > Decimal::ZERO {
            ratio(resultado_operacional, receita_bruta)
        } else {
            Decimal::ZERO
        };
        DreResumo {
            receita_bruta,
            despesas,
            resultado_operacional,
            margem,
        }
    }

    /// Income statement of the current and the previous month.
    #[must_use]
    pub fn dre_comparativo(&self) -> DreComparativo {
        DreComparativo {
            atual: self.dre(self.calendar.month_range(self.now)),
            anterior: self.dre(self.calendar.previous_month_range(self.now)),
        }
    }

    /// Share of inflows accrued in `range` that are confirmed.
    fn conversao(&self, range: DateRange) -> Decimal {
        let base: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|e| e.kind == EntryKind::Entrada && range.contains_opt(competence_of(e)))
            .collect();
        let confirmed = base.iter().filter(|e| is_confirmed(e)).count();
        ratio(Decimal::from(confirmed), Decimal::from(base.len()))
    }

    fn ranking<F>(entries: &[&Entry], label: F) -> Vec<RankingEntry>
    where
        F: Fn(&Entry) -> String,
    {
        group_sum(entries.iter().copied(), label)
            .into_iter()
            .take(RANKING_SIZE)
            .map(|(label, amount)| RankingEntry { label, amount })
            .collect()
    }

    /// Ticket, conversion and top-5 rankings for this month and the last.
    #[must_use]
    pub fn indicadores_estrategicos(&self) -> IndicadoresEstrategicos {
        let atual_range = self.calendar.month_range(self.now);
        let anterior_range = self.calendar.previous_month_range(self.now);
        let atual: Vec<&Entry> = self.settled(EntryKind::Entrada, atual_range).collect();
        let anterior: Vec<&Entry> = self.settled(EntryKind::Entrada, anterior_range).collect();

        let ticket = |entries: &[&Entry]| {
            ratio(sum(entries.iter().copied()), Decimal::from(entries.len()))
        };
        let by_client = |e: &Entry| label_or(e.client_name.as_deref(), NO_CLIENT);
        let by_category = |e: &Entry| label_or(e.category.as_deref(), NO_CATEGORY);

        IndicadoresEstrategicos {
            ticket_medio: ComparativoMes {
                atual: ticket(&atual),
                anterior: ticket(&anterior),
            },
            conversao_os: ComparativoMes {
                atual: self.conversao(atual_range),
                anterior: self.conversao(anterior_range),
            },
            receita_por_cliente: RankingComparativo {
                atual: Self::ranking(&atual, by_client),
                anterior: Self::ranking(&anterior, by_client),
            },
            receita_por_servico: RankingComparativo {
                atual: Self::ranking(&atual, by_category),
                anterior: Self::ranking(&anterior, by_category),
            },
        }
    }

    // ========== Reports ==========

    /// Entries whose reference date falls in `range`: payment date for
    /// confirmed entries, due date otherwise.
    #[must_use]
    pub fn filtrar_relatorio(&self, range: DateRange) -> RelatorioFiltrado {
        let lancamentos: Vec<Entry> = self
            .entries
            .iter()
            .filter(|e| {
                let base = if is_confirmed(e) { e.payment_date } else { e.due_date };
                range.contains_opt(base)
            })
            .cloned()
            .collect();

        let mut resumo = ResumoFinanceiro::default();
        for entry in &lancamentos {
            if is_confirmed(entry) && range.contains_opt(entry.payment_date) {
                match entry.kind {
                    EntryKind::Entrada => {
                        resumo.saldo_realizado = resumo.saldo_realizado.saturating_add(entry.amount);
                    }
                    EntryKind::Saida => {
                        resumo.saldo_realizado = resumo.saldo_realizado.saturating_sub(entry.amount);
                    }
                }
            } else if entry.is_pending() && range.contains_opt(entry.due_date) {
                match entry.kind {
                    EntryKind::Entrada => {
                        resumo.previsao_entrada = resumo.previsao_entrada.saturating_add(entry.amount);
                    }
                    EntryKind::Saida => {
                        resumo.previsao_saida = resumo.previsao_saida.saturating_add(entry.amount);
                    }
                }
            }
        }

        RelatorioFiltrado { lancamentos, resumo }
    }

    /// Confirmed inflows paid within `range`, by payment method bucket.
    /// Unrecognized methods count as cash.
    #[must_use]
    pub fn sales_breakdown(&self, range: DateRange) -> SalesBreakdown {
        let mut breakdown = SalesBreakdown::default();
        for entry in self.settled(EntryKind::Entrada, range) {
            let bucket = match PaymentMethod::normalize(entry.payment_method.as_deref()) {
                PaymentMethod::CartaoDebito => &mut breakdown.debito,
                PaymentMethod::CartaoCredito => &mut breakdown.credito,
                PaymentMethod::Pix => &mut breakdown.pix,
                PaymentMethod::Boleto => &mut breakdown.boleto,
                PaymentMethod::Transferencia => &mut breakdown.transferencias,
                PaymentMethod::Dinheiro | PaymentMethod::Other(_) => &mut breakdown.dinheiro,
            };
            *bucket = bucket.saturating_add(entry.amount);
        }
        breakdown
    }

    /// Realized inflows per month of `year`, by payment date, against `target`.
    ///
    /// A negative target reads as zero.
    #[must_use]
    pub fn monthly_chart_data(&self, year: i32, target: Decimal) -> MonthlyChartData {
        let mut realized = [Decimal::ZERO; 12];
        for entry in self.confirmed(EntryKind::Entrada) {
            let Some(paid) = entry.payment_date else {
                continue;
            };
            let local = self.calendar.local_date(paid);
            if local.year() == year {
                let month = &mut realized[local.month0() as usize];
                *month = month.saturating_add(entry.amount);
            }
        }

        let target = target.max(Decimal::ZERO);
        let remaining = realized
            .iter()
            .map(|v| target.saturating_sub(*v).max(Decimal::ZERO))
            .collect();
        let max_realized = realized
            .iter()
            .copied()
            .fold(target.max(Decimal::ONE), Decimal::max);
        let marker_height = max_realized
            .checked_mul(MARKER_RATIO)
            .unwrap_or(max_realized)
            .max(Decimal::ONE);
        let marker = realized
            .iter()
            .map(|v| {
                if *v > Decimal::ZERO {
                    [v.saturating_sub(marker_height).max(Decimal::ZERO), *v]
                } else {
                    [Decimal::ZERO, Decimal::ZERO]
                }
            })
            .collect();

        MonthlyChartData {
            labels: MONTH_LABELS.iter().map(ToString::to_string).collect(),
            realized: realized.to_vec(),
            remaining,
            marker,
        }
    }

    /// Report over confirmed entries accrued within `range`.
    #[must_use]
    pub fn relatorio_periodo(&self, range: DateRange) -> RelatorioPeriodo {
        let confirmados: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|e| is_confirmed(e) && range.contains_opt(competence_of(e)))
            .collect();
        let entradas: Vec<&Entry> = confirmados
            .iter()
            .copied()
            .filter(|e| e.kind == EntryKind::Entrada)
            .collect();
        let saidas: Vec<&Entry> = confirmados
            .iter()
            .copied()
            .filter(|e| e.kind == EntryKind::Saida)
            .collect();

        let total_entradas = sum(entradas.iter().copied());
        let total_saidas = sum(saidas.iter().copied());

        let categories = group_sum(confirmados.iter().copied(), |e| {
            label_or(e.category.as_deref(), NO_CATEGORY)
        });
        let methods = group_sum(entradas.iter().copied(), |e| {
            PaymentMethod::normalize(e.payment_method.as_deref()).code().to_string()
        });

        let max_amount_for_percentage = categories
            .iter()
            .chain(methods.iter())
            .map(|(_, amount)| *amount)
            .fold(total_entradas.max(total_saidas).max(Decimal::ZERO), Decimal::max);

        RelatorioPeriodo {
            resumo: PeriodoResumo {
                total_entradas,
                total_saidas,
                saldo: total_entradas.saturating_sub(total_saidas),
                date: range.start,
            },
            total_transacoes: confirmados.len(),
            lancamentos: confirmados.iter().map(|e| (*e).clone()).collect(),
            category_entries: categories
                .into_iter()
                .map(|(category, amount)| CategoryAmount { category, amount })
                .collect(),
            payment_method_entries: methods
                .into_iter()
                .map(|(code, amount)| MethodAmount {
                    method: PaymentMethod::normalize(Some(&code)).label().to_string(),
                    amount,
                })
                .collect(),
            average_entradas: ratio(total_entradas, Decimal::from(entradas.len())),
            average_saidas: ratio(total_saidas, Decimal::from(saidas.len())),
            max_amount_for_percentage,
        }
    }
}
