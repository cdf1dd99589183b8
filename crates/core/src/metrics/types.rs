//! Metric result types.
//!
//! Field names serialize in camelCase, the shape dashboards consume.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::types::Entry;

/// Normalized payment method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    Dinheiro,
    CartaoCredito,
    CartaoDebito,
    Boleto,
    Transferencia,
    /// Any other code, kept verbatim.
    #[serde(untagged)]
    Other(String),
}

impl PaymentMethod {
    /// Normalizes a stored method code. Missing or blank codes read as cash.
    #[must_use]
    pub fn normalize(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::Dinheiro;
        };
        match raw.to_lowercase().as_str() {
            "cartao_credito" | "credito" | "credit_card" => Self::CartaoCredito,
            "cartao_debito" | "debito" | "debit_card" => Self::CartaoDebito,
            "pix" => Self::Pix,
            "dinheiro" | "cash" => Self::Dinheiro,
            "boleto" => Self::Boleto,
            "transferencia" | "transfer" => Self::Transferencia,
            _ => Self::Other(raw.to_string()),
        }
    }

    /// Stable code, as grouped in reports.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Pix => "pix",
            Self::Dinheiro => "dinheiro",
            Self::CartaoCredito => "cartao_credito",
            Self::CartaoDebito => "cartao_debito",
            Self::Boleto => "boleto",
            Self::Transferencia => "transferencia",
            Self::Other(code) => code,
        }
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Pix => "PIX",
            Self::Dinheiro => "Dinheiro",
            Self::CartaoCredito => "Cartão de Crédito",
            Self::CartaoDebito => "Cartão de Débito",
            Self::Boleto => "Boleto",
            Self::Transferencia => "Transferência",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Inflows, outflows and their difference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub entradas: Decimal,
    pub saidas: Decimal,
    pub saldo: Decimal,
}

impl Totals {
    #[must_use]
    pub fn new(entradas: Decimal, saidas: Decimal) -> Self {
        Self {
            entradas,
            saidas,
            saldo: entradas.saturating_sub(saidas),
        }
    }
}

/// Headline figures of the financial dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub caixa_atual: Decimal,
    pub entradas_dia: Decimal,
    pub entradas_mes: Decimal,
    pub saidas_mes: Decimal,
    pub saldo_projetado: Decimal,
    pub resultado_periodo: Decimal,
}

/// Realized balance and expected flows of a filtered period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumoFinanceiro {
    pub saldo_realizado: Decimal,
    pub previsao_entrada: Decimal,
    pub previsao_saida: Decimal,
}

/// Entries of a period with their summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatorioFiltrado {
    pub lancamentos: Vec<Entry>,
    pub resumo: ResumoFinanceiro,
}

/// Accrual totals of a report period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodoResumo {
    pub total_entradas: Decimal,
    pub total_saidas: Decimal,
    pub saldo: Decimal,
    /// Requested start of the period.
    pub date: DateTime<Utc>,
}

/// Amount grouped by category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAmount {
    pub category: String,
    pub amount: Decimal,
}

/// Amount grouped by payment method label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodAmount {
    pub method: String,
    pub amount: Decimal,
}

/// Period report over confirmed entries by competência.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatorioPeriodo {
    pub resumo: PeriodoResumo,
    pub lancamentos: Vec<Entry>,
    pub total_transacoes: usize,
    pub category_entries: Vec<CategoryAmount>,
    pub payment_method_entries: Vec<MethodAmount>,
    pub average_entradas: Decimal,
    pub average_saidas: Decimal,
    pub max_amount_for_percentage: Decimal,
}

/// Confirmed inflows by payment method bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesBreakdown {
    pub debito: Decimal,
    pub credito: Decimal,
    pub pix: Decimal,
    pub dinheiro: Decimal,
    pub boleto: Decimal,
    pub transferencias: Decimal,
}

/// Twelve months of realized inflows against a monthly target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyChartData {
    pub labels: Vec<String>,
    pub realized: Vec<Decimal>,
    pub remaining: Vec<Decimal>,
    /// `[bottom, top]` of the marker bar drawn at the top of each realized bar.
    pub marker: Vec<[Decimal; 2]>,
}

/// Two values with their share of the larger magnitude, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparativo {
    pub primary_value: Decimal,
    pub secondary_value: Decimal,
    pub primary_percent: Decimal,
    pub secondary_percent: Decimal,
}

/// Simplified income statement of a month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreResumo {
    pub receita_bruta: Decimal,
    pub despesas: Decimal,
    pub resultado_operacional: Decimal,
    /// `resultado / receita`, zero without revenue.
    pub margem: Decimal,
}

/// Current and previous month statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DreComparativo {
    pub atual: DreResumo,
    pub anterior: DreResumo,
}

/// A figure for the current and the previous month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparativoMes {
    pub atual: Decimal,
    pub anterior: Decimal,
}

/// One ranking line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub label: String,
    pub amount: Decimal,
}

/// Rankings for the current and the previous month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingComparativo {
    pub atual: Vec<RankingEntry>,
    pub anterior: Vec<RankingEntry>,
}

/// Month-over-month business indicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicadoresEstrategicos {
    pub ticket_medio: ComparativoMes,
    pub conversao_os: ComparativoMes,
    pub receita_por_cliente: RankingComparativo,
    pub receita_por_servico: RankingComparativo,
}
