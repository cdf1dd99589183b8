//! Ledger domain types for financial entries (lançamentos).
//!
//! This module defines the entry document and the closed enums that
//! drive classification and the status state machine. Field names on
//! the wire follow the persisted document schema.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solaris_shared::types::{EntryId, OrderId, TenantId};
use std::fmt;
use std::str::FromStr;

/// Direction of a financial movement.
///
/// The sign of an entry is implied by its kind; `valor` is never stored negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// Inflow (receita).
    #[default]
    Entrada,
    /// Outflow (despesa).
    Saida,
}

impl EntryKind {
    /// Returns the persisted representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Entrada => "ENTRADA",
            Self::Saida => "SAIDA",
        }
    }

    /// Returns the opposite direction, used by reversals.
    #[must_use]
    pub const fn inverted(self) -> Self {
        match self {
            Self::Entrada => Self::Saida,
            Self::Saida => Self::Entrada,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ENTRADA" => Ok(Self::Entrada),
            "SAIDA" => Ok(Self::Saida),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// Entry status.
///
/// `PENDENTE` is the initial state. `CONFIRMADO`, `RECEBIDO` and `PAGO` form
/// the confirmed set. `CANCELADO` is terminal for pending entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    /// Awaiting settlement.
    #[default]
    Pendente,
    /// Confirmed (generic).
    Confirmado,
    /// Confirmed receivable.
    Recebido,
    /// Confirmed payable.
    Pago,
    /// Cancelled before settlement.
    Cancelado,
    /// Marked as reversed.
    Estornado,
}

impl EntryStatus {
    /// Statuses that count as realized.
    pub const CONFIRMED: [Self; 3] = [Self::Confirmado, Self::Recebido, Self::Pago];

    /// Returns the persisted representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pendente => "PENDENTE",
            Self::Confirmado => "CONFIRMADO",
            Self::Recebido => "RECEBIDO",
            Self::Pago => "PAGO",
            Self::Cancelado => "CANCELADO",
            Self::Estornado => "ESTORNADO",
        }
    }

    /// Returns true for members of the confirmed set.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmado | Self::Recebido | Self::Pago)
    }

    /// Returns true for `PENDENTE`.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pendente)
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDENTE" => Ok(Self::Pendente),
            "CONFIRMADO" => Ok(Self::Confirmado),
            "RECEBIDO" => Ok(Self::Recebido),
            "PAGO" => Ok(Self::Pago),
            "CANCELADO" => Ok(Self::Cancelado),
            "ESTORNADO" => Ok(Self::Estornado),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// Where an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryOrigin {
    /// Typed in by a user or created by the sales flow.
    #[default]
    Manual,
    /// Generated by a completed service order.
    Os,
    /// Reversal of another entry.
    Estorno,
}

impl EntryOrigin {
    /// Returns the persisted representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::Os => "OS",
            Self::Estorno => "ESTORNO",
        }
    }
}

impl FromStr for EntryOrigin {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MANUAL" => Ok(Self::Manual),
            "OS" => Ok(Self::Os),
            "ESTORNO" => Ok(Self::Estorno),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// Error for strings outside a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value: {0}")]
pub struct UnknownVariant(pub String);

/// A financial entry (lançamento).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Entry ID, unique within the tenant.
    pub id: EntryId,
    /// Tenant isolation key.
    #[serde(rename = "empresaId")]
    pub tenant_id: TenantId,
    /// Direction.
    #[serde(rename = "tipo", default)]
    pub kind: EntryKind,
    /// Positive magnitude.
    #[serde(rename = "valor")]
    pub amount: Decimal,
    /// Current status.
    #[serde(default)]
    pub status: EntryStatus,
    /// Accrual date (competência).
    #[serde(rename = "dataCompetencia", default)]
    pub competence_date: Option<DateTime<Utc>>,
    /// Due date (vencimento).
    #[serde(rename = "data_vencimento", alias = "dataVencimento", default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Settlement date; set when the entry reaches a confirmed state.
    #[serde(rename = "data_pagamento", alias = "dataPagamento", default)]
    pub payment_date: Option<DateTime<Utc>>,
    /// Originating service order, informational only.
    #[serde(rename = "id_os", alias = "serviceOrderId", default)]
    pub order_id: Option<OrderId>,
    /// Reversal entry created for this one. Presence means "already reversed".
    #[serde(rename = "estornoLancamentoId", default)]
    pub reversal_entry_id: Option<EntryId>,
    /// For reversal entries, the entry being reversed.
    #[serde(rename = "id_lancamento_origem", default)]
    pub source_entry_id: Option<EntryId>,
    /// Origin of the entry.
    #[serde(rename = "origem", default)]
    pub origin: EntryOrigin,
    /// Category label.
    #[serde(rename = "categoria", default)]
    pub category: Option<String>,
    /// Payment method code.
    #[serde(rename = "metodo_pagamento", default)]
    pub payment_method: Option<String>,
    /// Free-text description.
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    /// Client name copied for reporting.
    #[serde(rename = "cliente_nome", default)]
    pub client_name: Option<String>,
    /// Client phone copied for reporting.
    #[serde(rename = "cliente_telefone", default)]
    pub client_phone: Option<String>,
    /// Client address copied for reporting.
    #[serde(rename = "cliente_endereco", default)]
    pub client_address: Option<String>,
    /// Actor that confirmed the entry.
    #[serde(rename = "confirmadoPor", default)]
    pub confirmed_by: Option<String>,
    /// Actor that cancelled the entry.
    #[serde(rename = "canceladoPor", default)]
    pub canceled_by: Option<String>,
    /// Cancellation time.
    #[serde(rename = "canceladoEm", default)]
    pub canceled_at: Option<DateTime<Utc>>,
    /// Cancellation reason.
    #[serde(rename = "cancelamentoMotivo", default)]
    pub cancel_reason: Option<String>,
    /// Actor that reversed the entry.
    #[serde(rename = "estornadoPor", default)]
    pub reversed_by: Option<String>,
    /// Reversal time.
    #[serde(rename = "estornadoEm", default)]
    pub reversed_at: Option<DateTime<Utc>>,
    /// Reversal reason.
    #[serde(rename = "estornoMotivo", default)]
    pub reversal_reason: Option<String>,
    /// Creation time.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Creates a pending entry with only the required fields set.
    #[must_use]
    pub fn pending(
        tenant_id: TenantId,
        kind: EntryKind,
        amount: Decimal,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            tenant_id,
            kind,
            amount,
            status: EntryStatus::Pendente,
            competence_date: None,
            due_date: Some(due_date),
            payment_date: None,
            order_id: None,
            reversal_entry_id: None,
            source_entry_id: None,
            origin: EntryOrigin::Manual,
            category: None,
            payment_method: None,
            description: None,
            client_name: None,
            client_phone: None,
            client_address: None,
            confirmed_by: None,
            canceled_by: None,
            canceled_at: None,
            cancel_reason: None,
            reversed_by: None,
            reversed_at: None,
            reversal_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the entry is in the confirmed set.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.status.is_confirmed()
    }

    /// Returns true if the entry is `PENDENTE`.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    /// Returns true once a reversal has been recorded for this entry.
    #[must_use]
    pub const fn is_reversed(&self) -> bool {
        self.reversal_entry_id.is_some()
    }

    /// Accrual date, falling back to the due date.
    #[must_use]
    pub fn competence_or_due(&self) -> Option<DateTime<Utc>> {
        self.competence_date.or(self.due_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("PENDENTE", EntryStatus::Pendente)]
    #[case("confirmado", EntryStatus::Confirmado)]
    #[case(" Recebido ", EntryStatus::Recebido)]
    #[case("PAGO", EntryStatus::Pago)]
    #[case("CANCELADO", EntryStatus::Cancelado)]
    #[case("ESTORNADO", EntryStatus::Estornado)]
    fn test_status_parse(#[case] raw: &str, #[case] expected: EntryStatus) {
        assert_eq!(raw.parse::<EntryStatus>().unwrap(), expected);
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        assert!("ATRASADO".parse::<EntryStatus>().is_err());
    }

    #[test]
    fn test_confirmed_set_is_exact() {
        for status in [
            EntryStatus::Pendente,
            EntryStatus::Confirmado,
            EntryStatus::Recebido,
            EntryStatus::Pago,
            EntryStatus::Cancelado,
            EntryStatus::Estornado,
        ] {
            assert_eq!(
                status.is_confirmed(),
                EntryStatus::CONFIRMED.contains(&status),
                "{status}"
            );
        }
    }

    #[test]
    fn test_kind_inversion() {
        assert_eq!(EntryKind::Entrada.inverted(), EntryKind::Saida);
        assert_eq!(EntryKind::Saida.inverted(), EntryKind::Entrada);
    }

    #[test]
    fn test_entry_document_field_names() {
        let now = Utc::now();
        let entry = Entry::pending(TenantId::new(), EntryKind::Saida, dec!(12.50), now, now);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["tipo"], "SAIDA");
        assert_eq!(json["status"], "PENDENTE");
        assert_eq!(json["valor"], "12.50");
        assert_eq!(json["origem"], "MANUAL");
        assert!(json.get("empresaId").is_some());
        assert!(json.get("data_vencimento").is_some());
        assert!(json["data_pagamento"].is_null());
    }

    #[test]
    fn test_entry_accepts_camel_case_aliases() {
        let now = Utc::now();
        let json = serde_json::json!({
            "id": EntryId::new(),
            "empresaId": TenantId::new(),
            "valor": 100,
            "dataVencimento": now,
            "dataPagamento": now,
            "createdAt": now,
            "updatedAt": now,
        });
        let entry: Entry = serde_json::from_value(json).unwrap();

        assert_eq!(entry.kind, EntryKind::Entrada);
        assert_eq!(entry.status, EntryStatus::Pendente);
        assert_eq!(entry.amount, dec!(100));
        assert_eq!(entry.due_date, Some(now));
        assert_eq!(entry.payment_date, Some(now));
    }

    #[test]
    fn test_competence_falls_back_to_due_date() {
        let now = Utc::now();
        let mut entry = Entry::pending(TenantId::new(), EntryKind::Entrada, dec!(1), now, now);
        assert_eq!(entry.competence_or_due(), Some(now));

        let earlier = now - chrono::Duration::days(40);
        entry.competence_date = Some(earlier);
        assert_eq!(entry.competence_or_due(), Some(earlier));
    }
}
