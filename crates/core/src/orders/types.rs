//! Service order document, limited to the fields the ledger reads and stamps.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solaris_shared::types::{OrderId, TenantId};

/// Lifecycle status of a service order (OS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Being drafted.
    #[default]
    Draft,
    /// Opened in the shop.
    Open,
    /// Work in progress.
    InProgress,
    /// Opened (legacy label).
    Aberta,
    /// In progress (legacy label).
    EmAndamento,
    /// Waiting for an action from the client.
    AguardandoAcao,
    /// Completed. Entering this status triggers billing.
    Concluida,
    /// Cancelled.
    Cancelada,
}

impl OrderStatus {
    /// Returns true for the completed status.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Concluida)
    }
}

/// Outcome of billing an order, stamped on the order document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingStatus {
    /// Entries were generated.
    Gerados,
    /// Nothing to bill.
    Ignored,
}

/// One itemized payment of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayment {
    /// Payment method code (`PIX`, `CASH`, `CREDIT_CARD`, ...).
    #[serde(default)]
    pub method: Option<String>,
    /// Number of installments; values below 1 are treated as 1.
    #[serde(default)]
    pub installments: Option<i64>,
    /// Amount paid by the client.
    #[serde(default)]
    pub gross_value: Option<Decimal>,
    /// Card fee percentage.
    #[serde(default)]
    pub tax_rate: Option<Decimal>,
    /// Amount received after fees. This is what gets billed.
    #[serde(default)]
    pub net_value: Option<Decimal>,
    /// Due date of the first installment, in any accepted date shape.
    #[serde(default)]
    pub due_date: Value,
}

/// Financial section of an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFinancial {
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub global_discount: Option<Decimal>,
    /// Total price, billed as a single entry when there are no itemized payments.
    #[serde(default)]
    pub total_price: Option<Decimal>,
    #[serde(default)]
    pub payments: Vec<OrderPayment>,
    #[serde(default)]
    pub balance_due: Option<Decimal>,
}

/// Service order (OS).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOrder {
    pub id: OrderId,
    #[serde(rename = "empresaId")]
    pub tenant_id: TenantId,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, alias = "clientName")]
    pub cliente_nome: Option<String>,
    #[serde(default)]
    pub cliente_telefone: Option<String>,
    #[serde(default)]
    pub financial: Option<OrderFinancial>,
    /// Billing outcome.
    #[serde(rename = "financeiroLancamentosStatus", default)]
    pub billing_status: Option<BillingStatus>,
    /// Number of entries generated.
    #[serde(rename = "financeiroLancamentosCount", default)]
    pub billing_count: Option<u32>,
    /// When billing ran.
    #[serde(rename = "financeiroLancamentosUpdatedAt", default)]
    pub billing_updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl ServiceOrder {
    /// Creates an order with no financial data.
    #[must_use]
    pub fn new(tenant_id: TenantId, id: OrderId, status: OrderStatus, now: DateTime<Utc>) -> Self {
        Self {
            id,
            tenant_id,
            status,
            cliente_nome: None,
            cliente_telefone: None,
            financial: None,
            billing_status: None,
            billing_count: None,
            billing_updated_at: None,
            updated_at: now,
        }
    }

    /// Itemized payments, empty when the order has no financial section.
    #[must_use]
    pub fn payments(&self) -> &[OrderPayment] {
        self.financial.as_ref().map_or(&[], |f| f.payments.as_slice())
    }

    /// Total price, zero when absent.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.financial
            .as_ref()
            .and_then(|f| f.total_price)
            .unwrap_or_default()
    }

    /// Records the billing outcome.
    pub fn stamp_billing(&mut self, status: BillingStatus, count: Option<u32>, at: DateTime<Utc>) {
        self.billing_status = Some(status);
        if count.is_some() {
            self.billing_count = count;
        }
        self.billing_updated_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_order_document_decodes() {
        let json = json!({
            "id": OrderId::new(),
            "empresaId": TenantId::new(),
            "status": "CONCLUIDA",
            "clientName": "Ana",
            "financial": {
                "totalPrice": 900,
                "payments": [
                    { "method": "CREDIT_CARD", "installments": 3, "netValue": 900, "dueDate": "2026-03-10" }
                ]
            }
        });
        let order: ServiceOrder = serde_json::from_value(json).unwrap();

        assert!(order.status.is_completed());
        assert_eq!(order.cliente_nome.as_deref(), Some("Ana"));
        assert_eq!(order.total_price(), dec!(900));
        assert_eq!(order.payments()[0].installments, Some(3));
        assert_eq!(order.payments()[0].net_value, Some(dec!(900)));
    }

    #[test]
    fn test_stamp_billing() {
        let now = Utc::now();
        let mut order = ServiceOrder::new(TenantId::new(), OrderId::new(), OrderStatus::Concluida, now);
        order.stamp_billing(BillingStatus::Gerados, Some(3), now);

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["financeiroLancamentosStatus"], "GERADOS");
        assert_eq!(json["financeiroLancamentosCount"], 3);
    }
}
