//! Order-completion fan-out: turns a completed order into pending inflows.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::warn;

use super::allocation::split_installments;
use super::types::{OrderPayment, ServiceOrder};
use crate::ledger::dates::normalize_date;
use crate::ledger::types::{Entry, EntryKind, EntryOrigin};
use crate::ledger::validation::MAX_AMOUNT;

/// Category given to every entry generated from an order.
pub const SERVICE_SALE_CATEGORY: &str = "Venda de Serviço";

/// Upper bound on installments per payment.
pub const MAX_INSTALLMENTS: i64 = 240;

/// Returns true when a write moves an order into the completed status.
#[must_use]
pub fn is_completion(before: Option<&ServiceOrder>, after: Option<&ServiceOrder>) -> bool {
    let Some(after) = after else {
        return false;
    };
    after.status.is_completed() && !before.is_some_and(|b| b.status.is_completed())
}

/// An entry to be generated, before ids and timestamps are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub amount: Decimal,
    pub competence_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub description: String,
    pub payment_method: Option<String>,
}

impl PlannedEntry {
    /// Materializes the planned entry as a pending inflow linked to the order.
    #[must_use]
    pub fn into_entry(self, order: &ServiceOrder, now: DateTime<Utc>) -> Entry {
        let mut entry = Entry::pending(order.tenant_id, EntryKind::Entrada, self.amount, self.due_date, now);
        entry.competence_date = Some(self.competence_date);
        entry.order_id = Some(order.id);
        entry.origin = EntryOrigin::Os;
        entry.description = Some(self.description);
        entry.category = Some(SERVICE_SALE_CATEGORY.to_string());
        entry.payment_method = self.payment_method;
        entry.client_name.clone_from(&order.cliente_nome);
        entry.client_phone.clone_from(&order.cliente_telefone);
        entry
    }
}

/// Plans the entries for a completed order.
///
/// Itemized payments take precedence. Each payment with a positive net value
/// and a parseable first due date is split into equal installments due one
/// calendar month apart. Payments without a usable due date are skipped with
/// a warning. Without itemized payments, a positive total price yields one
/// entry. Values above [`MAX_AMOUNT`] are skipped with a warning. An empty
/// plan means there is nothing to bill.
#[must_use]
pub fn plan_entries(order: &ServiceOrder, finished_at: DateTime<Utc>) -> Vec<PlannedEntry> {
    let payments = order.payments();
    if !payments.is_empty() {
        return payments
            .iter()
            .flat_map(|payment| plan_payment(order, payment, finished_at))
            .collect();
    }

    let total = order.total_price();
    if total > MAX_AMOUNT {
        warn!(order_id = %order.id, tenant_id = %order.tenant_id, %total, "Valor total da OS fora do limite");
        return vec![];
    }
    if total > Decimal::ZERO {
        return vec![PlannedEntry {
            amount: total,
            competence_date: finished_at,
            due_date: finished_at,
            description: format!("Recebimento total da OS #{}", order.id),
            payment_method: None,
        }];
    }
    vec![]
}

fn plan_payment(
    order: &ServiceOrder,
    payment: &OrderPayment,
    finished_at: DateTime<Utc>,
) -> Vec<PlannedEntry> {
    let net = payment.net_value.unwrap_or_default();
    if net <= Decimal::ZERO {
        return vec![];
    }
    if net > MAX_AMOUNT {
        warn!(order_id = %order.id, tenant_id = %order.tenant_id, %net, "Pagamento ignorado por valor fora do limite");
        return vec![];
    }
    let Some(first_due) = normalize_date(&payment.due_date) else {
        warn!(
            order_id = %order.id,
            tenant_id = %order.tenant_id,
            method = ?payment.method,
            "Pagamento ignorado por falta de data de vencimento"
        );
        return vec![];
    };

    let installments = payment.installments.unwrap_or(1).clamp(1, MAX_INSTALLMENTS);
    let count = usize::try_from(installments).unwrap_or(1);

    split_installments(net, count)
        .into_iter()
        .enumerate()
        .map(|(i, amount)| {
            let description = if count > 1 {
                format!("Parcela {}/{} da OS #{}", i + 1, count, order.id)
            } else {
                format!("Pagamento da OS #{}", order.id)
            };
            PlannedEntry {
                amount,
                competence_date: finished_at,
                due_date: add_months_naive(first_due, u32::try_from(i).unwrap_or(0)),
                description,
                payment_method: payment.method.clone(),
            }
        })
        .collect()
}

/// Adds calendar months keeping the day of month and time of day.
///
/// When the day does not exist in the target month the excess days roll
/// into the following month, so January 31st plus one month is March 3rd
/// (March 2nd in leap years).
#[must_use]
pub fn add_months_naive(at: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let date = at.date_naive();
    let total = i64::from(date.month0()) + i64::from(months);
    let year = i64::from(date.year()) + total.div_euclid(12);
    let month0 = total.rem_euclid(12);

    let (Ok(year), Ok(month0)) = (i32::try_from(year), u32::try_from(month0)) else {
        return at;
    };
    let Some(first) = NaiveDate::from_ymd_opt(year, month0 + 1, 1) else {
        return at;
    };
    let target = first + Duration::days(i64::from(date.day0()));
    target.and_time(at.time()).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::types::{OrderFinancial, OrderStatus};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use solaris_shared::types::{OrderId, TenantId};

    fn finished_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 20, 15, 30, 0).unwrap()
    }

    fn order(financial: Option<OrderFinancial>) -> ServiceOrder {
        let mut order = ServiceOrder::new(TenantId::new(), OrderId::new(), OrderStatus::Concluida, finished_at());
        order.financial = financial;
        order.cliente_nome = Some("Carlos".into());
        order.cliente_telefone = Some("11999990000".into());
        order
    }

    fn payment(net: Decimal, installments: i64, due: serde_json::Value) -> OrderPayment {
        OrderPayment {
            method: Some("CREDIT_CARD".into()),
            installments: Some(installments),
            gross_value: None,
            tax_rate: None,
            net_value: Some(net),
            due_date: due,
        }
    }

    #[test]
    fn test_completion_detection() {
        let mut open = order(None);
        open.status = OrderStatus::InProgress;
        let done = order(None);

        assert!(is_completion(Some(&open), Some(&done)));
        assert!(is_completion(None, Some(&done)));
        assert!(!is_completion(Some(&done), Some(&done)));
        assert!(!is_completion(Some(&done), None));
        assert!(!is_completion(None, Some(&open)));
    }

    #[test]
    fn test_three_installments_of_900() {
        let order = order(Some(OrderFinancial {
            payments: vec![payment(dec!(900), 3, json!("2026-03-10T12:00:00Z"))],
            ..OrderFinancial::default()
        }));
        let plan = plan_entries(&order, finished_at());

        assert_eq!(plan.len(), 3);
        assert!(plan.iter().all(|p| p.amount == dec!(300)));
        assert!(plan.iter().all(|p| p.competence_date == finished_at()));
        assert_eq!(plan[0].due_date, Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap());
        assert_eq!(plan[1].due_date, Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap());
        assert_eq!(plan[2].due_date, Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap());
        assert_eq!(plan[1].description, format!("Parcela 2/3 da OS #{}", order.id));
    }

    #[test]
    fn test_single_payment_description() {
        let order = order(Some(OrderFinancial {
            payments: vec![payment(dec!(150), 0, json!("2026-03-10"))],
            ..OrderFinancial::default()
        }));
        let plan = plan_entries(&order, finished_at());
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].description, format!("Pagamento da OS #{}", order.id));
    }

    #[test]
    fn test_bad_payments_are_skipped_individually() {
        let order = order(Some(OrderFinancial {
            payments: vec![
                payment(dec!(100), 1, json!("sem data")),
                payment(dec!(0), 1, json!("2026-03-10")),
                payment(dec!(-5), 1, json!("2026-03-10")),
                payment(dec!(200), 2, json!("2026-03-10")),
            ],
            total_price: Some(dec!(999)),
            ..OrderFinancial::default()
        }));
        let plan = plan_entries(&order, finished_at());

        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|p| p.amount == dec!(100)));
    }

    #[test]
    fn test_total_price_fallback() {
        let order = order(Some(OrderFinancial {
            total_price: Some(dec!(450)),
            ..OrderFinancial::default()
        }));
        let plan = plan_entries(&order, finished_at());

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].amount, dec!(450));
        assert_eq!(plan[0].due_date, finished_at());
        assert_eq!(plan[0].description, format!("Recebimento total da OS #{}", order.id));
    }

    #[test]
    fn test_out_of_range_values_are_skipped() {
        let itemized = order(Some(OrderFinancial {
            payments: vec![
                payment(Decimal::MAX, 2, json!("2026-03-10")),
                payment(dec!(80), 1, json!("2026-03-10")),
            ],
            ..OrderFinancial::default()
        }));
        let plan = plan_entries(&itemized, finished_at());
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].amount, dec!(80));

        let huge_total = order(Some(OrderFinancial {
            total_price: Some(Decimal::MAX),
            ..OrderFinancial::default()
        }));
        assert!(plan_entries(&huge_total, finished_at()).is_empty());
    }

    #[test]
    fn test_nothing_to_bill() {
        assert!(plan_entries(&order(None), finished_at()).is_empty());
        let zero = order(Some(OrderFinancial {
            total_price: Some(dec!(0)),
            ..OrderFinancial::default()
        }));
        assert!(plan_entries(&zero, finished_at()).is_empty());
    }

    #[test]
    fn test_planned_entry_copies_order_fields() {
        let order = order(Some(OrderFinancial {
            total_price: Some(dec!(450)),
            ..OrderFinancial::default()
        }));
        let entry = plan_entries(&order, finished_at())
            .remove(0)
            .into_entry(&order, finished_at());

        assert_eq!(entry.origin, EntryOrigin::Os);
        assert_eq!(entry.order_id, Some(order.id));
        assert_eq!(entry.client_name.as_deref(), Some("Carlos"));
        assert_eq!(entry.category.as_deref(), Some(SERVICE_SALE_CATEGORY));
        assert!(entry.is_pending());
    }

    #[test]
    fn test_add_months_overflow_rolls_forward() {
        let jan31 = Utc.with_ymd_and_hms(2026, 1, 31, 9, 0, 0).unwrap();
        assert_eq!(add_months_naive(jan31, 0), jan31);
        assert_eq!(
            add_months_naive(jan31, 1),
            Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap()
        );
        let leap = Utc.with_ymd_and_hms(2028, 1, 31, 9, 0, 0).unwrap();
        assert_eq!(
            add_months_naive(leap, 1),
            Utc.with_ymd_and_hms(2028, 3, 2, 9, 0, 0).unwrap()
        );
        let nov = Utc.with_ymd_and_hms(2026, 11, 15, 0, 0, 0).unwrap();
        assert_eq!(
            add_months_naive(nov, 3),
            Utc.with_ymd_and_hms(2027, 2, 15, 0, 0, 0).unwrap()
        );
    }
}
