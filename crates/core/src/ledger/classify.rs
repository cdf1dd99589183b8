//! Entry classification.
//!
//! One rule decides whether an entry counts toward realized totals and to
//! which month it is attributed. The monthly rollup handler and the
//! metrics reducers both go through this module.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::calendar::{DateRange, LedgerCalendar, MonthId};
use super::types::{Entry, EntryKind};

/// Contribution of a single entry to a month's totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    /// Month the contribution belongs to.
    pub month: MonthId,
    /// Inflow amount.
    pub entradas: Decimal,
    /// Outflow amount.
    pub saidas: Decimal,
}

impl Effect {
    /// Net contribution, inflows minus outflows.
    #[must_use]
    pub fn saldo(&self) -> Decimal {
        self.entradas.saturating_sub(self.saidas)
    }
}

/// Returns true if the entry is in the confirmed set.
#[must_use]
pub const fn is_confirmed(entry: &Entry) -> bool {
    entry.status.is_confirmed()
}

/// Accrual instant of an entry: competência, falling back to vencimento.
#[must_use]
pub fn competence_of(entry: &Entry) -> Option<DateTime<Utc>> {
    entry.competence_or_due()
}

/// Classifies an entry snapshot.
///
/// Returns `None` when the entry is not confirmed, has no resolvable
/// accrual date, or has a zero value.
#[must_use]
pub fn classify(entry: &Entry, calendar: &LedgerCalendar) -> Option<Effect> {
    if !is_confirmed(entry) {
        return None;
    }
    let competence = competence_of(entry)?;
    if entry.amount.is_zero() {
        return None;
    }

    let month = calendar.month_id(competence);
    Some(match entry.kind {
        EntryKind::Entrada => Effect {
            month,
            entradas: entry.amount,
            saidas: Decimal::ZERO,
        },
        EntryKind::Saida => Effect {
            month,
            entradas: Decimal::ZERO,
            saidas: entry.amount,
        },
    })
}

/// Returns true if the entry is confirmed, of the given kind, and accrues within `range`.
#[must_use]
pub fn accrues_within(entry: &Entry, kind: EntryKind, range: &DateRange) -> bool {
    entry.kind == kind && is_confirmed(entry) && range.contains_opt(competence_of(entry))
}

/// Returns true if the entry is confirmed, of the given kind, and was settled within `range`.
#[must_use]
pub fn settled_within(entry: &Entry, kind: EntryKind, range: &DateRange) -> bool {
    entry.kind == kind && is_confirmed(entry) && range.contains_opt(entry.payment_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::EntryStatus;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use solaris_shared::types::TenantId;

    fn entry(kind: EntryKind, status: EntryStatus, amount: Decimal) -> Entry {
        let due = Utc.with_ymd_and_hms(2026, 2, 5, 12, 0, 0).unwrap();
        let mut entry = Entry::pending(TenantId::new(), kind, amount, due, due);
        entry.status = status;
        entry
    }

    #[test]
    fn test_confirmed_inflow_has_effect() {
        let effect = classify(
            &entry(EntryKind::Entrada, EntryStatus::Confirmado, dec!(400)),
            &LedgerCalendar::utc(),
        )
        .unwrap();
        assert_eq!(effect.month.to_string(), "2026-02");
        assert_eq!(effect.entradas, dec!(400));
        assert_eq!(effect.saidas, dec!(0));
        assert_eq!(effect.saldo(), dec!(400));
    }

    #[test]
    fn test_confirmed_outflow_has_effect() {
        let effect = classify(
            &entry(EntryKind::Saida, EntryStatus::Pago, dec!(150)),
            &LedgerCalendar::utc(),
        )
        .unwrap();
        assert_eq!(effect.entradas, dec!(0));
        assert_eq!(effect.saidas, dec!(150));
        assert_eq!(effect.saldo(), dec!(-150));
    }

    #[test]
    fn test_unconfirmed_statuses_have_no_effect() {
        for status in [
            EntryStatus::Pendente,
            EntryStatus::Cancelado,
            EntryStatus::Estornado,
        ] {
            assert!(
                classify(&entry(EntryKind::Entrada, status, dec!(10)), &LedgerCalendar::utc())
                    .is_none(),
                "{status}"
            );
        }
    }

    #[test]
    fn test_zero_value_has_no_effect() {
        assert!(
            classify(
                &entry(EntryKind::Entrada, EntryStatus::Recebido, dec!(0)),
                &LedgerCalendar::utc()
            )
            .is_none()
        );
    }

    #[test]
    fn test_missing_dates_have_no_effect() {
        let mut e = entry(EntryKind::Entrada, EntryStatus::Recebido, dec!(10));
        e.due_date = None;
        e.competence_date = None;
        assert!(classify(&e, &LedgerCalendar::utc()).is_none());
    }

    #[test]
    fn test_competence_takes_precedence_over_due_date() {
        let mut e = entry(EntryKind::Entrada, EntryStatus::Confirmado, dec!(10));
        e.competence_date = Some(Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap());
        let effect = classify(&e, &LedgerCalendar::utc()).unwrap();
        assert_eq!(effect.month.to_string(), "2026-01");
    }

    #[test]
    fn test_range_predicates() {
        let calendar = LedgerCalendar::utc();
        let range = calendar.month_range(Utc.with_ymd_and_hms(2026, 2, 20, 12, 0, 0).unwrap());
        let mut e = entry(EntryKind::Entrada, EntryStatus::Confirmado, dec!(10));
        e.payment_date = Some(Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap());

        assert!(accrues_within(&e, EntryKind::Entrada, &range));
        assert!(!accrues_within(&e, EntryKind::Saida, &range));
        assert!(!settled_within(&e, EntryKind::Entrada, &range));
    }
}
