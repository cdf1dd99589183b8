//! Property-based tests for incremental rollup maintenance.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use solaris_shared::types::TenantId;
use std::collections::BTreeMap;

use super::calendar::{LedgerCalendar, MonthId};
use super::rollup::{MonthlyRollup, RollupTotals, compute_deltas, rebuild_rollups};
use super::types::{Entry, EntryKind, EntryStatus};

fn arb_status() -> impl Strategy<Value = EntryStatus> {
    prop_oneof![
        Just(EntryStatus::Pendente),
        Just(EntryStatus::Confirmado),
        Just(EntryStatus::Recebido),
        Just(EntryStatus::Pago),
        Just(EntryStatus::Cancelado),
        Just(EntryStatus::Estornado),
    ]
}

fn arb_kind() -> impl Strategy<Value = EntryKind> {
    prop_oneof![Just(EntryKind::Entrada), Just(EntryKind::Saida)]
}

/// 0.00 to 10,000.00, zero included.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Any hour in 2025-2026.
fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..2 * 365 * 24).prop_map(|hours| Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hours))
}

/// One entry state: kind, status, value, competência.
fn arb_state() -> impl Strategy<Value = (EntryKind, EntryStatus, Decimal, Option<DateTime<Utc>>)> {
    (arb_kind(), arb_status(), arb_amount(), proptest::option::of(arb_instant()))
}

fn make(id_source: &Entry, state: &(EntryKind, EntryStatus, Decimal, Option<DateTime<Utc>>)) -> Entry {
    let mut e = id_source.clone();
    e.kind = state.0;
    e.status = state.1;
    e.amount = state.2;
    e.competence_date = state.3;
    e
}

/// Applies every delta the way a store increment would, dropping months
/// that end up empty so the result compares with a fresh rebuild.
fn fold(deltas_per_write: &[Vec<super::rollup::RollupDelta>]) -> BTreeMap<MonthId, RollupTotals> {
    let tenant = TenantId::new();
    let now = Utc::now();
    let mut rollups: BTreeMap<MonthId, MonthlyRollup> = BTreeMap::new();
    for deltas in deltas_per_write {
        for delta in deltas {
            rollups
                .entry(delta.month)
                .or_insert_with(|| MonthlyRollup::empty(tenant, delta.month, now))
                .apply(delta, now)
                .unwrap();
        }
    }
    rollups
        .into_iter()
        .filter(|(_, r)| r.totals != RollupTotals::default())
        .map(|(month, r)| (month, r.totals))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Replaying every write's deltas yields the same totals as classifying
    /// the final entry set from scratch.
    #[test]
    fn prop_incremental_matches_rebuild(
        histories in proptest::collection::vec(proptest::collection::vec(arb_state(), 1..5), 1..6),
        delete_last in proptest::bool::ANY,
    ) {
        let calendar = LedgerCalendar::utc();
        let base = Entry::pending(TenantId::new(), EntryKind::Entrada, Decimal::ZERO, Utc::now(), Utc::now());
        let mut writes = Vec::new();
        let mut finals = Vec::new();

        for (i, history) in histories.iter().enumerate() {
            let mut seed = base.clone();
            seed.id = solaris_shared::types::EntryId::new();
            let mut current: Option<Entry> = None;
            for state in history {
                let next = make(&seed, state);
                writes.push(compute_deltas(current.as_ref(), Some(&next), &calendar));
                current = Some(next);
            }
            if delete_last && i + 1 == histories.len() {
                writes.push(compute_deltas(current.as_ref(), None, &calendar));
                current = None;
            }
            finals.extend(current);
        }

        let expected: BTreeMap<MonthId, RollupTotals> = rebuild_rollups(&finals, &calendar)
            .into_iter()
            .filter(|(_, t)| *t != RollupTotals::default())
            .collect();
        prop_assert_eq!(fold(&writes), expected);
    }

    /// Increments commute: any order of the same deltas gives the same totals.
    #[test]
    fn prop_deltas_commute(states in proptest::collection::vec(arb_state(), 2..8)) {
        let calendar = LedgerCalendar::utc();
        let base = Entry::pending(TenantId::new(), EntryKind::Entrada, Decimal::ZERO, Utc::now(), Utc::now());
        let writes: Vec<_> = states
            .iter()
            .map(|s| compute_deltas(None, Some(&make(&base, s)), &calendar))
            .collect();
        let mut reversed = writes.clone();
        reversed.reverse();
        prop_assert_eq!(fold(&writes), fold(&reversed));
    }

    /// Saldo always equals entradas minus saidas after any sequence of increments.
    #[test]
    fn prop_saldo_is_consistent(states in proptest::collection::vec(arb_state(), 1..8)) {
        let calendar = LedgerCalendar::utc();
        let base = Entry::pending(TenantId::new(), EntryKind::Saida, Decimal::ZERO, Utc::now(), Utc::now());
        let writes: Vec<_> = states
            .iter()
            .map(|s| compute_deltas(None, Some(&make(&base, s)), &calendar))
            .collect();
        for totals in fold(&writes).values() {
            prop_assert_eq!(totals.saldo, totals.entradas - totals.saidas);
        }
    }
}
