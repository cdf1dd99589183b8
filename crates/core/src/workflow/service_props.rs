//! Property-based tests for WorkflowService.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use solaris_shared::types::TenantId;

use crate::ledger::calendar::LedgerCalendar;
use crate::ledger::classify::classify;
use crate::ledger::types::{Entry, EntryKind, EntryStatus};
use crate::workflow::error::WorkflowError;
use crate::workflow::service::WorkflowService;
use crate::workflow::types::{CancelCommand, ConfirmCommand, Decision, ReverseCommand, WorkflowAction};

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

fn arb_confirmed_status() -> impl Strategy<Value = EntryStatus> {
    prop_oneof![
        Just(EntryStatus::Confirmado),
        Just(EntryStatus::Recebido),
        Just(EntryStatus::Pago),
    ]
}

fn arb_kind() -> impl Strategy<Value = EntryKind> {
    prop_oneof![Just(EntryKind::Entrada), Just(EntryKind::Saida)]
}

/// 0.01 to 1,000,000.00
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Any instant in 2024-2027.
fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4 * 365 * 24 * 60).prop_map(|minutes| {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    })
}

fn entry(kind: EntryKind, status: EntryStatus, amount: Decimal, at: DateTime<Utc>) -> Entry {
    let mut e = Entry::pending(TenantId::new(), kind, amount, at, at);
    e.status = status;
    e
}

fn reverse_cmd(e: &Entry, at: Option<DateTime<Utc>>) -> ReverseCommand {
    ReverseCommand {
        tenant_id: e.tenant_id,
        entry_id: e.id,
        reason: None,
        user_id: None,
        reversal_date: at,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Confirm succeeds only from PENDENTE, no-ops in the confirmed set and fails elsewhere.
    #[test]
    fn prop_confirm_guard(status in arb_status(), target in arb_confirmed_status(), amount in arb_amount()) {
        let e = entry(EntryKind::Entrada, status, amount, Utc::now());
        let cmd = ConfirmCommand::new(e.tenant_id, e.id, target);
        match WorkflowService::confirm(&e, &cmd, "svc", Utc::now()) {
            Ok(Decision::Apply(WorkflowAction::Confirm { new_status, .. })) => {
                prop_assert_eq!(status, EntryStatus::Pendente);
                prop_assert_eq!(new_status, target);
            }
            Ok(Decision::AlreadyApplied) => prop_assert!(status.is_confirmed()),
            Err(WorkflowError::NotPendingForConfirm { .. }) => {
                prop_assert!(matches!(status, EntryStatus::Cancelado | EntryStatus::Estornado));
            }
            other => prop_assert!(false, "unexpected: {:?}", other),
        }
    }

    /// Cancel succeeds only from PENDENTE and no-ops on CANCELADO.
    #[test]
    fn prop_cancel_guard(status in arb_status()) {
        let e = entry(EntryKind::Saida, status, Decimal::ONE, Utc::now());
        let cmd = CancelCommand { tenant_id: e.tenant_id, entry_id: e.id, reason: None, user_id: None };
        match WorkflowService::cancel(&e, &cmd, "svc", Utc::now()) {
            Ok(Decision::Apply(_)) => prop_assert_eq!(status, EntryStatus::Pendente),
            Ok(Decision::AlreadyApplied) => prop_assert_eq!(status, EntryStatus::Cancelado),
            Err(_) => prop_assert!(status != EntryStatus::Pendente && status != EntryStatus::Cancelado),
        }
    }

    /// A confirmed entry and its reversal cancel out in any period containing both.
    #[test]
    fn prop_reversal_is_neutral(
        kind in arb_kind(),
        status in arb_confirmed_status(),
        amount in arb_amount(),
        at in arb_instant(),
        reversal_at in arb_instant(),
    ) {
        let original = entry(kind, status, amount, at);
        let Ok(Decision::Apply(WorkflowAction::Reverse { reversal, .. })) =
            WorkflowService::reverse(&original, &reverse_cmd(&original, Some(reversal_at)), "svc", Utc::now())
        else {
            return Err(TestCaseError::fail("expected a reversal"));
        };

        let calendar = LedgerCalendar::utc();
        let a = classify(&original, &calendar).unwrap();
        let b = classify(&reversal, &calendar).unwrap();

        prop_assert_eq!(a.saldo() + b.saldo(), Decimal::ZERO);
        prop_assert_eq!(a.entradas, b.saidas);
        prop_assert_eq!(a.saidas, b.entradas);
        prop_assert_eq!(b.month, calendar.month_id(reversal_at));
    }

    /// Once stamped, the original always reports the same reversal.
    #[test]
    fn prop_reverse_twice_is_noop(kind in arb_kind(), amount in arb_amount()) {
        let mut original = entry(kind, EntryStatus::Confirmado, amount, Utc::now());
        let now = Utc::now();
        let Ok(Decision::Apply(action)) =
            WorkflowService::reverse(&original, &reverse_cmd(&original, None), "svc", now)
        else {
            return Err(TestCaseError::fail("expected a reversal"));
        };
        action.apply_to(&mut original, now);

        prop_assert_eq!(
            WorkflowService::reverse(&original, &reverse_cmd(&original, None), "svc", now).unwrap(),
            Decision::AlreadyApplied
        );
    }
}
