//! Reversal service for confirmed entries.
//!
//! A reversal never mutates the original's effect. It creates a new entry of
//! the opposite kind for the same magnitude, so the pair nets to zero in any
//! period that contains both.

use chrono::{DateTime, Utc};
use solaris_shared::types::EntryId;

use crate::ledger::types::{Entry, EntryOrigin, EntryStatus};

/// Stateless service for building reversal entries.
pub struct ReversalService;

impl ReversalService {
    /// Builds the reversal entry for a confirmed original.
    ///
    /// - Kind is inverted; value is the absolute value of the original.
    /// - Status is the original's confirmed status.
    /// - Competência, vencimento and pagamento are all `reversal_date`, so the
    ///   reversal is booked when it happens, not in the original month.
    /// - Description is `Estorno - {descricao}`, or `Estorno do lançamento {id}`.
    /// - Category, payment method, order link and client fields are copied.
    #[must_use]
    pub fn build_reversal(original: &Entry, reversal_date: DateTime<Utc>, now: DateTime<Utc>) -> Entry {
        let status = if original.status.is_confirmed() {
            original.status
        } else {
            EntryStatus::Confirmado
        };
        let description = match original.description.as_deref().map(str::trim) {
            Some(desc) if !desc.is_empty() => format!("Estorno - {desc}"),
            _ => format!("Estorno do lançamento {}", original.id),
        };

        let mut reversal = Entry::pending(
            original.tenant_id,
            original.kind.inverted(),
            original.amount.abs(),
            reversal_date,
            now,
        );
        reversal.id = EntryId::new();
        reversal.status = status;
        reversal.competence_date = Some(reversal_date);
        reversal.payment_date = Some(reversal_date);
        reversal.origin = EntryOrigin::Estorno;
        reversal.source_entry_id = Some(original.id);
        reversal.order_id = original.order_id;
        reversal.description = Some(description);
        reversal.category.clone_from(&original.category);
        reversal.payment_method.clone_from(&original.payment_method);
        reversal.client_name.clone_from(&original.client_name);
        reversal.client_phone.clone_from(&original.client_phone);
        reversal.client_address.clone_from(&original.client_address);
        reversal
    }
}
