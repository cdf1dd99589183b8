//! Monthly rollup maintenance.

use async_trait::async_trait;
use chrono::Utc;

use super::error::ProcessError;
use super::processed::EventHandler;
use crate::ledger::calendar::LedgerCalendar;
use crate::ledger::rollup::EffectPair;
use crate::store::{Change, ChangeEvent, EventMarker, LedgerTx, MarkerKind};

/// Applies the signed deltas of an entry write to the month rollups.
///
/// Writes where neither image has an effect are not accepted and leave no
/// marker behind.
#[derive(Debug, Clone, Copy)]
pub struct MonthlyRollupHandler {
    calendar: LedgerCalendar,
}

impl MonthlyRollupHandler {
    /// Marker key component.
    pub const NAME: &'static str = "financeiro_mensal";

    #[must_use]
    pub const fn new(calendar: LedgerCalendar) -> Self {
        Self { calendar }
    }

    fn effects(&self, event: &ChangeEvent) -> Option<EffectPair> {
        match &event.change {
            Change::Entry { before, after, .. } => {
                Some(EffectPair::of(before.as_ref(), after.as_ref(), &self.calendar))
            }
            Change::Order { .. } => None,
        }
    }
}

#[async_trait]
impl<T: LedgerTx> EventHandler<T> for MonthlyRollupHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn accepts(&self, event: &ChangeEvent) -> bool {
        self.effects(event).is_some_and(|pair| !pair.is_empty())
    }

    async fn apply(&self, tx: &mut T, event: &ChangeEvent) -> Result<EventMarker, ProcessError> {
        let (Change::Entry { entry_id, .. }, Some(pair)) = (&event.change, self.effects(event)) else {
            return Err(ProcessError::InvalidEvent {
                event_id: event.id,
                handler: Self::NAME,
                reason: "evento não é de lançamento".into(),
            });
        };

        let now = Utc::now();
        for delta in pair.deltas() {
            tx.increment_rollup(event.tenant_id, &delta, now).await?;
        }

        Ok(EventMarker {
            tenant_id: event.tenant_id,
            event_id: event.id,
            handler: Self::NAME.to_string(),
            kind: MarkerKind::FinanceiroMensal,
            order_id: None,
            entry_id: Some(*entry_id),
            before_month: pair.before_month(),
            after_month: pair.after_month(),
            created_at: now,
        })
    }
}
