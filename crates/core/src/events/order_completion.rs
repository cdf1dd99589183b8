//! Billing of completed service orders.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::info;

use super::error::ProcessError;
use super::processed::EventHandler;
use crate::orders::fanout::{is_completion, plan_entries};
use crate::orders::types::BillingStatus;
use crate::store::{AuditEvent, AuditEventType, Change, ChangeEvent, EventMarker, LedgerTx, MarkerKind};

/// Generates pending inflows when an order enters the completed status.
///
/// The completion moment is the event's write time, so a redelivered event
/// plans exactly the same entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderCompletionHandler;

impl OrderCompletionHandler {
    /// Marker key component.
    pub const NAME: &'static str = "os_lancamentos";
}

#[async_trait]
impl<T: LedgerTx> EventHandler<T> for OrderCompletionHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn accepts(&self, event: &ChangeEvent) -> bool {
        match &event.change {
            Change::Order { before, after, .. } => is_completion(before.as_ref(), after.as_ref()),
            Change::Entry { .. } => false,
        }
    }

    async fn apply(&self, tx: &mut T, event: &ChangeEvent) -> Result<EventMarker, ProcessError> {
        let Change::Order { order_id, after, .. } = &event.change else {
            return Err(ProcessError::InvalidEvent {
                event_id: event.id,
                handler: Self::NAME,
                reason: "evento não é de ordem de serviço".into(),
            });
        };

        // Plan from the stored order; fall back to the event image if the
        // order was deleted since, in which case there is nothing to stamp.
        let stored = tx.order_for_update(event.tenant_id, *order_id).await?;
        let exists = stored.is_some();
        let Some(mut order) = stored.or_else(|| after.clone()) else {
            return Err(ProcessError::InvalidEvent {
                event_id: event.id,
                handler: Self::NAME,
                reason: "ordem de serviço sem imagem posterior".into(),
            });
        };

        let now = Utc::now();
        let planned = plan_entries(&order, event.occurred_at);
        let mut marker = EventMarker {
            tenant_id: event.tenant_id,
            event_id: event.id,
            handler: Self::NAME.to_string(),
            kind: MarkerKind::OsLancamentosSkip,
            order_id: Some(*order_id),
            entry_id: None,
            before_month: None,
            after_month: None,
            created_at: now,
        };

        if planned.is_empty() {
            order.stamp_billing(BillingStatus::Ignored, None, now);
            if exists {
                tx.put_order(&order).await?;
            }
            return Ok(marker);
        }

        let count = planned.len();
        for entry in planned {
            tx.put_entry(&entry.into_entry(&order, now)).await?;
        }

        order.stamp_billing(BillingStatus::Gerados, u32::try_from(count).ok(), now);
        if exists {
            tx.put_order(&order).await?;
        }
        tx.append_audit(
            &AuditEvent::new(event.tenant_id, AuditEventType::OsLancamentosGerados, json!({ "itens": count }))
                .for_order(*order_id),
        )
        .await?;

        marker.kind = MarkerKind::OsLancamentosGerados;
        Ok(marker)
    }

    fn committed(&self, event: &ChangeEvent, marker: &EventMarker) {
        match marker.kind {
            MarkerKind::OsLancamentosGerados => info!(
                tenant_id = %event.tenant_id,
                order_id = ?marker.order_id,
                "Lançamentos gerados a partir da OS concluída"
            ),
            _ => info!(
                tenant_id = %event.tenant_id,
                order_id = ?marker.order_id,
                "OS concluída sem valores a faturar"
            ),
        }
    }
}
