//! Check-and-mark idempotency for event handlers.
//!
//! Delivery is at least once. Before a handler runs, its marker for the
//! event is looked up inside the transaction that will carry the effects;
//! the marker is written in that same transaction. A crash before commit
//! applies nothing and a redelivery after commit finds the marker.

use async_trait::async_trait;
use tracing::{debug, info};

use super::error::ProcessError;
use crate::store::{ChangeEvent, EventMarker, LedgerStore, LedgerTx, MarkerKind, StoreError};

/// A side effect triggered by a change event.
#[async_trait]
pub trait EventHandler<T: LedgerTx>: Send + Sync {
    /// Stable handler name, part of the marker key.
    fn name(&self) -> &'static str;

    /// Cheap filter evaluated before any transaction is opened.
    fn accepts(&self, event: &ChangeEvent) -> bool;

    /// Applies the effects inside `tx` and returns the marker to record.
    async fn apply(&self, tx: &mut T, event: &ChangeEvent) -> Result<EventMarker, ProcessError>;

    /// Called after the effects and the marker have been committed.
    fn committed(&self, _event: &ChangeEvent, _marker: &EventMarker) {}
}

/// Result of delivering one event to one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processing {
    /// The handler is not interested in the event.
    Ignored,
    /// A marker already existed; nothing was applied.
    Duplicate,
    /// Effects applied and marker recorded.
    Applied(MarkerKind),
}

/// Runs handlers at most once per event.
#[derive(Debug, Clone)]
pub struct ProcessedEventStore<S> {
    store: S,
}

impl<S: LedgerStore> ProcessedEventStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Delivers `event` to `handler` unless it was already processed.
    ///
    /// # Returns
    /// * `Ok(Processing::Ignored)` if the handler does not accept the event
    /// * `Ok(Processing::Duplicate)` if the marker already exists, or another
    ///   delivery recorded it first
    /// * `Ok(Processing::Applied(kind))` once effects and marker are committed
    ///
    /// # Errors
    ///
    /// Returns the handler or store failure. Nothing is committed in that case.
    pub async fn run_once<H>(&self, handler: &H, event: &ChangeEvent) -> Result<Processing, ProcessError>
    where
        H: EventHandler<S::Tx> + ?Sized,
    {
        if !handler.accepts(event) {
            return Ok(Processing::Ignored);
        }

        let mut tx = self.store.begin().await?;
        if tx.marker_exists(event.tenant_id, event.id, handler.name()).await? {
            info!(
                event_id = %event.id,
                tenant_id = %event.tenant_id,
                handler = handler.name(),
                "Event already processed, skipping (idempotency)"
            );
            return Ok(Processing::Duplicate);
        }

        let marker = handler.apply(&mut tx, event).await?;
        match tx.insert_marker(&marker).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                info!(
                    event_id = %event.id,
                    handler = handler.name(),
                    "Event recorded by a concurrent delivery, skipping (idempotency)"
                );
                return Ok(Processing::Duplicate);
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;
        handler.committed(event, &marker);

        debug!(event_id = %event.id, handler = handler.name(), kind = marker.kind.as_str(), "Event applied");
        Ok(Processing::Applied(marker.kind))
    }
}
