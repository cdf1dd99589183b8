//! In-memory store.
//!
//! A single async mutex serializes transactions. A transaction writes in
//! place and keeps an undo log; dropping it without a commit replays the
//! log backwards, so an aborted transaction leaves no trace. The outbox
//! holds only undelivered rows: acked events are removed and parked ones
//! move aside.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use solaris_shared::types::{EntryId, EventId, OrderId, TenantId};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{AuditEvent, ChangeEvent, EventMarker, LedgerStore, LedgerTx, StoreError};
use crate::ledger::calendar::MonthId;
use crate::ledger::rollup::{MonthlyRollup, RollupDelta};
use crate::ledger::types::Entry;
use crate::orders::types::ServiceOrder;

#[derive(Debug)]
struct OutboxRow {
    event: ChangeEvent,
    last_error: Option<String>,
}

type MarkerKey = (TenantId, EventId, String);

#[derive(Debug, Default)]
struct MemoryState {
    entries: BTreeMap<(TenantId, EntryId), Entry>,
    orders: BTreeMap<(TenantId, OrderId), ServiceOrder>,
    rollups: BTreeMap<(TenantId, MonthId), MonthlyRollup>,
    markers: BTreeMap<MarkerKey, EventMarker>,
    audit: Vec<AuditEvent>,
    outbox: VecDeque<OutboxRow>,
    parked: Vec<OutboxRow>,
}

impl MemoryState {
    fn outbox_index(&self, event_id: EventId) -> Option<usize> {
        self.outbox.iter().position(|row| row.event.id == event_id)
    }
}

/// Prior value of one key touched by a transaction.
#[derive(Debug)]
enum Undo {
    Entry((TenantId, EntryId), Option<Entry>),
    Order((TenantId, OrderId), Option<ServiceOrder>),
    Rollup((TenantId, MonthId), Option<MonthlyRollup>),
    Marker(MarkerKey),
}

/// Store backed by process memory. Used by tests and by the server when no
/// database is configured.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Audit log of a tenant, oldest first.
    pub async fn audit_events(&self, tenant_id: TenantId) -> Vec<AuditEvent> {
        let state = self.state.lock().await;
        state
            .audit
            .iter()
            .filter(|a| a.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    /// Last error recorded for an undelivered event, and whether it is parked.
    /// `None` once the event was acked.
    pub async fn outbox_status(&self, event_id: EventId) -> Option<(bool, Option<String>)> {
        let state = self.state.lock().await;
        let pending = state.outbox.iter().map(|row| (false, row));
        let parked = state.parked.iter().map(|row| (true, row));
        pending
            .chain(parked)
            .find(|(_, row)| row.event.id == event_id)
            .map(|(parked, row)| (parked, row.last_error.clone()))
    }

    /// Number of events neither delivered nor parked.
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.outbox.len()
    }

    /// Number of outbox rows held in memory, pending and parked.
    pub async fn outbox_len(&self) -> usize {
        let state = self.state.lock().await;
        state.outbox.len() + state.parked.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(MemoryTx {
            audit_len: guard.audit.len(),
            outbox_len: guard.outbox.len(),
            guard,
            undo: Vec::new(),
            committed: false,
        })
    }

    async fn list_entries(&self, tenant_id: TenantId) -> Result<Vec<Entry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .entries
            .iter()
            .filter(|((tenant, _), _)| *tenant == tenant_id)
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn get_entry(&self, tenant_id: TenantId, entry_id: EntryId) -> Result<Option<Entry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.entries.get(&(tenant_id, entry_id)).cloned())
    }

    async fn get_order(&self, tenant_id: TenantId, order_id: OrderId) -> Result<Option<ServiceOrder>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.orders.get(&(tenant_id, order_id)).cloned())
    }

    async fn get_rollup(&self, tenant_id: TenantId, month: MonthId) -> Result<Option<MonthlyRollup>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.rollups.get(&(tenant_id, month)).cloned())
    }

    async fn list_rollups(&self, tenant_id: TenantId) -> Result<Vec<MonthlyRollup>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .rollups
            .iter()
            .filter(|((tenant, _), _)| *tenant == tenant_id)
            .map(|(_, rollup)| rollup.clone())
            .collect())
    }

    async fn get_marker(
        &self,
        tenant_id: TenantId,
        event_id: EventId,
        handler: &str,
    ) -> Result<Option<EventMarker>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .markers
            .get(&(tenant_id, event_id, handler.to_string()))
            .cloned())
    }

    async fn pending_events(&self, limit: usize) -> Result<Vec<ChangeEvent>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .outbox
            .iter()
            .take(limit)
            .map(|row| row.event.clone())
            .collect())
    }

    async fn ack_event(&self, event_id: EventId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if let Some(index) = state.outbox_index(event_id) {
            state.outbox.remove(index);
        }
        Ok(())
    }

    async fn fail_event(&self, event_id: EventId, error: &str, park: bool) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let Some(index) = state.outbox_index(event_id) else {
            return Ok(());
        };
        let row = &mut state.outbox[index];
        row.event.attempts += 1;
        row.last_error = Some(error.to_string());
        if park {
            if let Some(row) = state.outbox.remove(index) {
                state.parked.push(row);
            }
        }
        Ok(())
    }
}

/// Transaction over a [`MemoryStore`]. Holds the store lock until dropped.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    undo: Vec<Undo>,
    audit_len: usize,
    outbox_len: usize,
    committed: bool,
}

impl MemoryTx {
    fn record(&mut self, event: ChangeEvent) {
        self.guard.outbox.push_back(OutboxRow { event, last_error: None });
    }

    fn rollback(&mut self) {
        let state = &mut *self.guard;
        while let Some(undo) = self.undo.pop() {
            match undo {
                Undo::Entry(key, Some(prev)) => {
                    state.entries.insert(key, prev);
                }
                Undo::Entry(key, None) => {
                    state.entries.remove(&key);
                }
                Undo::Order(key, Some(prev)) => {
                    state.orders.insert(key, prev);
                }
                Undo::Order(key, None) => {
                    state.orders.remove(&key);
                }
                Undo::Rollup(key, Some(prev)) => {
                    state.rollups.insert(key, prev);
                }
                Undo::Rollup(key, None) => {
                    state.rollups.remove(&key);
                }
                Undo::Marker(key) => {
                    state.markers.remove(&key);
                }
            }
        }
        state.audit.truncate(self.audit_len);
        state.outbox.truncate(self.outbox_len);
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn entry_for_update(&mut self, tenant_id: TenantId, entry_id: EntryId) -> Result<Option<Entry>, StoreError> {
        Ok(self.guard.entries.get(&(tenant_id, entry_id)).cloned())
    }

    async fn put_entry(&mut self, entry: &Entry) -> Result<(), StoreError> {
        let key = (entry.tenant_id, entry.id);
        let before = self.guard.entries.insert(key, entry.clone());
        self.undo.push(Undo::Entry(key, before.clone()));
        self.record(ChangeEvent::entry(
            entry.tenant_id,
            entry.id,
            before,
            Some(entry.clone()),
        ));
        Ok(())
    }

    async fn delete_entry(&mut self, tenant_id: TenantId, entry_id: EntryId) -> Result<Option<Entry>, StoreError> {
        let key = (tenant_id, entry_id);
        let before = self.guard.entries.remove(&key);
        if before.is_some() {
            self.undo.push(Undo::Entry(key, before.clone()));
            self.record(ChangeEvent::entry(tenant_id, entry_id, before.clone(), None));
        }
        Ok(before)
    }

    async fn order_for_update(
        &mut self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> Result<Option<ServiceOrder>, StoreError> {
        Ok(self.guard.orders.get(&(tenant_id, order_id)).cloned())
    }

    async fn put_order(&mut self, order: &ServiceOrder) -> Result<(), StoreError> {
        let key = (order.tenant_id, order.id);
        let before = self.guard.orders.insert(key, order.clone());
        self.undo.push(Undo::Order(key, before.clone()));
        self.record(ChangeEvent::order(
            order.tenant_id,
            order.id,
            before,
            Some(order.clone()),
        ));
        Ok(())
    }

    async fn marker_exists(&mut self, tenant_id: TenantId, event_id: EventId, handler: &str) -> Result<bool, StoreError> {
        Ok(self
            .guard
            .markers
            .contains_key(&(tenant_id, event_id, handler.to_string())))
    }

    async fn insert_marker(&mut self, marker: &EventMarker) -> Result<(), StoreError> {
        let key = (marker.tenant_id, marker.event_id, marker.handler.clone());
        if self.guard.markers.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "event {} already processed by {}",
                marker.event_id, marker.handler
            )));
        }
        self.guard.markers.insert(key.clone(), marker.clone());
        self.undo.push(Undo::Marker(key));
        Ok(())
    }

    async fn increment_rollup(
        &mut self,
        tenant_id: TenantId,
        delta: &RollupDelta,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let key = (tenant_id, delta.month);
        let before = self.guard.rollups.get(&key).cloned();
        let mut rollup = before
            .clone()
            .unwrap_or_else(|| MonthlyRollup::empty(tenant_id, delta.month, at));
        rollup
            .apply(delta, at)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.guard.rollups.insert(key, rollup);
        self.undo.push(Undo::Rollup(key, before));
        Ok(())
    }

    async fn append_audit(&mut self, event: &AuditEvent) -> Result<(), StoreError> {
        self.guard.audit.push(event.clone());
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        self.committed = true;
        self.undo.clear();
        Ok(())
    }
}
