//! Storage abstraction for the ledger.
//!
//! A [`LedgerStore`] hands out [`LedgerTx`] transactions with serializable
//! isolation. Every entry or order write made through a transaction appends
//! a [`ChangeEvent`] to an outbox in the same transaction; the event
//! dispatcher later delivers those events to the handlers.
//!
//! Dropping a transaction without calling [`LedgerTx::commit`] discards it.

pub mod error;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solaris_shared::types::{AuditEventId, EntryId, EventId, OrderId, TenantId};

use crate::ledger::calendar::MonthId;
use crate::ledger::rollup::{MonthlyRollup, RollupDelta};
use crate::ledger::types::Entry;
use crate::orders::types::ServiceOrder;

pub use error::StoreError;
pub use memory::MemoryStore;

/// Document change captured by the outbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "collection", rename_all = "snake_case")]
pub enum Change {
    /// Write to an entry.
    Entry {
        entry_id: EntryId,
        before: Option<Entry>,
        after: Option<Entry>,
    },
    /// Write to a service order.
    Order {
        order_id: OrderId,
        before: Option<ServiceOrder>,
        after: Option<ServiceOrder>,
    },
}

/// A write event with its before and after images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Delivery id, stable across redeliveries.
    pub id: EventId,
    pub tenant_id: TenantId,
    pub occurred_at: DateTime<Utc>,
    pub change: Change,
    /// Failed delivery attempts so far.
    #[serde(default)]
    pub attempts: u32,
}

impl ChangeEvent {
    /// Creates an event for an entry write.
    #[must_use]
    pub fn entry(tenant_id: TenantId, entry_id: EntryId, before: Option<Entry>, after: Option<Entry>) -> Self {
        Self {
            id: EventId::new(),
            tenant_id,
            occurred_at: Utc::now(),
            change: Change::Entry { entry_id, before, after },
            attempts: 0,
        }
    }

    /// Creates an event for an order write.
    #[must_use]
    pub fn order(
        tenant_id: TenantId,
        order_id: OrderId,
        before: Option<ServiceOrder>,
        after: Option<ServiceOrder>,
    ) -> Self {
        Self {
            id: EventId::new(),
            tenant_id,
            occurred_at: Utc::now(),
            change: Change::Order { order_id, before, after },
            attempts: 0,
        }
    }
}

/// Type of effect guarded by a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkerKind {
    /// Entries generated from a completed order.
    OsLancamentosGerados,
    /// Completed order with nothing to bill.
    OsLancamentosSkip,
    /// Monthly rollup increments applied.
    FinanceiroMensal,
}

impl MarkerKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OsLancamentosGerados => "OS_LANCAMENTOS_GERADOS",
            Self::OsLancamentosSkip => "OS_LANCAMENTOS_SKIP",
            Self::FinanceiroMensal => "FINANCEIRO_MENSAL",
        }
    }
}

/// Record that a handler already applied the effects of an event.
///
/// Keyed by `(tenant_id, event_id, handler)`. Created in the same
/// transaction as the effects it guards and never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMarker {
    #[serde(rename = "empresaId")]
    pub tenant_id: TenantId,
    pub event_id: EventId,
    pub handler: String,
    #[serde(rename = "type")]
    pub kind: MarkerKind,
    #[serde(rename = "osId", default)]
    pub order_id: Option<OrderId>,
    #[serde(rename = "lancamentoId", default)]
    pub entry_id: Option<EntryId>,
    #[serde(default)]
    pub before_month: Option<MonthId>,
    #[serde(default)]
    pub after_month: Option<MonthId>,
    pub created_at: DateTime<Utc>,
}

/// Audit event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    LancamentoConfirmado,
    LancamentoCancelado,
    LancamentoEstornado,
    OsLancamentosGerados,
}

impl AuditEventType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LancamentoConfirmado => "LANCAMENTO_CONFIRMADO",
            Self::LancamentoCancelado => "LANCAMENTO_CANCELADO",
            Self::LancamentoEstornado => "LANCAMENTO_ESTORNADO",
            Self::OsLancamentosGerados => "OS_LANCAMENTOS_GERADOS",
        }
    }
}

/// Append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: AuditEventId,
    #[serde(rename = "empresaId")]
    pub tenant_id: TenantId,
    pub event_type: AuditEventType,
    #[serde(rename = "lancamentoId", default)]
    pub entry_id: Option<EntryId>,
    #[serde(rename = "osId", default)]
    pub order_id: Option<OrderId>,
    /// Acting principal, `None` for trigger handlers.
    #[serde(default)]
    pub actor: Option<String>,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Creates an audit record stamped now.
    #[must_use]
    pub fn new(tenant_id: TenantId, event_type: AuditEventType, payload: Value) -> Self {
        Self {
            id: AuditEventId::new(),
            tenant_id,
            event_type,
            entry_id: None,
            order_id: None,
            actor: None,
            payload,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn for_entry(mut self, entry_id: EntryId) -> Self {
        self.entry_id = Some(entry_id);
        self
    }

    #[must_use]
    pub fn for_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    #[must_use]
    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

/// Ledger persistence. Handles are cheap to clone and share one backend.
#[async_trait]
pub trait LedgerStore: Clone + Send + Sync + 'static {
    /// Transaction type.
    type Tx: LedgerTx;

    /// Starts a serializable transaction.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// All entries of a tenant.
    async fn list_entries(&self, tenant_id: TenantId) -> Result<Vec<Entry>, StoreError>;

    async fn get_entry(&self, tenant_id: TenantId, entry_id: EntryId) -> Result<Option<Entry>, StoreError>;

    async fn get_order(&self, tenant_id: TenantId, order_id: OrderId) -> Result<Option<ServiceOrder>, StoreError>;

    async fn get_rollup(&self, tenant_id: TenantId, month: MonthId) -> Result<Option<MonthlyRollup>, StoreError>;

    /// All rollups of a tenant, ordered by month.
    async fn list_rollups(&self, tenant_id: TenantId) -> Result<Vec<MonthlyRollup>, StoreError>;

    async fn get_marker(
        &self,
        tenant_id: TenantId,
        event_id: EventId,
        handler: &str,
    ) -> Result<Option<EventMarker>, StoreError>;

    /// Undelivered, unparked outbox events in write order.
    async fn pending_events(&self, limit: usize) -> Result<Vec<ChangeEvent>, StoreError>;

    /// Marks an event delivered.
    async fn ack_event(&self, event_id: EventId) -> Result<(), StoreError>;

    /// Records a failed delivery. A parked event is no longer returned by
    /// [`LedgerStore::pending_events`].
    async fn fail_event(&self, event_id: EventId, error: &str, park: bool) -> Result<(), StoreError>;
}

/// A serializable store transaction.
#[async_trait]
pub trait LedgerTx: Send {
    /// Reads an entry and locks it until the transaction ends.
    async fn entry_for_update(&mut self, tenant_id: TenantId, entry_id: EntryId) -> Result<Option<Entry>, StoreError>;

    /// Inserts or replaces an entry and appends its change event.
    async fn put_entry(&mut self, entry: &Entry) -> Result<(), StoreError>;

    /// Deletes an entry, returning the deleted image, and appends its change event.
    async fn delete_entry(&mut self, tenant_id: TenantId, entry_id: EntryId) -> Result<Option<Entry>, StoreError>;

    /// Reads an order and locks it until the transaction ends.
    async fn order_for_update(
        &mut self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> Result<Option<ServiceOrder>, StoreError>;

    /// Inserts or replaces an order and appends its change event.
    async fn put_order(&mut self, order: &ServiceOrder) -> Result<(), StoreError>;

    async fn marker_exists(&mut self, tenant_id: TenantId, event_id: EventId, handler: &str) -> Result<bool, StoreError>;

    /// Inserts a marker. Fails with [`StoreError::Conflict`] if one already exists.
    async fn insert_marker(&mut self, marker: &EventMarker) -> Result<(), StoreError>;

    /// Atomically adds a signed delta to a month's rollup, creating it if needed.
    async fn increment_rollup(
        &mut self,
        tenant_id: TenantId,
        delta: &RollupDelta,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn append_audit(&mut self, event: &AuditEvent) -> Result<(), StoreError>;

    /// Commits every write made through this transaction.
    async fn commit(self) -> Result<(), StoreError>;
}
