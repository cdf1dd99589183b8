//! Order document writes.

use chrono::Utc;
use solaris_shared::types::{OrderId, TenantId};
use tracing::debug;

use super::types::ServiceOrder;
use crate::store::{LedgerStore, LedgerTx, StoreError};

/// Writes service order documents. Completion billing happens
/// asynchronously, driven by the change event each write produces.
#[derive(Debug, Clone)]
pub struct OrderService<S> {
    store: S,
}

impl<S: LedgerStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Inserts or replaces an order.
    ///
    /// Path identifiers win over the document's. Billing stamps already on
    /// the stored order are kept when the incoming document omits them.
    pub async fn upsert(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        mut order: ServiceOrder,
    ) -> Result<ServiceOrder, StoreError> {
        order.tenant_id = tenant_id;
        order.id = order_id;
        order.updated_at = Utc::now();

        let mut tx = self.store.begin().await?;
        if let Some(current) = tx.order_for_update(tenant_id, order_id).await? {
            if order.billing_status.is_none() {
                order.billing_status = current.billing_status;
                order.billing_count = current.billing_count;
                order.billing_updated_at = current.billing_updated_at;
            }
        }
        tx.put_order(&order).await?;
        tx.commit().await?;

        debug!(tenant_id = %tenant_id, order_id = %order_id, status = ?order.status, "Order saved");
        Ok(order)
    }

    pub async fn get(&self, tenant_id: TenantId, order_id: OrderId) -> Result<Option<ServiceOrder>, StoreError> {
        self.store.get_order(tenant_id, order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::types::{BillingStatus, OrderStatus};
    use crate::store::{Change, MemoryStore};

    #[tokio::test]
    async fn test_upsert_uses_path_ids_and_keeps_stamps() {
        let store = MemoryStore::new();
        let service = OrderService::new(store.clone());
        let tenant = TenantId::new();
        let id = OrderId::new();

        let mut first = ServiceOrder::new(TenantId::new(), OrderId::new(), OrderStatus::Concluida, Utc::now());
        first.stamp_billing(BillingStatus::Gerados, Some(2), Utc::now());
        service.upsert(tenant, id, first).await.unwrap();

        let second = ServiceOrder::new(tenant, id, OrderStatus::Concluida, Utc::now());
        let saved = service.upsert(tenant, id, second).await.unwrap();

        assert_eq!(saved.tenant_id, tenant);
        assert_eq!(saved.billing_status, Some(BillingStatus::Gerados));
        assert_eq!(saved.billing_count, Some(2));
        assert_eq!(service.get(tenant, id).await.unwrap(), Some(saved));

        let events = store.pending_events(10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1].change, Change::Order { before: Some(_), .. }));
    }
}
