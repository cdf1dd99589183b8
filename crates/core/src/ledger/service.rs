//! Entry service for manual entry writes and reads.
//!
//! Writes go through a store transaction so each one appends its change
//! event; the rollup handler picks those up afterwards. Status changes are
//! not accepted here: confirm, cancel and reverse live in
//! [`crate::workflow`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solaris_shared::types::{EntryId, OrderId, TenantId};
use tracing::{debug, info};

use super::error::LedgerError;
use super::types::{Entry, EntryKind, EntryOrigin, EntryStatus};
use super::validation::{parse_amount, parse_date, parse_initial_status, parse_kind};
use crate::store::{LedgerStore, LedgerTx};

/// Body of an entry creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewEntry {
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub valor: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "dataCompetencia", default)]
    pub data_competencia: Option<Value>,
    #[serde(alias = "dataVencimento", default)]
    pub data_vencimento: Option<Value>,
    #[serde(alias = "dataPagamento", default)]
    pub data_pagamento: Option<Value>,
    #[serde(alias = "serviceOrderId", default)]
    pub id_os: Option<OrderId>,
    #[serde(default)]
    pub categoria: Option<String>,
    #[serde(default)]
    pub metodo_pagamento: Option<String>,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default)]
    pub cliente_nome: Option<String>,
    #[serde(default)]
    pub cliente_telefone: Option<String>,
    #[serde(default)]
    pub cliente_endereco: Option<String>,
}

/// Partial update of an entry. Absent fields are left untouched.
///
/// Neither `tipo` nor `status` can be patched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryPatch {
    #[serde(default)]
    pub valor: Option<Value>,
    #[serde(rename = "dataCompetencia", default)]
    pub data_competencia: Option<Value>,
    #[serde(alias = "dataVencimento", default)]
    pub data_vencimento: Option<Value>,
    #[serde(alias = "dataPagamento", default)]
    pub data_pagamento: Option<Value>,
    #[serde(alias = "serviceOrderId", default)]
    pub id_os: Option<OrderId>,
    #[serde(default)]
    pub categoria: Option<String>,
    #[serde(default)]
    pub metodo_pagamento: Option<String>,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default)]
    pub cliente_nome: Option<String>,
    #[serde(default)]
    pub cliente_telefone: Option<String>,
    #[serde(default)]
    pub cliente_endereco: Option<String>,
}

impl NewEntry {
    /// Builds the entry document, filling defaults.
    ///
    /// Competência falls back to vencimento, then to `now`. Vencimento
    /// defaults to `now`. An entry created directly in the confirmed set
    /// without a payment date is stamped as paid `now`.
    ///
    /// # Errors
    ///
    /// Returns a validation `LedgerError` for bad values, kinds, statuses or dates.
    pub fn into_entry(self, tenant_id: TenantId, now: DateTime<Utc>) -> Result<Entry, LedgerError> {
        let kind = parse_kind(self.tipo.as_deref())?;
        let amount = parse_amount(self.valor.as_ref())?;
        let status = parse_initial_status(self.status.as_deref())?;
        let due = parse_date("data_vencimento", self.data_vencimento.as_ref())?;
        let competence = parse_date("dataCompetencia", self.data_competencia.as_ref())?;
        let mut payment = parse_date("data_pagamento", self.data_pagamento.as_ref())?;
        if status.is_confirmed() && payment.is_none() {
            payment = Some(now);
        }

        let due = due.unwrap_or(now);
        let mut entry = Entry::pending(tenant_id, kind, amount, due, now);
        entry.status = status;
        entry.competence_date = Some(competence.unwrap_or(due));
        entry.payment_date = payment;
        entry.order_id = self.id_os;
        entry.origin = EntryOrigin::Manual;
        entry.category = self.categoria;
        entry.payment_method = self.metodo_pagamento;
        entry.description = self.descricao;
        entry.client_name = self.cliente_nome;
        entry.client_phone = self.cliente_telefone;
        entry.client_address = self.cliente_endereco;
        Ok(entry)
    }
}

impl EntryPatch {
    /// Applies the patch to `entry`.
    ///
    /// # Errors
    ///
    /// Returns a validation `LedgerError` for bad values or dates.
    pub fn apply_to(self, entry: &mut Entry, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if let Some(valor) = self.valor.as_ref() {
            entry.amount = parse_amount(Some(valor))?;
        }
        if let Some(date) = parse_date("dataCompetencia", self.data_competencia.as_ref())? {
            entry.competence_date = Some(date);
        }
        if let Some(date) = parse_date("data_vencimento", self.data_vencimento.as_ref())? {
            entry.due_date = Some(date);
        }
        if let Some(date) = parse_date("data_pagamento", self.data_pagamento.as_ref())? {
            entry.payment_date = Some(date);
        }
        if self.id_os.is_some() {
            entry.order_id = self.id_os;
        }
        for (value, target) in [
            (self.categoria, &mut entry.category),
            (self.metodo_pagamento, &mut entry.payment_method),
            (self.descricao, &mut entry.description),
            (self.cliente_nome, &mut entry.client_name),
            (self.cliente_telefone, &mut entry.client_phone),
            (self.cliente_endereco, &mut entry.client_address),
        ] {
            if value.is_some() {
                *target = value;
            }
        }
        entry.updated_at = now;
        Ok(())
    }
}

/// Manual entry writes and tenant-scoped reads.
#[derive(Debug, Clone)]
pub struct EntryService<S> {
    store: S,
}

impl<S: LedgerStore> EntryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates an entry.
    ///
    /// # Errors
    ///
    /// Returns a validation `LedgerError` or a store failure.
    pub async fn create(&self, tenant_id: TenantId, input: NewEntry) -> Result<Entry, LedgerError> {
        let entry = input.into_entry(tenant_id, Utc::now())?;

        let mut tx = self.store.begin().await?;
        tx.put_entry(&entry).await?;
        tx.commit().await?;

        info!(
            tenant_id = %tenant_id,
            entry_id = %entry.id,
            kind = %entry.kind,
            status = %entry.status,
            "Entry created"
        );
        Ok(entry)
    }

    /// Applies a partial update to an entry.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::EntryNotFound` if the entry does not exist.
    pub async fn update(&self, tenant_id: TenantId, entry_id: EntryId, patch: EntryPatch) -> Result<Entry, LedgerError> {
        let mut tx = self.store.begin().await?;
        let mut entry = tx
            .entry_for_update(tenant_id, entry_id)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;
        patch.apply_to(&mut entry, Utc::now())?;
        tx.put_entry(&entry).await?;
        tx.commit().await?;

        debug!(tenant_id = %tenant_id, entry_id = %entry_id, "Entry updated");
        Ok(entry)
    }

    /// Deletes an entry.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::EntryNotFound` if the entry does not exist.
    pub async fn delete(&self, tenant_id: TenantId, entry_id: EntryId) -> Result<Entry, LedgerError> {
        let mut tx = self.store.begin().await?;
        let deleted = tx
            .delete_entry(tenant_id, entry_id)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;
        tx.commit().await?;

        info!(tenant_id = %tenant_id, entry_id = %entry_id, "Entry deleted");
        Ok(deleted)
    }

    /// Reads one entry.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::EntryNotFound` if the entry does not exist.
    pub async fn get(&self, tenant_id: TenantId, entry_id: EntryId) -> Result<Entry, LedgerError> {
        self.store
            .get_entry(tenant_id, entry_id)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id))
    }

    /// Lists a tenant's entries, most recent due date first.
    ///
    /// # Errors
    ///
    /// Returns a store failure.
    pub async fn list(&self, tenant_id: TenantId) -> Result<Vec<Entry>, LedgerError> {
        let mut entries = self.store.list_entries(tenant_id).await?;
        entries.sort_by(|a, b| b.due_date.cmp(&a.due_date));
        Ok(entries)
    }

    /// Pending inflows ordered by due date, oldest first (contas a receber).
    ///
    /// # Errors
    ///
    /// Returns a store failure.
    pub async fn receivables(&self, tenant_id: TenantId) -> Result<Vec<Entry>, LedgerError> {
        let mut entries: Vec<Entry> = self
            .store
            .list_entries(tenant_id)
            .await?
            .into_iter()
            .filter(|e| e.kind == EntryKind::Entrada && e.status == EntryStatus::Pendente)
            .collect();
        entries.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Change, MemoryStore};
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn new_entry(body: Value) -> NewEntry {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_defaults_follow_entry_form() {
        let now = Utc.with_ymd_and_hms(2025, 5, 20, 15, 0, 0).unwrap();
        let entry = new_entry(json!({})).into_entry(TenantId::new(), now).unwrap();

        assert_eq!(entry.kind, EntryKind::Entrada);
        assert_eq!(entry.status, EntryStatus::Pendente);
        assert_eq!(entry.amount, Decimal::ZERO);
        assert_eq!(entry.due_date, Some(now));
        assert_eq!(entry.competence_date, Some(now));
        assert_eq!(entry.payment_date, None);
        assert_eq!(entry.origin, EntryOrigin::Manual);
    }

    #[test]
    fn test_competence_falls_back_to_due_date() {
        let now = Utc::now();
        let entry = new_entry(json!({"valor": 80, "dataVencimento": "2025-07-05"}))
            .into_entry(TenantId::new(), now)
            .unwrap();
        let due = Utc.with_ymd_and_hms(2025, 7, 5, 0, 0, 0).unwrap();
        assert_eq!(entry.due_date, Some(due));
        assert_eq!(entry.competence_date, Some(due));
    }

    #[test]
    fn test_confirmed_sale_gets_payment_date() {
        let now = Utc::now();
        let entry = new_entry(json!({"valor": "120", "status": "RECEBIDO", "metodo_pagamento": "pix"}))
            .into_entry(TenantId::new(), now)
            .unwrap();
        assert_eq!(entry.status, EntryStatus::Recebido);
        assert_eq!(entry.payment_date, Some(now));
        assert_eq!(entry.amount, dec!(120));
    }

    #[test]
    fn test_rejects_cancelled_creation() {
        let result = new_entry(json!({"status": "CANCELADO"})).into_entry(TenantId::new(), Utc::now());
        assert!(matches!(result, Err(LedgerError::InvalidStatus(_))));
    }

    #[test]
    fn test_patch_leaves_absent_fields() {
        let now = Utc::now();
        let mut entry = new_entry(json!({"valor": 50, "categoria": "Insumos", "tipo": "SAIDA"}))
            .into_entry(TenantId::new(), now)
            .unwrap();
        let patch: EntryPatch = serde_json::from_value(json!({"valor": 65, "descricao": "Cera"})).unwrap();
        patch.apply_to(&mut entry, now).unwrap();

        assert_eq!(entry.amount, dec!(65));
        assert_eq!(entry.category.as_deref(), Some("Insumos"));
        assert_eq!(entry.description.as_deref(), Some("Cera"));
        assert_eq!(entry.kind, EntryKind::Saida);
    }

    #[tokio::test]
    async fn test_crud_emits_change_events() {
        let store = MemoryStore::new();
        let service = EntryService::new(store.clone());
        let tenant = TenantId::new();

        let created = service.create(tenant, new_entry(json!({"valor": 100}))).await.unwrap();
        let patch: EntryPatch = serde_json::from_value(json!({"valor": 150})).unwrap();
        let updated = service.update(tenant, created.id, patch).await.unwrap();
        assert_eq!(updated.amount, dec!(150));
        assert_eq!(service.get(tenant, created.id).await.unwrap(), updated);

        service.delete(tenant, created.id).await.unwrap();
        assert!(matches!(
            service.get(tenant, created.id).await,
            Err(LedgerError::EntryNotFound(_))
        ));

        let events = store.pending_events(10).await.unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0].change, Change::Entry { before: None, after: Some(_), .. }));
        assert!(matches!(&events[2].change, Change::Entry { before: Some(_), after: None, .. }));
    }

    #[tokio::test]
    async fn test_missing_entry_is_not_found() {
        let service = EntryService::new(MemoryStore::new());
        let err = service
            .update(TenantId::new(), EntryId::new(), EntryPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::EntryNotFound(_)));
        assert!(matches!(
            service.delete(TenantId::new(), EntryId::new()).await,
            Err(LedgerError::EntryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_receivables_sorted_by_due_date() {
        let service = EntryService::new(MemoryStore::new());
        let tenant = TenantId::new();
        for (valor, due, tipo, status) in [
            (10, "2025-03-20", "ENTRADA", "PENDENTE"),
            (20, "2025-03-05", "ENTRADA", "PENDENTE"),
            (30, "2025-03-01", "SAIDA", "PENDENTE"),
            (40, "2025-03-02", "ENTRADA", "RECEBIDO"),
        ] {
            let body = json!({"valor": valor, "data_vencimento": due, "tipo": tipo, "status": status});
            service.create(tenant, new_entry(body)).await.unwrap();
        }

        let receivables = service.receivables(tenant).await.unwrap();
        let values: Vec<Decimal> = receivables.iter().map(|e| e.amount).collect();
        assert_eq!(values, vec![dec!(20), dec!(10)]);
        assert!(service.receivables(TenantId::new()).await.unwrap().is_empty());
    }
}
