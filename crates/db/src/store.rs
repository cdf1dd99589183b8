//! PostgreSQL implementation of the ledger store.
//!
//! Transactions run at `SERIALIZABLE` isolation. Reads taken for update use
//! `SELECT ... FOR UPDATE`, and every entry or order write inserts its change
//! event into the `change_events` outbox inside the same transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr,
    EntityTrait, IsolationLevel, NotSet, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, Statement,
    TransactionTrait,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use solaris_core::ledger::calendar::MonthId;
use solaris_core::ledger::rollup::{MonthlyRollup, RollupDelta, RollupTotals};
use solaris_core::ledger::types::Entry;
use solaris_core::orders::types::ServiceOrder;
use solaris_core::store::{AuditEvent, ChangeEvent, EventMarker, LedgerStore, LedgerTx, StoreError};
use solaris_shared::types::{EntryId, EventId, OrderId, TenantId};

use crate::entities::{audit_events, change_events, financeiro_mensal, lancamentos, ordens_servico, processed_events};

const INCREMENT_ROLLUP_SQL: &str = r"
INSERT INTO financeiro_mensal (empresa_id, month_key, year, month, entradas, saidas, saldo, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (empresa_id, month_key) DO UPDATE SET
    entradas = financeiro_mensal.entradas + EXCLUDED.entradas,
    saidas = financeiro_mensal.saidas + EXCLUDED.saidas,
    saldo = financeiro_mensal.saldo + EXCLUDED.saldo,
    updated_at = EXCLUDED.updated_at
";

/// Maps a database error onto the store error taxonomy.
///
/// Unique violations and serialization failures abort the transaction and
/// surface as conflicts; everything else is a backend error.
fn db_error(err: DbErr) -> StoreError {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return StoreError::Conflict(err.to_string());
    }
    let message = err.to_string();
    if message.contains("could not serialize access") || message.contains("deadlock detected") {
        StoreError::Conflict(message)
    } else {
        StoreError::Backend(message)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(value)?)
}

/// Persisted label of a serde unit variant.
fn label<T: Serialize>(value: &T) -> Result<String, StoreError> {
    match serde_json::to_value(value)? {
        Value::String(s) => Ok(s),
        other => Err(StoreError::Serialization(format!("expected a string label, got {other}"))),
    }
}

fn month_key(raw: &str) -> Result<MonthId, StoreError> {
    raw.parse()
        .map_err(|e: solaris_core::ledger::calendar::InvalidMonthId| StoreError::Serialization(e.to_string()))
}

fn entry_model(entry: &Entry) -> Result<lancamentos::ActiveModel, StoreError> {
    Ok(lancamentos::ActiveModel {
        id: Set(entry.id.into_inner()),
        empresa_id: Set(entry.tenant_id.into_inner()),
        tipo: Set(entry.kind.as_str().to_string()),
        status: Set(entry.status.as_str().to_string()),
        valor: Set(entry.amount),
        data_competencia: Set(entry.competence_date.map(Into::into)),
        data_vencimento: Set(entry.due_date.map(Into::into)),
        data_pagamento: Set(entry.payment_date.map(Into::into)),
        id_os: Set(entry.order_id.map(OrderId::into_inner)),
        document: Set(serde_json::to_value(entry)?),
        created_at: Set(entry.created_at.into()),
        updated_at: Set(entry.updated_at.into()),
    })
}

fn order_model(order: &ServiceOrder) -> Result<ordens_servico::ActiveModel, StoreError> {
    Ok(ordens_servico::ActiveModel {
        id: Set(order.id.into_inner()),
        empresa_id: Set(order.tenant_id.into_inner()),
        status: Set(label(&order.status)?),
        document: Set(serde_json::to_value(order)?),
        updated_at: Set(order.updated_at.into()),
    })
}

fn rollup_from_model(model: financeiro_mensal::Model) -> Result<MonthlyRollup, StoreError> {
    let month = month_key(&model.month_key)?;
    Ok(MonthlyRollup {
        tenant_id: TenantId::from_uuid(model.empresa_id),
        month_key: month,
        year: month.year(),
        month: month.month(),
        totals: RollupTotals {
            entradas: model.entradas,
            saidas: model.saidas,
            saldo: model.saldo,
        },
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn marker_from_model(model: processed_events::Model) -> Result<EventMarker, StoreError> {
    Ok(EventMarker {
        tenant_id: TenantId::from_uuid(model.empresa_id),
        event_id: EventId::from_uuid(model.event_id),
        handler: model.handler,
        kind: decode(Value::String(model.kind))?,
        order_id: model.id_os.map(OrderId::from_uuid),
        entry_id: model.lancamento_id.map(EntryId::from_uuid),
        before_month: model.before_month.as_deref().map(month_key).transpose()?,
        after_month: model.after_month.as_deref().map(month_key).transpose()?,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn event_from_model(model: change_events::Model) -> Result<ChangeEvent, StoreError> {
    Ok(ChangeEvent {
        id: EventId::from_uuid(model.id),
        tenant_id: TenantId::from_uuid(model.empresa_id),
        occurred_at: model.occurred_at.with_timezone(&Utc),
        change: decode(model.change)?,
        attempts: u32::try_from(model.attempts).unwrap_or_default(),
    })
}

/// Ledger store over a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
}

impl PgLedgerStore {
    /// Creates a store over an established connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await
            .map_err(db_error)?;
        Ok(PgLedgerTx { txn })
    }

    async fn list_entries(&self, tenant_id: TenantId) -> Result<Vec<Entry>, StoreError> {
        lancamentos::Entity::find()
            .filter(lancamentos::Column::EmpresaId.eq(tenant_id.into_inner()))
            .order_by_asc(lancamentos::Column::CreatedAt)
            .order_by_asc(lancamentos::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|model| decode(model.document))
            .collect()
    }

    async fn get_entry(&self, tenant_id: TenantId, entry_id: EntryId) -> Result<Option<Entry>, StoreError> {
        lancamentos::Entity::find_by_id(entry_id.into_inner())
            .filter(lancamentos::Column::EmpresaId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_error)?
            .map(|model| decode(model.document))
            .transpose()
    }

    async fn get_order(&self, tenant_id: TenantId, order_id: OrderId) -> Result<Option<ServiceOrder>, StoreError> {
        ordens_servico::Entity::find_by_id(order_id.into_inner())
            .filter(ordens_servico::Column::EmpresaId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_error)?
            .map(|model| decode(model.document))
            .transpose()
    }

    async fn get_rollup(&self, tenant_id: TenantId, month: MonthId) -> Result<Option<MonthlyRollup>, StoreError> {
        financeiro_mensal::Entity::find_by_id((tenant_id.into_inner(), month.to_string()))
            .one(&self.db)
            .await
            .map_err(db_error)?
            .map(rollup_from_model)
            .transpose()
    }

    async fn list_rollups(&self, tenant_id: TenantId) -> Result<Vec<MonthlyRollup>, StoreError> {
        financeiro_mensal::Entity::find()
            .filter(financeiro_mensal::Column::EmpresaId.eq(tenant_id.into_inner()))
            .order_by_asc(financeiro_mensal::Column::MonthKey)
            .all(&self.db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(rollup_from_model)
            .collect()
    }

    async fn get_marker(
        &self,
        tenant_id: TenantId,
        event_id: EventId,
        handler: &str,
    ) -> Result<Option<EventMarker>, StoreError> {
        processed_events::Entity::find_by_id((tenant_id.into_inner(), event_id.into_inner(), handler.to_string()))
            .one(&self.db)
            .await
            .map_err(db_error)?
            .map(marker_from_model)
            .transpose()
    }

    async fn pending_events(&self, limit: usize) -> Result<Vec<ChangeEvent>, StoreError> {
        change_events::Entity::find()
            .filter(change_events::Column::Status.eq(change_events::STATUS_PENDING))
            .order_by_asc(change_events::Column::Seq)
            .limit(u64::try_from(limit).unwrap_or(u64::MAX))
            .all(&self.db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(event_from_model)
            .collect()
    }

    async fn ack_event(&self, event_id: EventId) -> Result<(), StoreError> {
        change_events::Entity::update_many()
            .col_expr(change_events::Column::Status, Expr::value(change_events::STATUS_DELIVERED))
            .filter(change_events::Column::Id.eq(event_id.into_inner()))
            .exec(&self.db)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn fail_event(&self, event_id: EventId, error: &str, park: bool) -> Result<(), StoreError> {
        let mut update = change_events::Entity::update_many()
            .col_expr(
                change_events::Column::Attempts,
                Expr::col(change_events::Column::Attempts).add(1),
            )
            .col_expr(change_events::Column::LastError, Expr::value(error.to_string()))
            .filter(change_events::Column::Id.eq(event_id.into_inner()));
        if park {
            update = update.col_expr(change_events::Column::Status, Expr::value(change_events::STATUS_PARKED));
        }

        let result = update.exec(&self.db).await.map_err(db_error)?;
        if result.rows_affected == 0 {
            warn!(event_id = %event_id, "Failed delivery recorded for unknown change event");
        }
        Ok(())
    }
}

/// A serializable PostgreSQL transaction.
///
/// Dropping it without [`LedgerTx::commit`] rolls it back.
#[derive(Debug)]
pub struct PgLedgerTx {
    txn: DatabaseTransaction,
}

impl PgLedgerTx {
    async fn record(&self, event: ChangeEvent) -> Result<(), StoreError> {
        let row = change_events::ActiveModel {
            seq: NotSet,
            id: Set(event.id.into_inner()),
            empresa_id: Set(event.tenant_id.into_inner()),
            occurred_at: Set(event.occurred_at.into()),
            change: Set(serde_json::to_value(&event.change)?),
            attempts: Set(0),
            status: Set(change_events::STATUS_PENDING.to_string()),
            last_error: Set(None),
        };
        change_events::Entity::insert(row)
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_error)?;

        debug!(event_id = %event.id, tenant_id = %event.tenant_id, "Change event recorded");
        Ok(())
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn entry_for_update(&mut self, tenant_id: TenantId, entry_id: EntryId) -> Result<Option<Entry>, StoreError> {
        lancamentos::Entity::find_by_id(entry_id.into_inner())
            .filter(lancamentos::Column::EmpresaId.eq(tenant_id.into_inner()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_error)?
            .map(|model| decode(model.document))
            .transpose()
    }

    async fn put_entry(&mut self, entry: &Entry) -> Result<(), StoreError> {
        let before = self.entry_for_update(entry.tenant_id, entry.id).await?;
        let model = entry_model(entry)?;

        if before.is_some() {
            model.update(&self.txn).await.map_err(db_error)?;
        } else {
            lancamentos::Entity::insert(model)
                .exec_without_returning(&self.txn)
                .await
                .map_err(db_error)?;
        }

        self.record(ChangeEvent::entry(entry.tenant_id, entry.id, before, Some(entry.clone())))
            .await
    }

    async fn delete_entry(&mut self, tenant_id: TenantId, entry_id: EntryId) -> Result<Option<Entry>, StoreError> {
        let Some(before) = self.entry_for_update(tenant_id, entry_id).await? else {
            return Ok(None);
        };

        lancamentos::Entity::delete_by_id(entry_id.into_inner())
            .exec(&self.txn)
            .await
            .map_err(db_error)?;

        self.record(ChangeEvent::entry(tenant_id, entry_id, Some(before.clone()), None))
            .await?;
        Ok(Some(before))
    }

    async fn order_for_update(
        &mut self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> Result<Option<ServiceOrder>, StoreError> {
        ordens_servico::Entity::find_by_id(order_id.into_inner())
            .filter(ordens_servico::Column::EmpresaId.eq(tenant_id.into_inner()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_error)?
            .map(|model| decode(model.document))
            .transpose()
    }

    async fn put_order(&mut self, order: &ServiceOrder) -> Result<(), StoreError> {
        let before = self.order_for_update(order.tenant_id, order.id).await?;
        let model = order_model(order)?;

        if before.is_some() {
            model.update(&self.txn).await.map_err(db_error)?;
        } else {
            ordens_servico::Entity::insert(model)
                .exec_without_returning(&self.txn)
                .await
                .map_err(db_error)?;
        }

        self.record(ChangeEvent::order(order.tenant_id, order.id, before, Some(order.clone())))
            .await
    }

    async fn marker_exists(&mut self, tenant_id: TenantId, event_id: EventId, handler: &str) -> Result<bool, StoreError> {
        let found = processed_events::Entity::find_by_id((
            tenant_id.into_inner(),
            event_id.into_inner(),
            handler.to_string(),
        ))
        .one(&self.txn)
        .await
        .map_err(db_error)?;
        Ok(found.is_some())
    }

    async fn insert_marker(&mut self, marker: &EventMarker) -> Result<(), StoreError> {
        let row = processed_events::ActiveModel {
            empresa_id: Set(marker.tenant_id.into_inner()),
            event_id: Set(marker.event_id.into_inner()),
            handler: Set(marker.handler.clone()),
            kind: Set(marker.kind.as_str().to_string()),
            id_os: Set(marker.order_id.map(OrderId::into_inner)),
            lancamento_id: Set(marker.entry_id.map(EntryId::into_inner)),
            before_month: Set(marker.before_month.map(|m| m.to_string())),
            after_month: Set(marker.after_month.map(|m| m.to_string())),
            created_at: Set(marker.created_at.into()),
        };

        let inserted = processed_events::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    processed_events::Column::EmpresaId,
                    processed_events::Column::EventId,
                    processed_events::Column::Handler,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_error)?;

        if inserted == 0 {
            return Err(StoreError::Conflict(format!(
                "event {} already processed by {}",
                marker.event_id, marker.handler
            )));
        }
        Ok(())
    }

    async fn increment_rollup(
        &mut self,
        tenant_id: TenantId,
        delta: &RollupDelta,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let month = i32::try_from(delta.month.month()).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let values: [sea_orm::Value; 8] = [
            tenant_id.into_inner().into(),
            delta.month.to_string().into(),
            delta.month.year().into(),
            month.into(),
            delta.entradas.into(),
            delta.saidas.into(),
            delta.saldo().into(),
            at.into(),
        ];
        let statement = Statement::from_sql_and_values(DbBackend::Postgres, INCREMENT_ROLLUP_SQL, values);
        self.txn.execute(statement).await.map_err(db_error)?;
        Ok(())
    }

    async fn append_audit(&mut self, event: &AuditEvent) -> Result<(), StoreError> {
        let row = audit_events::ActiveModel {
            id: Set(event.id.into_inner()),
            empresa_id: Set(event.tenant_id.into_inner()),
            event_type: Set(event.event_type.as_str().to_string()),
            lancamento_id: Set(event.entry_id.map(EntryId::into_inner)),
            id_os: Set(event.order_id.map(OrderId::into_inner)),
            actor: Set(event.actor.clone()),
            payload: Set(event.payload.clone()),
            created_at: Set(event.created_at.into()),
        };
        audit_events::Entity::insert(row)
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(db_error)
    }
}
