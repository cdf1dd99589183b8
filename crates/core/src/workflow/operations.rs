//! Transactional confirm, cancel and reverse.
//!
//! Each operation checks the caller, validates the request, then runs one
//! store transaction: lock the entry, decide, write the entry (and the
//! reversal), append the audit event, commit. Nothing is written when a
//! guard fails or when the effect was already applied. A transaction that
//! loses a serialization race is rerun from the read.

use chrono::Utc;
use serde_json::json;
use solaris_shared::types::{EntryId, TenantId};
use tracing::{info, warn};

use crate::auth::{Principal, ensure_backend};
use crate::ledger::types::{Entry, EntryStatus};
use crate::store::{AuditEvent, AuditEventType, LedgerStore, LedgerTx, StoreError};
use crate::workflow::error::WorkflowError;
use crate::workflow::service::WorkflowService;
use crate::workflow::types::{
    CancelCommand, CancelOutcome, CancelRequest, ConfirmCommand, ConfirmOutcome, ConfirmRequest, Decision,
    ReverseCommand, ReverseOutcome, ReverseRequest, WorkflowAction,
};

/// Attempts per operation when the store reports a write conflict.
const MAX_ATTEMPTS: u32 = 3;

fn lost_race(result: &Result<impl Sized, WorkflowError>, attempt: u32, operation: &str) -> bool {
    let Err(WorkflowError::Store(StoreError::Conflict(reason))) = result else {
        return false;
    };
    if attempt >= MAX_ATTEMPTS {
        return false;
    }
    warn!(operation, attempt, reason = %reason, "Write conflict, retrying");
    true
}

/// Status-changing operations over a ledger store.
#[derive(Debug, Clone)]
pub struct LedgerOperations<S> {
    store: S,
}

impl<S: LedgerStore> LedgerOperations<S> {
    /// Creates the operations over a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn lock_entry(tx: &mut S::Tx, tenant_id: TenantId, entry_id: EntryId) -> Result<Entry, WorkflowError> {
        tx.entry_for_update(tenant_id, entry_id)
            .await?
            .ok_or(WorkflowError::EntryNotFound(entry_id))
    }

    /// `confirmarLancamento`.
    pub async fn confirm(
        &self,
        principal: Option<&Principal>,
        request: ConfirmRequest,
    ) -> Result<ConfirmOutcome, WorkflowError> {
        let actor = ensure_backend(principal)?;
        let cmd = ConfirmCommand::try_from(request)?;
        self.confirm_command(actor, &cmd).await
    }

    /// Confirms a validated command on behalf of a backend caller.
    pub async fn confirm_command(
        &self,
        actor: &Principal,
        cmd: &ConfirmCommand,
    ) -> Result<ConfirmOutcome, WorkflowError> {
        let mut attempt = 1;
        loop {
            let result = self.try_confirm(actor, cmd).await;
            if !lost_race(&result, attempt, "confirm") {
                return result;
            }
            attempt += 1;
        }
    }

    async fn try_confirm(&self, actor: &Principal, cmd: &ConfirmCommand) -> Result<ConfirmOutcome, WorkflowError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut entry = Self::lock_entry(&mut tx, cmd.tenant_id, cmd.entry_id).await?;

        let Decision::Apply(action) = WorkflowService::confirm(&entry, cmd, &actor.uid, now)? else {
            return Ok(ConfirmOutcome {
                ok: true,
                already_confirmed: true,
            });
        };

        action.apply_to(&mut entry, now);
        tx.put_entry(&entry).await?;
        tx.append_audit(
            &AuditEvent::new(
                cmd.tenant_id,
                AuditEventType::LancamentoConfirmado,
                json!({ "status": entry.status }),
            )
            .for_entry(entry.id)
            .by(&actor.uid),
        )
        .await?;
        tx.commit().await?;

        info!(
            tenant_id = %cmd.tenant_id,
            entry_id = %cmd.entry_id,
            status = %entry.status,
            actor = %actor.uid,
            "Entry confirmed"
        );
        Ok(ConfirmOutcome {
            ok: true,
            already_confirmed: false,
        })
    }

    /// Receives an installment: confirm with final status `RECEBIDO`.
    pub async fn receive_installment(
        &self,
        principal: Option<&Principal>,
        mut cmd: ConfirmCommand,
    ) -> Result<ConfirmOutcome, WorkflowError> {
        let actor = ensure_backend(principal)?;
        cmd.final_status = EntryStatus::Recebido;
        self.confirm_command(actor, &cmd).await
    }

    /// `cancelarLancamentoPendente`.
    pub async fn cancel(
        &self,
        principal: Option<&Principal>,
        request: CancelRequest,
    ) -> Result<CancelOutcome, WorkflowError> {
        let actor = ensure_backend(principal)?;
        let cmd = CancelCommand::try_from(request)?;

        let mut attempt = 1;
        loop {
            let result = self.try_cancel(actor, &cmd).await;
            if !lost_race(&result, attempt, "cancel") {
                return result;
            }
            attempt += 1;
        }
    }

    async fn try_cancel(&self, actor: &Principal, cmd: &CancelCommand) -> Result<CancelOutcome, WorkflowError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut entry = Self::lock_entry(&mut tx, cmd.tenant_id, cmd.entry_id).await?;

        let Decision::Apply(action) = WorkflowService::cancel(&entry, cmd, &actor.uid, now)? else {
            return Ok(CancelOutcome {
                ok: true,
                already_canceled: true,
            });
        };

        action.apply_to(&mut entry, now);
        tx.put_entry(&entry).await?;
        tx.append_audit(
            &AuditEvent::new(
                cmd.tenant_id,
                AuditEventType::LancamentoCancelado,
                json!({ "motivo": cmd.reason }),
            )
            .for_entry(entry.id)
            .by(&actor.uid),
        )
        .await?;
        tx.commit().await?;

        info!(
            tenant_id = %cmd.tenant_id,
            entry_id = %cmd.entry_id,
            actor = %actor.uid,
            "Entry cancelled"
        );
        Ok(CancelOutcome {
            ok: true,
            already_canceled: false,
        })
    }

    /// `estornarLancamento`.
    pub async fn reverse(
        &self,
        principal: Option<&Principal>,
        request: ReverseRequest,
    ) -> Result<ReverseOutcome, WorkflowError> {
        let actor = ensure_backend(principal)?;
        let cmd = ReverseCommand::try_from(request)?;

        let mut attempt = 1;
        loop {
            let result = self.try_reverse(actor, &cmd).await;
            if !lost_race(&result, attempt, "reverse") {
                return result;
            }
            attempt += 1;
        }
    }

    async fn try_reverse(&self, actor: &Principal, cmd: &ReverseCommand) -> Result<ReverseOutcome, WorkflowError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let mut entry = Self::lock_entry(&mut tx, cmd.tenant_id, cmd.entry_id).await?;

        let action = match WorkflowService::reverse(&entry, cmd, &actor.uid, now)? {
            Decision::AlreadyApplied => {
                return Ok(ReverseOutcome {
                    ok: true,
                    already_estornado: true,
                    estorno_lancamento_id: entry.reversal_entry_id,
                });
            }
            Decision::Apply(action) => action,
        };
        let WorkflowAction::Reverse { reversal, .. } = &action else {
            return Err(WorkflowError::InvalidArgument(
                "unexpected workflow action for reversal".to_string(),
            ));
        };
        let reversal_id = reversal.id;

        tx.put_entry(reversal).await?;
        action.apply_to(&mut entry, now);
        tx.put_entry(&entry).await?;
        tx.append_audit(
            &AuditEvent::new(
                cmd.tenant_id,
                AuditEventType::LancamentoEstornado,
                json!({ "estornoLancamentoId": reversal_id, "motivo": cmd.reason }),
            )
            .for_entry(entry.id)
            .by(&actor.uid),
        )
        .await?;
        tx.commit().await?;

        info!(
            tenant_id = %cmd.tenant_id,
            entry_id = %cmd.entry_id,
            reversal_id = %reversal_id,
            actor = %actor.uid,
            "Entry reversed"
        );
        Ok(ReverseOutcome {
            ok: true,
            already_estornado: false,
            estorno_lancamento_id: Some(reversal_id),
        })
    }
}
