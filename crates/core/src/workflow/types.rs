//! Workflow domain types: RPC requests, validated commands, actions and outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solaris_shared::types::{EntryId, TenantId};

use crate::ledger::dates::normalize_date;
use crate::ledger::types::{Entry, EntryStatus};
use crate::workflow::error::WorkflowError;

/// Body of `confirmarLancamento`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    /// Tenant id.
    pub empresa_id: Option<String>,
    /// Entry to confirm.
    pub lancamento_id: Option<String>,
    /// Any accepted date shape; unparseable values fall back to now.
    #[serde(default)]
    pub data_pagamento: Option<Value>,
    /// Payment method as typed by the user.
    pub metodo_pagamento: Option<String>,
    /// Acting user, recorded as `confirmadoPor`.
    pub usuario_id: Option<String>,
    /// Final status, `CONFIRMADO` when absent.
    pub status: Option<String>,
}

/// Body of `cancelarLancamentoPendente`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    /// Tenant id.
    pub empresa_id: Option<String>,
    /// Entry to cancel.
    pub lancamento_id: Option<String>,
    /// Free-text reason.
    pub motivo: Option<String>,
    /// Acting user.
    pub usuario_id: Option<String>,
}

/// Body of `estornarLancamento`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseRequest {
    /// Tenant id.
    pub empresa_id: Option<String>,
    /// Confirmed entry to reverse.
    pub lancamento_id: Option<String>,
    /// Free-text reason.
    pub motivo: Option<String>,
    /// Acting user.
    pub usuario_id: Option<String>,
    /// Reversal date; every date of the reversal entry derives from it.
    #[serde(default)]
    pub data_estorno: Option<Value>,
}

fn parse_target(
    tenant: Option<&str>,
    entry: Option<&str>,
) -> Result<(TenantId, EntryId), WorkflowError> {
    let tenant = tenant.map(str::trim).filter(|s| !s.is_empty());
    let entry = entry.map(str::trim).filter(|s| !s.is_empty());
    let (Some(tenant), Some(entry)) = (tenant, entry) else {
        return Err(WorkflowError::MissingIdentifiers);
    };
    let tenant_id = tenant
        .parse()
        .map_err(|_| WorkflowError::InvalidArgument(format!("empresaId inválido: {tenant}")))?;
    let entry_id = entry
        .parse()
        .map_err(|_| WorkflowError::InvalidArgument(format!("lancamentoId inválido: {entry}")))?;
    Ok((tenant_id, entry_id))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Validated confirm request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmCommand {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Target entry.
    pub entry_id: EntryId,
    /// Status from the confirmed set.
    pub final_status: EntryStatus,
    /// Payment date, now when absent.
    pub payment_date: Option<DateTime<Utc>>,
    /// Normalized payment method.
    pub payment_method: Option<String>,
    /// Acting user.
    pub user_id: Option<String>,
}

impl ConfirmCommand {
    /// Confirm with the given final status and defaults for everything else.
    #[must_use]
    pub fn new(tenant_id: TenantId, entry_id: EntryId, final_status: EntryStatus) -> Self {
        Self {
            tenant_id,
            entry_id,
            final_status,
            payment_date: None,
            payment_method: None,
            user_id: None,
        }
    }
}

impl TryFrom<ConfirmRequest> for ConfirmCommand {
    type Error = WorkflowError;

    fn try_from(req: ConfirmRequest) -> Result<Self, Self::Error> {
        let (tenant_id, entry_id) = parse_target(req.empresa_id.as_deref(), req.lancamento_id.as_deref())?;
        let final_status = match req.status.as_deref() {
            None => EntryStatus::Confirmado,
            Some(raw) => raw
                .parse::<EntryStatus>()
                .ok()
                .filter(EntryStatus::is_confirmed)
                .ok_or(WorkflowError::InvalidFinalStatus)?,
        };
        Ok(Self {
            tenant_id,
            entry_id,
            final_status,
            payment_date: req.data_pagamento.as_ref().and_then(normalize_date),
            payment_method: non_blank(req.metodo_pagamento),
            user_id: non_blank(req.usuario_id),
        })
    }
}

/// Validated cancel request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelCommand {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Target entry.
    pub entry_id: EntryId,
    /// Free-text reason.
    pub reason: Option<String>,
    /// Acting user.
    pub user_id: Option<String>,
}

impl TryFrom<CancelRequest> for CancelCommand {
    type Error = WorkflowError;

    fn try_from(req: CancelRequest) -> Result<Self, Self::Error> {
        let (tenant_id, entry_id) = parse_target(req.empresa_id.as_deref(), req.lancamento_id.as_deref())?;
        Ok(Self {
            tenant_id,
            entry_id,
            reason: non_blank(req.motivo),
            user_id: non_blank(req.usuario_id),
        })
    }
}

/// Validated reverse request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseCommand {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Entry being reversed.
    pub entry_id: EntryId,
    /// Free-text reason.
    pub reason: Option<String>,
    /// Acting user.
    pub user_id: Option<String>,
    /// Reversal date, now when absent.
    pub reversal_date: Option<DateTime<Utc>>,
}

impl TryFrom<ReverseRequest> for ReverseCommand {
    type Error = WorkflowError;

    fn try_from(req: ReverseRequest) -> Result<Self, Self::Error> {
        let (tenant_id, entry_id) = parse_target(req.empresa_id.as_deref(), req.lancamento_id.as_deref())?;
        Ok(Self {
            tenant_id,
            entry_id,
            reason: non_blank(req.motivo),
            user_id: non_blank(req.usuario_id),
            reversal_date: req.data_estorno.as_ref().and_then(normalize_date),
        })
    }
}

/// State change decided by the workflow service, with its audit data.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowAction {
    /// Pending → confirmed set.
    Confirm {
        /// Final status.
        new_status: EntryStatus,
        /// Stamped as `dataPagamento`.
        payment_date: DateTime<Utc>,
        /// Stamped as `metodoPagamento`.
        payment_method: Option<String>,
        /// Actor.
        confirmed_by: String,
    },
    /// Pending → cancelled.
    Cancel {
        /// Actor.
        canceled_by: String,
        /// Cancellation time.
        canceled_at: DateTime<Utc>,
        /// Stamped as `motivoCancelamento`.
        reason: Option<String>,
    },
    /// Confirmed entry gets a paired reversal entry.
    Reverse {
        /// The paired entry to insert.
        reversal: Box<Entry>,
        /// Actor.
        reversed_by: String,
        /// Reversal time.
        reversed_at: DateTime<Utc>,
        /// Stamped on the original.
        reason: Option<String>,
    },
}

impl WorkflowAction {
    /// Applies the action's changes to the target entry.
    ///
    /// For reversals this stamps the original; the reversal entry itself is
    /// carried by the action and written separately.
    pub fn apply_to(&self, entry: &mut Entry, now: DateTime<Utc>) {
        match self {
            Self::Confirm {
                new_status,
                payment_date,
                payment_method,
                confirmed_by,
            } => {
                entry.status = *new_status;
                entry.payment_date = Some(*payment_date);
                entry.payment_method.clone_from(payment_method);
                entry.confirmed_by = Some(confirmed_by.clone());
            }
            Self::Cancel {
                canceled_by,
                canceled_at,
                reason,
            } => {
                entry.status = EntryStatus::Cancelado;
                entry.canceled_by = Some(canceled_by.clone());
                entry.canceled_at = Some(*canceled_at);
                entry.cancel_reason.clone_from(reason);
            }
            Self::Reverse {
                reversal,
                reversed_by,
                reversed_at,
                reason,
            } => {
                entry.reversal_entry_id = Some(reversal.id);
                entry.reversed_by = Some(reversed_by.clone());
                entry.reversed_at = Some(*reversed_at);
                entry.reversal_reason.clone_from(reason);
            }
        }
        entry.updated_at = now;
    }
}

/// Result of a guard check.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Apply the action.
    Apply(WorkflowAction),
    /// The operation already took effect; nothing to do.
    AlreadyApplied,
}

/// Response of `confirmarLancamento`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmOutcome {
    /// Always true on success.
    pub ok: bool,
    /// The entry was already in the confirmed set.
    pub already_confirmed: bool,
}

/// Response of `cancelarLancamentoPendente`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOutcome {
    /// Always true on success.
    pub ok: bool,
    /// The entry was already cancelled.
    pub already_canceled: bool,
}

/// Response of `estornarLancamento`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseOutcome {
    /// Always true on success.
    pub ok: bool,
    /// The entry already had a reversal.
    pub already_estornado: bool,
    /// Id of the reversal entry, new or existing.
    pub estorno_lancamento_id: Option<EntryId>,
}
