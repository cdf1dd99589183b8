//! Workflow service for entry status transitions.
//!
//! The guards here run against the entry as read inside the caller's
//! transaction. A repeated call finds the effect already applied and
//! returns [`Decision::AlreadyApplied`] instead of failing.

use chrono::{DateTime, Utc};

use crate::ledger::types::{Entry, EntryStatus};
use crate::workflow::error::WorkflowError;
use crate::workflow::reversal::ReversalService;
use crate::workflow::types::{CancelCommand, ConfirmCommand, Decision, ReverseCommand, WorkflowAction};

/// Stateless service for managing entry workflow transitions.
pub struct WorkflowService;

impl WorkflowService {
    /// Confirm a pending entry.
    ///
    /// # Returns
    /// * `Ok(Decision::AlreadyApplied)` if the entry is already in the confirmed set
    /// * `Ok(Decision::Apply(WorkflowAction::Confirm))` if the entry is pending
    /// * `Err(WorkflowError::NotPendingForConfirm)` otherwise
    pub fn confirm(
        current: &Entry,
        cmd: &ConfirmCommand,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Decision, WorkflowError> {
        if current.is_confirmed() {
            return Ok(Decision::AlreadyApplied);
        }
        if !current.is_pending() {
            return Err(WorkflowError::NotPendingForConfirm {
                status: current.status,
            });
        }

        Ok(Decision::Apply(WorkflowAction::Confirm {
            new_status: cmd.final_status,
            payment_date: cmd.payment_date.unwrap_or(now),
            payment_method: cmd
                .payment_method
                .clone()
                .or_else(|| current.payment_method.clone()),
            confirmed_by: cmd.user_id.clone().unwrap_or_else(|| actor.to_string()),
        }))
    }

    /// Cancel a pending entry.
    ///
    /// # Returns
    /// * `Ok(Decision::AlreadyApplied)` if the entry is already `CANCELADO`
    /// * `Ok(Decision::Apply(WorkflowAction::Cancel))` if the entry is pending
    /// * `Err(WorkflowError::NotPendingForCancel)` otherwise
    pub fn cancel(
        current: &Entry,
        cmd: &CancelCommand,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Decision, WorkflowError> {
        if current.status == EntryStatus::Cancelado {
            return Ok(Decision::AlreadyApplied);
        }
        if !current.is_pending() {
            return Err(WorkflowError::NotPendingForCancel {
                status: current.status,
            });
        }

        Ok(Decision::Apply(WorkflowAction::Cancel {
            canceled_by: cmd.user_id.clone().unwrap_or_else(|| actor.to_string()),
            canceled_at: now,
            reason: cmd.reason.clone(),
        }))
    }

    /// Reverse a confirmed entry.
    ///
    /// Guards run in order: an existing `estornoLancamentoId` short-circuits
    /// to [`Decision::AlreadyApplied`]; then the entry must be confirmed;
    /// then its value must be non-zero.
    pub fn reverse(
        current: &Entry,
        cmd: &ReverseCommand,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Decision, WorkflowError> {
        if current.is_reversed() {
            return Ok(Decision::AlreadyApplied);
        }
        if !current.is_confirmed() {
            return Err(WorkflowError::NotConfirmedForReversal {
                status: current.status,
            });
        }
        if current.amount.is_zero() {
            return Err(WorkflowError::InvalidReversalAmount);
        }

        let reversal_date = cmd.reversal_date.unwrap_or(now);
        Ok(Decision::Apply(WorkflowAction::Reverse {
            reversal: Box::new(ReversalService::build_reversal(current, reversal_date, now)),
            reversed_by: cmd.user_id.clone().unwrap_or_else(|| actor.to_string()),
            reversed_at: now,
            reason: cmd.reason.clone(),
        }))
    }
}
