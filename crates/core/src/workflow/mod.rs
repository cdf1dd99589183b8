//! Entry status workflow.
//!
//! `PENDENTE` entries are confirmed (`CONFIRMADO`, `RECEBIDO`, `PAGO`) or
//! cancelled. Confirmed entries may be reversed, which pairs them with an
//! opposite entry instead of changing their status.
//!
//! # Modules
//!
//! - `types` - Requests, commands, actions and outcomes
//! - `error` - Workflow error taxonomy
//! - `service` - Pure guard logic
//! - `reversal` - Reversal entry construction
//! - `operations` - Transactional RPCs over a store

pub mod error;
pub mod operations;
pub mod reversal;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::WorkflowError;
pub use operations::LedgerOperations;
pub use reversal::ReversalService;
pub use service::WorkflowService;
pub use types::{
    CancelCommand, CancelOutcome, CancelRequest, ConfirmCommand, ConfirmOutcome, ConfirmRequest, Decision,
    ReverseCommand, ReverseOutcome, ReverseRequest, WorkflowAction,
};
