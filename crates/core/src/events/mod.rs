//! Change-event processing.
//!
//! Every entry and order write appends a change event to the store outbox.
//! The [`EventDispatcher`] delivers those events, at least once, to the
//! registered [`EventHandler`]s. [`ProcessedEventStore`] makes each
//! delivery effectively-once by recording a marker in the handler's own
//! transaction.
//!
//! # Handlers
//!
//! - [`OrderCompletionHandler`] - bills a service order entering `CONCLUIDA`
//! - [`MonthlyRollupHandler`] - keeps the per-month rollups in step with entry writes

pub mod dispatcher;
pub mod error;
pub mod monthly_rollup;
pub mod order_completion;
pub mod processed;

pub use dispatcher::{DispatchReport, DispatcherSettings, EventDispatcher};
pub use error::ProcessError;
pub use monthly_rollup::MonthlyRollupHandler;
pub use order_completion::OrderCompletionHandler;
pub use processed::{EventHandler, ProcessedEventStore, Processing};
