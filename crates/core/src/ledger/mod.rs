//! Financial entry (lançamento) logic.
//!
//! This module implements the entry side of the ledger:
//! - Entry documents and their closed enums
//! - Date normalization for loosely typed fields
//! - Ledger calendar (month ids, day and month ranges in the ledger timezone)
//! - Classification of an entry into a monthly effect
//! - Monthly rollup deltas
//! - Input validation and the entry service for manual writes

pub mod calendar;
pub mod classify;
pub mod dates;
pub mod error;
pub mod rollup;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod rollup_props;
#[cfg(test)]
mod validation_props;

pub use calendar::{DateRange, LedgerCalendar, MonthId};
pub use classify::{Effect, classify};
pub use dates::{Timestamp, ToDate, normalize_date};
pub use error::LedgerError;
pub use validation::{MAX_AMOUNT, amount_in_range};
pub use rollup::{
    EffectPair, MonthlyRollup, RollupDelta, RollupOverflow, RollupTotals, compute_deltas, rebuild_rollups,
};
pub use service::{EntryPatch, EntryService, NewEntry};
pub use types::{Entry, EntryKind, EntryOrigin, EntryStatus};
