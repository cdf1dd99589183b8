//! Core ledger logic for Solaris.
//!
//! This crate contains the ledger's business rules with ZERO web or database
//! dependencies. Persistence goes through the [`store`] traits; the bundled
//! in-memory backend serves tests and database-less deployments.
//!
//! # Modules
//!
//! - `ledger` - Entry model, dates, calendar, classification and monthly rollups
//! - `workflow` - Confirm, cancel and reverse state machine
//! - `orders` - Service orders and their installment fan-out
//! - `events` - Idempotent change-event processing and the outbox dispatcher
//! - `metrics` - Derived financial metrics over entry snapshots
//! - `store` - Transactional storage abstraction
//! - `auth` - Caller identity for privileged operations

pub mod auth;
pub mod events;
pub mod ledger;
pub mod metrics;
pub mod orders;
pub mod store;
pub mod workflow;
