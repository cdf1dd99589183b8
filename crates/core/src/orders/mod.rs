//! Service orders and their billing fan-out.

pub mod allocation;
pub mod fanout;
pub mod service;
pub mod types;

pub use fanout::{PlannedEntry, add_months_naive, is_completion, plan_entries};
pub use service::OrderService;
pub use types::{BillingStatus, OrderFinancial, OrderPayment, OrderStatus, ServiceOrder};
