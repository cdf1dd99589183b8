//! `SeaORM` Entity for the change_events outbox.
//!
//! `seq` gives the write order; `id` is the delivery id handlers key their
//! markers on.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Outbox row waiting for delivery.
pub const STATUS_PENDING: &str = "PENDING";
/// Outbox row delivered to every handler.
pub const STATUS_DELIVERED: &str = "DELIVERED";
/// Outbox row that will not be retried.
pub const STATUS_PARKED: &str = "PARKED";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "change_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub seq: i64,
    #[sea_orm(unique)]
    pub id: Uuid,
    pub empresa_id: Uuid,
    pub occurred_at: DateTimeWithTimeZone,
    #[sea_orm(column_type = "JsonBinary")]
    pub change: Json,
    pub attempts: i32,
    pub status: String,
    pub last_error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
