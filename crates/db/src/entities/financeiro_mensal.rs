//! `SeaORM` Entity for financeiro_mensal table.
//!
//! One row per tenant and month. Rows are only ever changed by additive
//! upserts, never rewritten from a read.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "financeiro_mensal")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub empresa_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub month_key: String,
    pub year: i32,
    pub month: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub entradas: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub saidas: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub saldo: Decimal,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
