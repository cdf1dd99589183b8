//! `SeaORM` Entity for lancamentos table.
//!
//! The full entry lives in `document`; the other columns mirror the fields
//! queries filter and sort on.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "lancamentos")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub empresa_id: Uuid,
    pub tipo: String,
    pub status: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub valor: Decimal,
    pub data_competencia: Option<DateTimeWithTimeZone>,
    pub data_vencimento: Option<DateTimeWithTimeZone>,
    pub data_pagamento: Option<DateTimeWithTimeZone>,
    pub id_os: Option<Uuid>,
    #[sea_orm(column_type = "JsonBinary")]
    pub document: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
