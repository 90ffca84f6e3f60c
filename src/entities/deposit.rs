//! The central mutable entity. `deposited`, `min_amount` and `max_amount`
//! never change after the initial write; `remaining` and `status` are
//! updated together by the dispatcher.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deposit")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub deposit_id: i64,
    pub order_id: String,
    pub log_id: String,
    pub transaction_id: String,
    pub token: String,
    pub participant_id: String,
    pub deposited: String,
    pub remaining: String,
    pub min_amount: String,
    pub max_amount: String,
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
