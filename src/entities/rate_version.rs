//! One immutable conversion-rate version. Only the `active` flag flips,
//! exactly once, when the next version supersedes it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rate_version")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub order_id: String,
    pub log_id: String,
    pub currency_track_id: String,
    pub verifier_track_id: String,
    pub deposit_id: i64,
    pub verifier: String,
    pub currency: String,
    pub change_id: i32,
    pub value: String,
    pub active: bool,
    pub transaction_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
