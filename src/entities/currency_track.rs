//! Track-open record for a (deposit, verifier, currency) triple. The
//! `current_rate_version_id` pointer is the only mutable column.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "currency_track")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub order_id: String,
    pub log_id: String,
    pub deposit_id: i64,
    pub verifier: String,
    pub currency: String,
    pub verifier_track_id: String,
    pub current_rate_version_id: String,
    pub transaction_id: String,
    pub participant_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
