use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "intent")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub intent_hash: String,
    pub order_id: String,
    pub log_id: String,
    pub deposit_id: i64,
    pub verifier: String,
    pub owner: String,
    pub to_address: String,
    pub amount: String,
    pub currency: String,
    pub verifier_track_id: String,
    pub currency_track_id: String,
    pub rate_version_id: String,
    pub state: String,
    pub sustainability_fee: Option<String>,
    pub verifier_fee: Option<String>,
    pub resolved_log_id: Option<String>,
    pub transaction_id: String,
    pub participant_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
