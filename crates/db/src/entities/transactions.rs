//! `SeaORM` Entity for transactions table (remittance transactions).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organisation_id: Uuid,
    pub origin_currency_code: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_charges::Entity")]
    TransactionCharges,
}

impl Related<super::transaction_charges::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionCharges.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
