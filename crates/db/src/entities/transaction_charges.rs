//! `SeaORM` Entity for transaction_charges table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{ChargeStatus, ChargeType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_charges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organisation_id: Uuid,
    pub transaction_id: Uuid,
    pub charge_id: Uuid,
    pub charge_type: ChargeType,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub internal_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub external_amount: Decimal,
    pub status: ChargeStatus,
    pub description: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id"
    )]
    Transactions,
    #[sea_orm(
        belongs_to = "super::charges::Entity",
        from = "Column::ChargeId",
        to = "super::charges::Column::Id"
    )]
    Charges,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::charges::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Charges.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
