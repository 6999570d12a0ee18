//! `SeaORM` Entity for charges_payment_items table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "charges_payment_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub charges_payment_id: Uuid,
    pub transaction_charge_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub internal_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub external_amount: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charges_payments::Entity",
        from = "Column::ChargesPaymentId",
        to = "super::charges_payments::Column::Id"
    )]
    ChargesPayments,
    #[sea_orm(
        belongs_to = "super::transaction_charges::Entity",
        from = "Column::TransactionChargeId",
        to = "super::transaction_charges::Column::Id"
    )]
    TransactionCharges,
}

impl Related<super::charges_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargesPayments.def()
    }
}

impl Related<super::transaction_charges::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionCharges.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
