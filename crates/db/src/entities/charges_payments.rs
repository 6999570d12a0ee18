//! `SeaORM` Entity for charges_payments table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{ChargeType, PaymentStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "charges_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organisation_id: Uuid,
    pub charge_type: ChargeType,
    #[sea_orm(unique)]
    pub reference_number: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub internal_total_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub external_total_amount: Decimal,
    pub currency_code: Option<String>,
    pub destination_org_id: Option<Uuid>,
    pub status: PaymentStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub date_completed: Option<DateTimeWithTimeZone>,
    pub gl_transaction_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organisations::Entity",
        from = "Column::OrganisationId",
        to = "super::organisations::Column::Id"
    )]
    Organisations,
    #[sea_orm(has_many = "super::charges_payment_items::Entity")]
    ChargesPaymentItems,
}

impl Related<super::organisations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organisations.def()
    }
}

impl Related<super::charges_payment_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargesPaymentItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
