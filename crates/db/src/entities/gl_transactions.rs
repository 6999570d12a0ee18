//! `SeaORM` Entity for gl_transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{GlTransactionStatus, GlTransactionType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "gl_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organisation_id: Uuid,
    pub transaction_type: GlTransactionType,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub currency_code: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub status: GlTransactionStatus,
    pub vault_id: Option<Uuid>,
    pub till_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub transaction_id: Option<Uuid>,
    pub reversal_of: Option<Uuid>,
    pub reversed_by: Option<Uuid>,
    pub reversal_reason: Option<String>,
    pub reversed_at: Option<DateTimeWithTimeZone>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::gl_entries::Entity")]
    GlEntries,
}

impl Related<super::gl_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GlEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
