//! `SeaORM` Entity for gl_entries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::DrCr;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "gl_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub gl_transaction_id: Uuid,
    pub gl_account_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub dr_cr: DrCr,
    pub description: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::gl_transactions::Entity",
        from = "Column::GlTransactionId",
        to = "super::gl_transactions::Column::Id"
    )]
    GlTransactions,
    #[sea_orm(
        belongs_to = "super::gl_accounts::Entity",
        from = "Column::GlAccountId",
        to = "super::gl_accounts::Column::Id"
    )]
    GlAccounts,
}

impl Related<super::gl_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GlTransactions.def()
    }
}

impl Related<super::gl_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GlAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
