//! `SeaORM` Entity for organisations table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "organisations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::gl_accounts::Entity")]
    GlAccounts,
    #[sea_orm(has_many = "super::charges_payments::Entity")]
    ChargesPayments,
}

impl Related<super::gl_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GlAccounts.def()
    }
}

impl Related<super::charges_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargesPayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
