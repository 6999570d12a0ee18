//! `SeaORM` Entity for gl_accounts table.
//!
//! At most one of the five entity columns is set; the migration enforces it
//! with a `num_nonnulls` check.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::GlAccountType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "gl_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organisation_id: Uuid,
    pub name: String,
    pub account_type: GlAccountType,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub locked_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub min_balance: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub max_balance: Option<Decimal>,
    pub currency_code: Option<String>,
    pub bank_account_id: Option<Uuid>,
    pub till_id: Option<Uuid>,
    pub vault_id: Option<Uuid>,
    pub charge_id: Option<Uuid>,
    pub org_balance_id: Option<Uuid>,
    pub opened_at: DateTimeWithTimeZone,
    pub opened_by: Option<Uuid>,
    pub closed_at: Option<DateTimeWithTimeZone>,
    pub close_reason: Option<String>,
    pub frozen_at: Option<DateTimeWithTimeZone>,
    pub frozen_reason: Option<String>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organisations::Entity",
        from = "Column::OrganisationId",
        to = "super::organisations::Column::Id"
    )]
    Organisations,
    #[sea_orm(has_many = "super::gl_entries::Entity")]
    GlEntries,
}

impl Related<super::organisations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organisations.def()
    }
}

impl Related<super::gl_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GlEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
