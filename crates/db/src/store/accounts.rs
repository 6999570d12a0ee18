//! GL account persistence.

use remitgl_core::ledger::{
    AccountState, BoundEntity, BoundEntityKind, GlAccount, GlAccountFilter, GlAccountRepository,
    LedgerError, SourceEntity,
};
use remitgl_shared::types::PageRequest;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};
use tracing::debug;
use uuid::Uuid;

use super::LedgerStore;
use super::convert::{account_active_model, account_metadata, ledger_err};
use crate::entities::sea_orm_active_enums::GlAccountType as StoredAccountType;
use crate::entities::{bank_accounts, charges, gl_accounts, gl_entries, org_balances, tills, vaults};

fn entity_column(kind: BoundEntityKind) -> gl_accounts::Column {
    match kind {
        BoundEntityKind::BankAccount => gl_accounts::Column::BankAccountId,
        BoundEntityKind::Till => gl_accounts::Column::TillId,
        BoundEntityKind::Vault => gl_accounts::Column::VaultId,
        BoundEntityKind::Charge => gl_accounts::Column::ChargeId,
        BoundEntityKind::OrgBalance => gl_accounts::Column::OrgBalanceId,
    }
}

fn apply_filter(
    mut query: Select<gl_accounts::Entity>,
    filter: &GlAccountFilter,
) -> Select<gl_accounts::Entity> {
    if let Some(org) = filter.organisation_id {
        query = query.filter(gl_accounts::Column::OrganisationId.eq(org));
    }
    if let Some(account_type) = filter.account_type {
        query = query
            .filter(gl_accounts::Column::AccountType.eq(StoredAccountType::from(account_type)));
    }
    if let Some(currency) = filter.currency_code.as_deref() {
        query = query.filter(
            Expr::expr(Func::upper(Expr::col(gl_accounts::Column::CurrencyCode)))
                .eq(currency.trim().to_uppercase()),
        );
    }
    if let Some(state) = filter.state {
        query = query.filter(match state {
            AccountState::Closed => {
                Condition::all().add(gl_accounts::Column::ClosedAt.is_not_null())
            }
            AccountState::Frozen => Condition::all()
                .add(gl_accounts::Column::ClosedAt.is_null())
                .add(gl_accounts::Column::FrozenAt.is_not_null()),
            AccountState::Open => Condition::all()
                .add(gl_accounts::Column::ClosedAt.is_null())
                .add(gl_accounts::Column::FrozenAt.is_null()),
        });
    }
    if let Some(kind) = filter.entity_kind {
        query = query.filter(entity_column(kind).is_not_null());
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(
            Expr::expr(Func::lower(Expr::col(gl_accounts::Column::Name)))
                .like(format!("%{}%", search.to_lowercase())),
        );
    }
    query
}

impl GlAccountRepository for LedgerStore {
    async fn insert_account(&self, account: &GlAccount) -> Result<GlAccount, LedgerError> {
        let model = account_active_model(account)
            .insert(&self.db)
            .await
            .map_err(ledger_err)?;
        Ok(model.into())
    }

    async fn update_account(&self, account: &GlAccount) -> Result<GlAccount, LedgerError> {
        let model = account_metadata(account)
            .update(&self.db)
            .await
            .map_err(|e| match e {
                sea_orm::DbErr::RecordNotUpdated => LedgerError::AccountNotFound(account.id),
                other => ledger_err(other),
            })?;
        Ok(model.into())
    }

    async fn find_account(&self, id: Uuid) -> Result<Option<GlAccount>, LedgerError> {
        let model = gl_accounts::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(ledger_err)?;
        Ok(model.map(GlAccount::from))
    }

    async fn find_accounts(&self, ids: &[Uuid]) -> Result<Vec<GlAccount>, LedgerError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = gl_accounts::Entity::find()
            .filter(gl_accounts::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(gl_accounts::Column::Id)
            .all(&self.db)
            .await
            .map_err(ledger_err)?;
        Ok(models.into_iter().map(GlAccount::from).collect())
    }

    async fn find_account_by_entity(
        &self,
        organisation_id: Uuid,
        entity: BoundEntity,
    ) -> Result<Option<GlAccount>, LedgerError> {
        let model = gl_accounts::Entity::find()
            .filter(gl_accounts::Column::OrganisationId.eq(organisation_id))
            .filter(entity_column(entity.kind()).eq(entity.id()))
            .order_by_asc(gl_accounts::Column::OpenedAt)
            .one(&self.db)
            .await
            .map_err(ledger_err)?;
        Ok(model.map(GlAccount::from))
    }

    async fn list_accounts(
        &self,
        filter: &GlAccountFilter,
        page: PageRequest,
    ) -> Result<(Vec<GlAccount>, u64), LedgerError> {
        let total = apply_filter(gl_accounts::Entity::find(), filter)
            .count(&self.db)
            .await
            .map_err(ledger_err)?;

        let models = apply_filter(gl_accounts::Entity::find(), filter)
            .order_by_asc(gl_accounts::Column::Name)
            .order_by_asc(gl_accounts::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(ledger_err)?;

        Ok((models.into_iter().map(GlAccount::from).collect(), total))
    }

    async fn accounts_for_stats(
        &self,
        organisation_id: Option<Uuid>,
    ) -> Result<Vec<GlAccount>, LedgerError> {
        let mut query = gl_accounts::Entity::find();
        if let Some(org) = organisation_id {
            query = query.filter(gl_accounts::Column::OrganisationId.eq(org));
        }
        let models = query.all(&self.db).await.map_err(ledger_err)?;
        Ok(models.into_iter().map(GlAccount::from).collect())
    }

    async fn account_has_entries(&self, id: Uuid) -> Result<bool, LedgerError> {
        let count = gl_entries::Entity::find()
            .filter(gl_entries::Column::GlAccountId.eq(id))
            .count(&self.db)
            .await
            .map_err(ledger_err)?;
        Ok(count > 0)
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool, LedgerError> {
        let result = gl_accounts::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(ledger_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn list_source_entities(
        &self,
        organisation_id: Uuid,
        kind: BoundEntityKind,
    ) -> Result<Vec<SourceEntity>, LedgerError> {
        macro_rules! balance_rows {
            ($table:ident, $variant:ident) => {
                $table::Entity::find()
                    .filter($table::Column::OrganisationId.eq(organisation_id))
                    .order_by_asc($table::Column::CreatedAt)
                    .all(&self.db)
                    .await
                    .map_err(ledger_err)?
                    .into_iter()
                    .map(|m| SourceEntity {
                        entity: BoundEntity::$variant(m.id),
                        name: m.name,
                        balance: m.balance,
                        currency_code: m.currency_code,
                    })
                    .collect()
            };
        }

        let entities: Vec<SourceEntity> = match kind {
            BoundEntityKind::BankAccount => balance_rows!(bank_accounts, BankAccount),
            BoundEntityKind::Till => balance_rows!(tills, Till),
            BoundEntityKind::Vault => balance_rows!(vaults, Vault),
            BoundEntityKind::OrgBalance => balance_rows!(org_balances, OrgBalance),
            BoundEntityKind::Charge => charges::Entity::find()
                .filter(charges::Column::OrganisationId.eq(organisation_id))
                .order_by_asc(charges::Column::CreatedAt)
                .all(&self.db)
                .await
                .map_err(ledger_err)?
                .into_iter()
                .map(|m| SourceEntity {
                    entity: BoundEntity::Charge(m.id),
                    name: m.name,
                    balance: rust_decimal::Decimal::ZERO,
                    currency_code: m.currency_code,
                })
                .collect(),
        };

        debug!(
            org_id = %organisation_id,
            kind = kind.as_str(),
            count = entities.len(),
            "Loaded source entities"
        );
        Ok(entities)
    }
}
