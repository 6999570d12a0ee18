//! GL transaction persistence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use remitgl_core::ledger::{
    AccountDelta, GlTransaction, GlTransactionFilter, GlTransactionRepository, LedgerError,
    PreparedPosting, ReversalResult, ReversalWrite,
};
use remitgl_shared::types::PageRequest;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func, Query};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use super::LedgerStore;
use super::convert::{
    entry_active_model, ledger_err, to_db_time, transaction_active_model, transaction_from_models,
};
use crate::entities::sea_orm_active_enums::{
    GlTransactionStatus as StoredStatus, GlTransactionType as StoredType,
};
use crate::entities::{gl_accounts, gl_entries, gl_transactions};

/// Inserts the header and entries and moves every balance by its delta.
///
/// Deltas arrive sorted by account, so row locks are taken in a stable order.
pub(super) async fn apply_posting<C: ConnectionTrait>(
    conn: &C,
    posting: &PreparedPosting,
) -> Result<(), LedgerError> {
    let tx = &posting.transaction;
    gl_transactions::Entity::insert(transaction_active_model(tx))
        .exec_without_returning(conn)
        .await
        .map_err(ledger_err)?;
    gl_entries::Entity::insert_many(tx.entries.iter().map(entry_active_model))
        .exec_without_returning(conn)
        .await
        .map_err(ledger_err)?;

    for delta in &posting.deltas {
        let mut update = gl_accounts::Entity::update_many()
            .col_expr(
                gl_accounts::Column::Balance,
                Expr::col(gl_accounts::Column::Balance).add(delta.delta),
            )
            .col_expr(
                gl_accounts::Column::UpdatedAt,
                Expr::value(to_db_time(tx.created_at)),
            )
            .filter(gl_accounts::Column::Id.eq(delta.account_id));
        if delta.bounded {
            update = update.filter(within_bounds_after(delta.delta));
        }
        let result = update.exec(conn).await.map_err(ledger_err)?;

        if result.rows_affected == 0 {
            return Err(rejected_delta(conn, delta).await);
        }
    }
    Ok(())
}

/// `balance + delta` stays inside whichever of `min_balance` / `max_balance` is set.
fn within_bounds_after(delta: Decimal) -> Condition {
    let resulting = || Expr::col(gl_accounts::Column::Balance).add(delta);
    Condition::all()
        .add(
            Condition::any()
                .add(gl_accounts::Column::MinBalance.is_null())
                .add(Expr::col(gl_accounts::Column::MinBalance).lte(resulting())),
        )
        .add(
            Condition::any()
                .add(gl_accounts::Column::MaxBalance.is_null())
                .add(Expr::col(gl_accounts::Column::MaxBalance).gte(resulting())),
        )
}

/// Explains why a balance update matched no row.
async fn rejected_delta<C: ConnectionTrait>(conn: &C, delta: &AccountDelta) -> LedgerError {
    if !delta.bounded {
        return LedgerError::AccountNotFound(delta.account_id);
    }
    match gl_accounts::Entity::find_by_id(delta.account_id).one(conn).await {
        Ok(Some(account)) => LedgerError::BalanceOutOfBounds {
            account_id: account.id,
            resulting: account.balance + delta.delta,
        },
        Ok(None) => LedgerError::AccountNotFound(delta.account_id),
        Err(err) => ledger_err(err),
    }
}

/// Applies the compensating posting and flips the original to REVERSED.
///
/// The flip only matches a row that is still POSTED.
pub(super) async fn apply_reversal<C: ConnectionTrait>(
    conn: &C,
    write: &ReversalWrite,
) -> Result<(), LedgerError> {
    apply_posting(conn, &write.posting).await?;

    let reversed_at: DateTime<Utc> = write.posting.transaction.created_at;
    let result = gl_transactions::Entity::update_many()
        .col_expr(gl_transactions::Column::Status, Expr::value(StoredStatus::Reversed))
        .col_expr(
            gl_transactions::Column::ReversedBy,
            Expr::value(write.posting.transaction.id),
        )
        .col_expr(
            gl_transactions::Column::ReversalReason,
            Expr::value(write.reason.clone()),
        )
        .col_expr(
            gl_transactions::Column::ReversedAt,
            Expr::value(to_db_time(reversed_at)),
        )
        .filter(gl_transactions::Column::Id.eq(write.original_id))
        .filter(gl_transactions::Column::Status.eq(StoredStatus::Posted))
        .exec(conn)
        .await
        .map_err(ledger_err)?;

    if result.rows_affected == 0 {
        return Err(LedgerError::AlreadyReversed(write.original_id));
    }
    Ok(())
}

/// Loads one transaction with its entries.
pub(super) async fn load_transaction<C: ConnectionTrait>(
    conn: &C,
    organisation_id: Option<Uuid>,
    id: Uuid,
) -> Result<Option<GlTransaction>, LedgerError> {
    let mut query = gl_transactions::Entity::find_by_id(id);
    if let Some(org) = organisation_id {
        query = query.filter(gl_transactions::Column::OrganisationId.eq(org));
    }
    let Some(header) = query.one(conn).await.map_err(ledger_err)? else {
        return Ok(None);
    };

    let entries = gl_entries::Entity::find()
        .filter(gl_entries::Column::GlTransactionId.eq(id))
        .order_by_asc(gl_entries::Column::CreatedAt)
        .order_by_asc(gl_entries::Column::Id)
        .all(conn)
        .await
        .map_err(ledger_err)?;

    Ok(Some(transaction_from_models(header, entries)))
}

fn apply_filter(
    mut query: Select<gl_transactions::Entity>,
    organisation_id: Uuid,
    filter: &GlTransactionFilter,
) -> Select<gl_transactions::Entity> {
    query = query.filter(gl_transactions::Column::OrganisationId.eq(organisation_id));
    if let Some(t) = filter.transaction_type {
        query = query.filter(gl_transactions::Column::TransactionType.eq(StoredType::from(t)));
    }
    if let Some(s) = filter.status {
        query = query.filter(gl_transactions::Column::Status.eq(StoredStatus::from(s)));
    }
    if let Some(from) = filter.from {
        query = query.filter(gl_transactions::Column::CreatedAt.gte(to_db_time(from)));
    }
    if let Some(to) = filter.to {
        query = query.filter(gl_transactions::Column::CreatedAt.lte(to_db_time(to)));
    }
    if let Some(min) = filter.min_amount {
        query = query.filter(gl_transactions::Column::Amount.gte(min));
    }
    if let Some(max) = filter.max_amount {
        query = query.filter(gl_transactions::Column::Amount.lte(max));
    }
    if let Some(account_id) = filter.account_id {
        query = query.filter(
            gl_transactions::Column::Id.in_subquery(
                Query::select()
                    .column(gl_entries::Column::GlTransactionId)
                    .from(gl_entries::Entity)
                    .and_where(gl_entries::Column::GlAccountId.eq(account_id))
                    .to_owned(),
            ),
        );
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(
            Expr::expr(Func::lower(Expr::col(gl_transactions::Column::Description)))
                .like(format!("%{}%", search.to_lowercase())),
        );
    }
    query
}

impl GlTransactionRepository for LedgerStore {
    async fn insert_posting(
        &self,
        posting: &PreparedPosting,
    ) -> Result<GlTransaction, LedgerError> {
        let txn = self.db.begin().await.map_err(ledger_err)?;
        apply_posting(&txn, posting).await?;
        txn.commit().await.map_err(ledger_err)?;

        debug!(
            gl_transaction_id = %posting.transaction.id,
            deltas = posting.deltas.len(),
            "Posting committed"
        );
        Ok(posting.transaction.clone())
    }

    async fn reverse_posting(
        &self,
        reversal: &ReversalWrite,
    ) -> Result<ReversalResult, LedgerError> {
        let txn = self.db.begin().await.map_err(ledger_err)?;
        apply_reversal(&txn, reversal).await?;
        let original = load_transaction(&txn, None, reversal.original_id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(reversal.original_id))?;
        txn.commit().await.map_err(ledger_err)?;

        Ok(ReversalResult {
            original,
            reversal: reversal.posting.transaction.clone(),
        })
    }

    async fn find_transaction(
        &self,
        organisation_id: Uuid,
        id: Uuid,
    ) -> Result<Option<GlTransaction>, LedgerError> {
        load_transaction(&self.db, Some(organisation_id), id).await
    }

    async fn list_transactions(
        &self,
        organisation_id: Uuid,
        filter: &GlTransactionFilter,
        page: PageRequest,
    ) -> Result<(Vec<GlTransaction>, u64), LedgerError> {
        let total = apply_filter(gl_transactions::Entity::find(), organisation_id, filter)
            .count(&self.db)
            .await
            .map_err(ledger_err)?;

        let headers = apply_filter(gl_transactions::Entity::find(), organisation_id, filter)
            .order_by_desc(gl_transactions::Column::CreatedAt)
            .order_by_desc(gl_transactions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(ledger_err)?;

        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let mut entries: HashMap<Uuid, Vec<gl_entries::Model>> = HashMap::new();
        if !ids.is_empty() {
            for entry in gl_entries::Entity::find()
                .filter(gl_entries::Column::GlTransactionId.is_in(ids))
                .order_by_asc(gl_entries::Column::CreatedAt)
                .order_by_asc(gl_entries::Column::Id)
                .all(&self.db)
                .await
                .map_err(ledger_err)?
            {
                entries.entry(entry.gl_transaction_id).or_default().push(entry);
            }
        }

        let items = headers
            .into_iter()
            .map(|h| {
                let own = entries.remove(&h.id).unwrap_or_default();
                transaction_from_models(h, own)
            })
            .collect();
        Ok((items, total))
    }

    async fn transactions_for_stats(
        &self,
        organisation_id: Uuid,
    ) -> Result<Vec<GlTransaction>, LedgerError> {
        let headers = gl_transactions::Entity::find()
            .filter(gl_transactions::Column::OrganisationId.eq(organisation_id))
            .all(&self.db)
            .await
            .map_err(ledger_err)?;
        Ok(headers
            .into_iter()
            .map(|h| transaction_from_models(h, Vec::new()))
            .collect())
    }
}
