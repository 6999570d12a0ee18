//! Charges payment persistence.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use remitgl_core::settlement::{
    ChargeType, ChargesPayment, ChargesPaymentFilter, PaymentApproval, PaymentReversal,
    PendingChargeFilter, SettlementError, SettlementRepository, TransactionCharge,
};
use remitgl_shared::types::PageRequest;
use sea_orm::sea_query::{Expr, Func, OnConflict, Query};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Set, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use super::LedgerStore;
use super::convert::{
    charge_from_model, item_active_model, payment_active_model, payment_from_models,
    settlement_err, to_db_time,
};
use super::transactions::{apply_posting, apply_reversal};
use crate::entities::sea_orm_active_enums::{
    ChargeStatus as StoredChargeStatus, ChargeType as StoredChargeType,
    PaymentStatus as StoredPaymentStatus,
};
use crate::entities::{
    charges_payment_items, charges_payments, organisations, reference_sequences,
    transaction_charges, transactions,
};

/// Attaches each charge's origin currency from its remittance transaction.
async fn with_currency<C: ConnectionTrait>(
    conn: &C,
    models: Vec<transaction_charges::Model>,
) -> Result<Vec<TransactionCharge>, SettlementError> {
    let mut tx_ids: Vec<Uuid> = models.iter().map(|m| m.transaction_id).collect();
    tx_ids.sort_unstable();
    tx_ids.dedup();

    let currencies: HashMap<Uuid, Option<String>> = if tx_ids.is_empty() {
        HashMap::new()
    } else {
        transactions::Entity::find()
            .filter(transactions::Column::Id.is_in(tx_ids))
            .all(conn)
            .await
            .map_err(settlement_err)?
            .into_iter()
            .map(|t| (t.id, t.origin_currency_code))
            .collect()
    };

    Ok(models
        .into_iter()
        .map(|m| {
            let currency = currencies.get(&m.transaction_id).cloned().flatten();
            charge_from_model(m, currency)
        })
        .collect())
}

/// Loads payment headers' items and assembles full payments.
async fn with_items<C: ConnectionTrait>(
    conn: &C,
    headers: Vec<charges_payments::Model>,
) -> Result<Vec<ChargesPayment>, SettlementError> {
    let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
    let mut items: HashMap<Uuid, Vec<charges_payment_items::Model>> = HashMap::new();
    if !ids.is_empty() {
        for item in charges_payment_items::Entity::find()
            .filter(charges_payment_items::Column::ChargesPaymentId.is_in(ids))
            .order_by_asc(charges_payment_items::Column::Id)
            .all(conn)
            .await
            .map_err(settlement_err)?
        {
            items.entry(item.charges_payment_id).or_default().push(item);
        }
    }

    Ok(headers
        .into_iter()
        .map(|h| {
            let own = items.remove(&h.id).unwrap_or_default();
            payment_from_models(h, own)
        })
        .collect())
}

async fn load_payment<C: ConnectionTrait>(
    conn: &C,
    organisation_id: Option<Uuid>,
    id: Uuid,
) -> Result<Option<ChargesPayment>, SettlementError> {
    let mut query = charges_payments::Entity::find_by_id(id);
    if let Some(org) = organisation_id {
        query = query.filter(charges_payments::Column::OrganisationId.eq(org));
    }
    let Some(header) = query.one(conn).await.map_err(settlement_err)? else {
        return Ok(None);
    };
    Ok(with_items(conn, vec![header]).await?.pop())
}

/// Moves charges from `from` to `to` and returns how many rows changed.
async fn set_charge_status<C: ConnectionTrait>(
    conn: &C,
    ids: &[Uuid],
    from: StoredChargeStatus,
    to: StoredChargeStatus,
) -> Result<u64, SettlementError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let result = transaction_charges::Entity::update_many()
        .col_expr(transaction_charges::Column::Status, Expr::value(to))
        .col_expr(
            transaction_charges::Column::UpdatedAt,
            Expr::value(to_db_time(Utc::now())),
        )
        .filter(transaction_charges::Column::Id.is_in(ids.iter().copied()))
        .filter(transaction_charges::Column::Status.eq(from))
        .exec(conn)
        .await
        .map_err(settlement_err)?;
    Ok(result.rows_affected)
}

fn currency_condition(currency: &str) -> Condition {
    Condition::all().add(
        transaction_charges::Column::TransactionId.in_subquery(
            Query::select()
                .column(transactions::Column::Id)
                .from(transactions::Entity)
                .and_where(
                    Expr::expr(Func::upper(Expr::col(transactions::Column::OriginCurrencyCode)))
                        .eq(currency.trim().to_uppercase()),
                )
                .to_owned(),
        ),
    )
}

fn pending_filter(
    organisation_id: Uuid,
    filter: &PendingChargeFilter,
) -> Select<transaction_charges::Entity> {
    let mut query = transaction_charges::Entity::find()
        .filter(transaction_charges::Column::OrganisationId.eq(organisation_id))
        .filter(transaction_charges::Column::Status.eq(StoredChargeStatus::Pending));
    if let Some(t) = filter.charge_type {
        query = query.filter(transaction_charges::Column::ChargeType.eq(StoredChargeType::from(t)));
    }
    if let Some(currency) = filter.currency_code.as_deref() {
        query = query.filter(currency_condition(currency));
    }
    if let Some(from) = filter.from {
        query = query.filter(transaction_charges::Column::CreatedAt.gte(to_db_time(from)));
    }
    if let Some(to) = filter.to {
        query = query.filter(transaction_charges::Column::CreatedAt.lte(to_db_time(to)));
    }
    if let Some(min) = filter.min_amount {
        query = query.filter(transaction_charges::Column::InternalAmount.gte(min));
    }
    if let Some(max) = filter.max_amount {
        query = query.filter(transaction_charges::Column::InternalAmount.lte(max));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(
            Expr::expr(Func::lower(Expr::col(transaction_charges::Column::Description)))
                .like(format!("%{}%", search.to_lowercase())),
        );
    }
    query
}

fn payment_filter(
    organisation_id: Uuid,
    filter: &ChargesPaymentFilter,
) -> Select<charges_payments::Entity> {
    let mut query = charges_payments::Entity::find()
        .filter(charges_payments::Column::OrganisationId.eq(organisation_id));
    if let Some(t) = filter.charge_type {
        query = query.filter(charges_payments::Column::ChargeType.eq(StoredChargeType::from(t)));
    }
    if let Some(s) = filter.status {
        query = query.filter(charges_payments::Column::Status.eq(StoredPaymentStatus::from(s)));
    }
    if let Some(currency) = filter.currency_code.as_deref() {
        query = query.filter(
            Expr::expr(Func::upper(Expr::col(charges_payments::Column::CurrencyCode)))
                .eq(currency.trim().to_uppercase()),
        );
    }
    if let Some(from) = filter.from {
        query = query.filter(charges_payments::Column::CreatedAt.gte(to_db_time(from)));
    }
    if let Some(to) = filter.to {
        query = query.filter(charges_payments::Column::CreatedAt.lte(to_db_time(to)));
    }
    if let Some(min) = filter.min_amount {
        query = query.filter(charges_payments::Column::InternalTotalAmount.gte(min));
    }
    if let Some(max) = filter.max_amount {
        query = query.filter(charges_payments::Column::InternalTotalAmount.lte(max));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search.to_lowercase());
        query = query.filter(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col(charges_payments::Column::ReferenceNumber)))
                        .like(pattern.clone()),
                )
                .add(
                    Expr::expr(Func::lower(Expr::col(charges_payments::Column::Notes)))
                        .like(pattern),
                ),
        );
    }
    query
}

impl SettlementRepository for LedgerStore {
    async fn organisation_name(
        &self,
        organisation_id: Uuid,
    ) -> Result<Option<String>, SettlementError> {
        let org = organisations::Entity::find_by_id(organisation_id)
            .one(&self.db)
            .await
            .map_err(settlement_err)?;
        Ok(org.map(|o| o.name))
    }

    async fn find_pending_charges(
        &self,
        organisation_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<TransactionCharge>, SettlementError> {
        let models = transaction_charges::Entity::find()
            .filter(transaction_charges::Column::OrganisationId.eq(organisation_id))
            .filter(transaction_charges::Column::Status.eq(StoredChargeStatus::Pending))
            .filter(transaction_charges::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(settlement_err)?;
        with_currency(&self.db, models).await
    }

    async fn find_charges(
        &self,
        organisation_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<TransactionCharge>, SettlementError> {
        let models = transaction_charges::Entity::find()
            .filter(transaction_charges::Column::OrganisationId.eq(organisation_id))
            .filter(transaction_charges::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(settlement_err)?;
        with_currency(&self.db, models).await
    }

    async fn allocate_reference_sequence(
        &self,
        organisation_id: Uuid,
        charge_type: ChargeType,
        day: NaiveDate,
    ) -> Result<u32, SettlementError> {
        let row = reference_sequences::ActiveModel {
            organisation_id: Set(organisation_id),
            charge_type: Set(charge_type.into()),
            day: Set(day),
            last_value: Set(1),
        };

        let counter = reference_sequences::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    reference_sequences::Column::OrganisationId,
                    reference_sequences::Column::ChargeType,
                    reference_sequences::Column::Day,
                ])
                .value(
                    reference_sequences::Column::LastValue,
                    Expr::col((reference_sequences::Entity, reference_sequences::Column::LastValue))
                        .add(1),
                )
                .to_owned(),
            )
            .exec_with_returning(&self.db)
            .await
            .map_err(settlement_err)?;

        u32::try_from(counter.last_value)
            .map_err(|_| SettlementError::storage("reference sequence out of range"))
    }

    async fn insert_payment(
        &self,
        payment: &ChargesPayment,
    ) -> Result<ChargesPayment, SettlementError> {
        let txn = self.db.begin().await.map_err(settlement_err)?;

        charges_payments::Entity::insert(payment_active_model(payment))
            .exec_without_returning(&txn)
            .await
            .map_err(settlement_err)?;
        if !payment.items.is_empty() {
            charges_payment_items::Entity::insert_many(payment.items.iter().map(item_active_model))
                .exec_without_returning(&txn)
                .await
                .map_err(settlement_err)?;
        }

        txn.commit().await.map_err(settlement_err)?;
        debug!(payment_id = %payment.id, items = payment.items.len(), "Payment inserted");
        Ok(payment.clone())
    }

    async fn find_payment(
        &self,
        organisation_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ChargesPayment>, SettlementError> {
        load_payment(&self.db, Some(organisation_id), id).await
    }

    async fn approve_payment(
        &self,
        approval: &PaymentApproval,
    ) -> Result<ChargesPayment, SettlementError> {
        let txn = self.db.begin().await.map_err(settlement_err)?;

        let gl_transaction_id = match &approval.posting {
            Some(posting) => {
                apply_posting(&txn, posting).await?;
                Some(posting.transaction.id)
            }
            None => None,
        };

        let result = charges_payments::Entity::update_many()
            .col_expr(
                charges_payments::Column::Status,
                Expr::value(StoredPaymentStatus::Completed),
            )
            .col_expr(
                charges_payments::Column::DateCompleted,
                Expr::value(to_db_time(approval.date_completed)),
            )
            .col_expr(charges_payments::Column::Notes, Expr::value(approval.notes.clone()))
            .col_expr(
                charges_payments::Column::GlTransactionId,
                Expr::value(gl_transaction_id),
            )
            .filter(charges_payments::Column::Id.eq(approval.payment_id))
            .filter(charges_payments::Column::Status.eq(StoredPaymentStatus::Pending))
            .exec(&txn)
            .await
            .map_err(settlement_err)?;
        if result.rows_affected == 0 {
            return Err(SettlementError::ConcurrentModification(approval.payment_id));
        }

        let ids = &approval.transaction_charge_ids;
        let paid = set_charge_status(
            &txn,
            ids,
            StoredChargeStatus::Pending,
            StoredChargeStatus::Paid,
        )
        .await?;
        let paid = usize::try_from(paid).unwrap_or(usize::MAX);
        if paid != ids.len() {
            // Another batch settled one of these charges first.
            return Err(SettlementError::InvalidCharges {
                requested: ids.len(),
                found: paid,
            });
        }

        let payment = load_payment(&txn, None, approval.payment_id)
            .await?
            .ok_or(SettlementError::PaymentNotFound(approval.payment_id))?;
        txn.commit().await.map_err(settlement_err)?;
        Ok(payment)
    }

    async fn reverse_payment(
        &self,
        reversal: &PaymentReversal,
    ) -> Result<ChargesPayment, SettlementError> {
        let txn = self.db.begin().await.map_err(settlement_err)?;

        let result = charges_payments::Entity::update_many()
            .col_expr(
                charges_payments::Column::Status,
                Expr::value(StoredPaymentStatus::Failed),
            )
            .col_expr(charges_payments::Column::Notes, Expr::value(reversal.notes.clone()))
            .filter(charges_payments::Column::Id.eq(reversal.payment_id))
            .filter(charges_payments::Column::Status.eq(StoredPaymentStatus::Completed))
            .exec(&txn)
            .await
            .map_err(settlement_err)?;
        if result.rows_affected == 0 {
            return Err(SettlementError::ConcurrentModification(reversal.payment_id));
        }

        if let Some(write) = &reversal.gl_reversal {
            apply_reversal(&txn, write).await?;
        }
        set_charge_status(
            &txn,
            &reversal.transaction_charge_ids,
            StoredChargeStatus::Paid,
            StoredChargeStatus::Pending,
        )
        .await?;

        let payment = load_payment(&txn, None, reversal.payment_id)
            .await?
            .ok_or(SettlementError::PaymentNotFound(reversal.payment_id))?;
        txn.commit().await.map_err(settlement_err)?;
        Ok(payment)
    }

    async fn list_pending_charges(
        &self,
        organisation_id: Uuid,
        filter: &PendingChargeFilter,
        page: PageRequest,
    ) -> Result<(Vec<TransactionCharge>, u64), SettlementError> {
        let total = pending_filter(organisation_id, filter)
            .count(&self.db)
            .await
            .map_err(settlement_err)?;
        let models = pending_filter(organisation_id, filter)
            .order_by_desc(transaction_charges::Column::CreatedAt)
            .order_by_desc(transaction_charges::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(settlement_err)?;
        Ok((with_currency(&self.db, models).await?, total))
    }

    async fn list_payments(
        &self,
        organisation_id: Uuid,
        filter: &ChargesPaymentFilter,
        page: PageRequest,
    ) -> Result<(Vec<ChargesPayment>, u64), SettlementError> {
        let total = payment_filter(organisation_id, filter)
            .count(&self.db)
            .await
            .map_err(settlement_err)?;
        let headers = payment_filter(organisation_id, filter)
            .order_by_desc(charges_payments::Column::CreatedAt)
            .order_by_desc(charges_payments::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(settlement_err)?;
        Ok((with_items(&self.db, headers).await?, total))
    }

    async fn pending_charges_for_stats(
        &self,
        organisation_id: Uuid,
    ) -> Result<Vec<TransactionCharge>, SettlementError> {
        let models = pending_filter(organisation_id, &PendingChargeFilter::default())
            .all(&self.db)
            .await
            .map_err(settlement_err)?;
        with_currency(&self.db, models).await
    }

    async fn payments_for_stats(
        &self,
        organisation_id: Uuid,
    ) -> Result<Vec<ChargesPayment>, SettlementError> {
        let headers = charges_payments::Entity::find()
            .filter(charges_payments::Column::OrganisationId.eq(organisation_id))
            .all(&self.db)
            .await
            .map_err(settlement_err)?;
        Ok(headers
            .into_iter()
            .map(|h| payment_from_models(h, Vec::new()))
            .collect())
    }
}
