//! GL transaction poster.
//!
//! Validates a balanced set of entries and hands the repository a prepared
//! posting to apply atomically. Reversals go through the same path with every
//! entry flipped.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use remitgl_shared::types::{PageRequest, PageResponse};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use super::account::GlAccount;
use super::entry::{EntryInput, GlEntry};
use super::error::LedgerError;
use super::policy::LedgerPolicy;
use super::repository::{GlAccountRepository, GlTransactionRepository};
use super::transaction::{
    GlTransaction, GlTransactionFilter, GlTransactionStatus, GlTransactionType,
    PostTransactionInput, PostedTransaction, PostingContext, PreparedPosting, ReversalResult,
    ReversalWrite,
};
use super::validation::{compute_deltas, ensure_open, ensure_within_bounds, validate_entries};
use crate::stats::{TransactionStats, transaction_stats};

/// Service posting and reversing GL transactions.
pub struct GlPoster<R> {
    repo: Arc<R>,
    policy: LedgerPolicy,
}

impl<R> Clone for GlPoster<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            policy: self.policy,
        }
    }
}

impl<R: GlAccountRepository + GlTransactionRepository> GlPoster<R> {
    /// Create a new poster.
    #[must_use]
    pub fn new(repo: Arc<R>, policy: LedgerPolicy) -> Self {
        Self { repo, policy }
    }

    /// Validate a posting request and compute its balance deltas.
    ///
    /// Nothing is written.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - entries are empty, non-positive or unbalanced
    /// - the header amount is not positive
    /// - a referenced account does not exist or is not open
    /// - bounds are enforced and an account would leave its range
    pub async fn prepare_posting(
        &self,
        input: PostTransactionInput,
        now: DateTime<Utc>,
    ) -> Result<PreparedPosting, LedgerError> {
        let totals = validate_entries(&input.entries)?;
        let amount = input.amount.unwrap_or(totals.debits);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount);
        }

        let accounts = self
            .load_accounts(input.organisation_id, &input.entries)
            .await?;
        for account in accounts.values() {
            ensure_open(account)?;
        }

        let mut deltas = compute_deltas(&input.entries, &accounts)?;
        if self.policy.enforce_balance_bounds {
            for delta in &mut deltas {
                if let Some(account) = accounts.get(&delta.account_id) {
                    ensure_within_bounds(account, delta.delta)?;
                }
                // Checked again against the stored balance at write time.
                delta.bounded = true;
            }
        }

        let transaction = build_transaction(
            input.organisation_id,
            input.transaction_type,
            amount,
            input.currency_code,
            input.description,
            input.entries,
            input.context,
            input.created_by,
            None,
            now,
        );

        Ok(PreparedPosting { transaction, deltas })
    }

    /// Post a balanced transaction.
    ///
    /// # Errors
    ///
    /// See [`Self::prepare_posting`]; storage failures roll back every write.
    pub async fn post_transaction(
        &self,
        input: PostTransactionInput,
    ) -> Result<PostedTransaction, LedgerError> {
        let posting = self.prepare_posting(input, Utc::now()).await?;
        let transaction = self.repo.insert_posting(&posting).await?;

        let ids: Vec<Uuid> = posting.deltas.iter().map(|d| d.account_id).collect();
        let accounts = self.repo.find_accounts(&ids).await?;

        info!(
            gl_transaction_id = %transaction.id,
            org_id = %transaction.organisation_id,
            transaction_type = %transaction.transaction_type,
            amount = %transaction.amount,
            "GL transaction posted"
        );
        Ok(PostedTransaction {
            transaction,
            accounts,
        })
    }

    /// Build the compensating posting for a posted transaction.
    ///
    /// Reversals skip the lifecycle and bounds checks so they always restore
    /// the balances the original changed.
    ///
    /// # Errors
    ///
    /// Returns `ReasonRequired`, `AlreadyReversed` or `CannotReverseReversal`.
    pub async fn prepare_reversal(
        &self,
        original: &GlTransaction,
        reason: &str,
        reversed_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<ReversalWrite, LedgerError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::ReasonRequired);
        }
        if original.status == GlTransactionStatus::Reversed {
            return Err(LedgerError::AlreadyReversed(original.id));
        }
        if original.reversal_of.is_some() {
            return Err(LedgerError::CannotReverseReversal(original.id));
        }

        let entries: Vec<EntryInput> = original.entries.iter().map(GlEntry::flipped).collect();
        let accounts = self
            .load_accounts(original.organisation_id, &entries)
            .await?;
        let deltas = compute_deltas(&entries, &accounts)?;

        let transaction = build_transaction(
            original.organisation_id,
            GlTransactionType::Reversal,
            original.amount,
            original.currency_code.clone(),
            format!("Reversal of transaction {}. Reason: {reason}", original.id),
            entries,
            original.context,
            reversed_by,
            Some(original.id),
            now,
        );

        Ok(ReversalWrite {
            original_id: original.id,
            reason: reason.to_string(),
            posting: PreparedPosting { transaction, deltas },
        })
    }

    /// Reverse a posted transaction.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` if absent, `AlreadyReversed` if it was
    /// reversed before or concurrently, and `ReasonRequired` for a blank reason.
    pub async fn reverse_transaction(
        &self,
        organisation_id: Uuid,
        transaction_id: Uuid,
        reason: &str,
        reversed_by: Option<Uuid>,
    ) -> Result<ReversalResult, LedgerError> {
        if reason.trim().is_empty() {
            return Err(LedgerError::ReasonRequired);
        }
        let original = self.get_transaction(organisation_id, transaction_id).await?;
        let write = self
            .prepare_reversal(&original, reason, reversed_by, Utc::now())
            .await?;

        let result = self.repo.reverse_posting(&write).await?;
        info!(
            gl_transaction_id = %transaction_id,
            reversal_id = %result.reversal.id,
            org_id = %organisation_id,
            "GL transaction reversed"
        );
        Ok(result)
    }

    /// Fetch one transaction with its entries.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` if it does not exist in the organisation.
    pub async fn get_transaction(
        &self,
        organisation_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<GlTransaction, LedgerError> {
        self.repo
            .find_transaction(organisation_id, transaction_id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(transaction_id))
    }

    /// List transactions matching a filter.
    pub async fn list_transactions(
        &self,
        organisation_id: Uuid,
        filter: &GlTransactionFilter,
        page: PageRequest,
    ) -> Result<PageResponse<GlTransaction>, LedgerError> {
        let page = page.normalized();
        let (items, total) = self
            .repo
            .list_transactions(organisation_id, filter, page)
            .await?;
        Ok(PageResponse::new(items, page, total))
    }

    /// Aggregate an organisation's transactions.
    pub async fn get_stats(&self, organisation_id: Uuid) -> Result<TransactionStats, LedgerError> {
        let transactions = self.repo.transactions_for_stats(organisation_id).await?;
        Ok(transaction_stats(&transactions))
    }

    /// Accounts of another organisation are reported as missing.
    async fn load_accounts(
        &self,
        organisation_id: Uuid,
        entries: &[EntryInput],
    ) -> Result<HashMap<Uuid, GlAccount>, LedgerError> {
        let mut ids: Vec<Uuid> = entries.iter().map(|e| e.account_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let accounts: HashMap<Uuid, GlAccount> = self
            .repo
            .find_accounts(&ids)
            .await?
            .into_iter()
            .filter(|a| a.organisation_id == organisation_id)
            .map(|a| (a.id, a))
            .collect();

        if let Some(missing) = ids.iter().find(|id| !accounts.contains_key(id)) {
            return Err(LedgerError::AccountNotFound(*missing));
        }
        Ok(accounts)
    }
}

#[allow(clippy::too_many_arguments)]
fn build_transaction(
    organisation_id: Uuid,
    transaction_type: GlTransactionType,
    amount: Decimal,
    currency_code: Option<String>,
    description: String,
    entries: Vec<EntryInput>,
    context: PostingContext,
    created_by: Option<Uuid>,
    reversal_of: Option<Uuid>,
    now: DateTime<Utc>,
) -> GlTransaction {
    let id = Uuid::new_v4();
    let entries = entries
        .into_iter()
        .map(|e| GlEntry {
            id: Uuid::new_v4(),
            gl_transaction_id: id,
            gl_account_id: e.account_id,
            amount: e.amount,
            dr_cr: e.dr_cr,
            description: e.description,
            created_at: now,
        })
        .collect();

    GlTransaction {
        id,
        organisation_id,
        transaction_type,
        amount,
        currency_code,
        description,
        status: GlTransactionStatus::Posted,
        context,
        reversal_of,
        reversed_by: None,
        reversal_reason: None,
        reversed_at: None,
        created_by,
        created_at: now,
        entries,
    }
}
