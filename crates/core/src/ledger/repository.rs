//! Repository traits for ledger persistence.
//!
//! These traits are implemented by the db crate to provide actual database
//! operations, and by the in-memory store for tests.

use remitgl_shared::types::PageRequest;
use uuid::Uuid;

use super::account::{BoundEntity, BoundEntityKind, GlAccount, GlAccountFilter, SourceEntity};
use super::error::LedgerError;
use super::transaction::{
    GlTransaction, GlTransactionFilter, PreparedPosting, ReversalResult, ReversalWrite,
};

/// Persistence for GL accounts and the entities they can be bound to.
pub trait GlAccountRepository: Send + Sync {
    /// Insert a new account.
    fn insert_account(
        &self,
        account: &GlAccount,
    ) -> impl std::future::Future<Output = Result<GlAccount, LedgerError>> + Send;

    /// Persist account metadata. The running balance is never written here.
    fn update_account(
        &self,
        account: &GlAccount,
    ) -> impl std::future::Future<Output = Result<GlAccount, LedgerError>> + Send;

    /// Find an account by ID.
    fn find_account(
        &self,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<Option<GlAccount>, LedgerError>> + Send;

    /// Find every account whose ID is in `ids`. Missing IDs are skipped.
    fn find_accounts(
        &self,
        ids: &[Uuid],
    ) -> impl std::future::Future<Output = Result<Vec<GlAccount>, LedgerError>> + Send;

    /// Find the account bound to an entity within an organisation.
    fn find_account_by_entity(
        &self,
        organisation_id: Uuid,
        entity: BoundEntity,
    ) -> impl std::future::Future<Output = Result<Option<GlAccount>, LedgerError>> + Send;

    /// List one page of accounts matching the filter, with the total match count.
    fn list_accounts(
        &self,
        filter: &GlAccountFilter,
        page: PageRequest,
    ) -> impl std::future::Future<Output = Result<(Vec<GlAccount>, u64), LedgerError>> + Send;

    /// Load every account, optionally scoped to one organisation.
    fn accounts_for_stats(
        &self,
        organisation_id: Option<Uuid>,
    ) -> impl std::future::Future<Output = Result<Vec<GlAccount>, LedgerError>> + Send;

    /// Returns true if any GL entry references the account.
    fn account_has_entries(
        &self,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<bool, LedgerError>> + Send;

    /// Hard-delete an account. Returns false if it did not exist.
    fn delete_account(
        &self,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<bool, LedgerError>> + Send;

    /// Enumerate an organisation's entities of one kind.
    fn list_source_entities(
        &self,
        organisation_id: Uuid,
        kind: BoundEntityKind,
    ) -> impl std::future::Future<Output = Result<Vec<SourceEntity>, LedgerError>> + Send;
}

/// Persistence for GL transactions.
pub trait GlTransactionRepository: Send + Sync {
    /// Insert the transaction, its entries and apply every balance delta in one unit of work.
    fn insert_posting(
        &self,
        posting: &PreparedPosting,
    ) -> impl std::future::Future<Output = Result<GlTransaction, LedgerError>> + Send;

    /// Mark the original REVERSED and insert the compensating posting in one unit of work.
    ///
    /// Fails with `AlreadyReversed` if the original is no longer POSTED at write time.
    fn reverse_posting(
        &self,
        reversal: &ReversalWrite,
    ) -> impl std::future::Future<Output = Result<ReversalResult, LedgerError>> + Send;

    /// Find a transaction with its entries.
    fn find_transaction(
        &self,
        organisation_id: Uuid,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<Option<GlTransaction>, LedgerError>> + Send;

    /// List one page of transactions matching the filter, newest first.
    fn list_transactions(
        &self,
        organisation_id: Uuid,
        filter: &GlTransactionFilter,
        page: PageRequest,
    ) -> impl std::future::Future<Output = Result<(Vec<GlTransaction>, u64), LedgerError>> + Send;

    /// Load every transaction header of an organisation. Entries may be omitted.
    fn transactions_for_stats(
        &self,
        organisation_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<GlTransaction>, LedgerError>> + Send;
}
