//! In-memory implementation of every repository trait.
//!
//! Each write checks all preconditions before mutating anything, so a failed
//! call leaves the store untouched, the same way a rolled-back database
//! transaction would.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use remitgl_shared::types::PageRequest;
use uuid::Uuid;

use crate::ledger::{
    BoundEntity, BoundEntityKind, GlAccount, GlAccountFilter, GlAccountRepository, GlTransaction,
    GlTransactionFilter, GlTransactionRepository, GlTransactionStatus, LedgerError,
    PreparedPosting, ReversalResult, ReversalWrite, SourceEntity,
};
use crate::settlement::{
    ChargeStatus, ChargeType, ChargesPayment, ChargesPaymentFilter, PaymentApproval,
    PaymentReversal, PaymentStatus, PendingChargeFilter, SettlementError, SettlementRepository,
    TransactionCharge,
};

#[derive(Default)]
struct State {
    organisations: HashMap<Uuid, String>,
    entities: Vec<(Uuid, SourceEntity)>,
    accounts: Vec<GlAccount>,
    transactions: Vec<GlTransaction>,
    charges: Vec<TransactionCharge>,
    payments: Vec<ChargesPayment>,
    sequences: HashMap<(Uuid, ChargeType, NaiveDate), u32>,
}

impl State {
    fn account_mut(&mut self, id: Uuid) -> Option<&mut GlAccount> {
        self.accounts.iter_mut().find(|a| a.id == id)
    }

    fn check_posting(&self, posting: &PreparedPosting) -> Result<(), LedgerError> {
        for delta in &posting.deltas {
            let account = self
                .accounts
                .iter()
                .find(|a| a.id == delta.account_id)
                .ok_or(LedgerError::AccountNotFound(delta.account_id))?;
            let resulting = account.balance + delta.delta;
            if delta.bounded && !account.within_bounds(resulting) {
                return Err(LedgerError::BalanceOutOfBounds {
                    account_id: account.id,
                    resulting,
                });
            }
        }
        Ok(())
    }

    fn check_reversal(&self, write: &ReversalWrite) -> Result<usize, LedgerError> {
        let idx = self
            .transactions
            .iter()
            .position(|t| t.id == write.original_id)
            .ok_or(LedgerError::TransactionNotFound(write.original_id))?;
        if self.transactions[idx].status != GlTransactionStatus::Posted {
            return Err(LedgerError::AlreadyReversed(write.original_id));
        }
        self.check_posting(&write.posting)?;
        Ok(idx)
    }

    /// Preconditions must have been checked with `check_posting`.
    fn apply_posting(&mut self, posting: &PreparedPosting) -> GlTransaction {
        let now = posting.transaction.created_at;
        for delta in &posting.deltas {
            if let Some(account) = self.account_mut(delta.account_id) {
                account.balance += delta.delta;
                account.updated_at = now;
            }
        }
        self.transactions.push(posting.transaction.clone());
        posting.transaction.clone()
    }

    /// Preconditions must have been checked with `check_reversal`.
    fn apply_reversal(&mut self, idx: usize, write: &ReversalWrite) -> ReversalResult {
        let reversal = self.apply_posting(&write.posting);
        let original = &mut self.transactions[idx];
        original.status = GlTransactionStatus::Reversed;
        original.reversed_by = Some(reversal.id);
        original.reversal_reason = Some(write.reason.clone());
        original.reversed_at = Some(reversal.created_at);
        ReversalResult {
            original: original.clone(),
            reversal,
        }
    }

    fn charges_in_status(&self, ids: &[Uuid], status: ChargeStatus) -> usize {
        self.charges
            .iter()
            .filter(|c| ids.contains(&c.id) && c.status == status)
            .count()
    }

    fn set_charge_status(&mut self, ids: &[Uuid], from: ChargeStatus, to: ChargeStatus) {
        for charge in self
            .charges
            .iter_mut()
            .filter(|c| ids.contains(&c.id) && c.status == from)
        {
            charge.status = to;
        }
    }
}

fn paginate<T>(rows: Vec<T>, page: PageRequest) -> (Vec<T>, u64) {
    let total = rows.len() as u64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    (rows.into_iter().skip(offset).take(limit).collect(), total)
}

/// Thread-safe in-memory ledger store for tests.
#[derive(Default)]
pub struct MemoryLedgerStore {
    state: Mutex<State>,
}

impl MemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers an organisation and returns its ID.
    pub fn add_organisation(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state().organisations.insert(id, name.to_string());
        id
    }

    /// Registers a financial entity that `generate_accounts` can scan.
    pub fn add_source_entity(&self, organisation_id: Uuid, entity: SourceEntity) {
        self.state().entities.push((organisation_id, entity));
    }

    /// Registers a charge obligation.
    pub fn add_charge(&self, charge: TransactionCharge) {
        self.state().charges.push(charge);
    }

    /// Snapshot of one account.
    #[must_use]
    pub fn account(&self, id: Uuid) -> Option<GlAccount> {
        self.state().accounts.iter().find(|a| a.id == id).cloned()
    }

    /// Snapshot of one charge.
    #[must_use]
    pub fn charge(&self, id: Uuid) -> Option<TransactionCharge> {
        self.state().charges.iter().find(|c| c.id == id).cloned()
    }

    /// Number of stored GL transactions.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.state().transactions.len()
    }
}

impl GlAccountRepository for MemoryLedgerStore {
    async fn insert_account(&self, account: &GlAccount) -> Result<GlAccount, LedgerError> {
        let mut state = self.state();
        if state.accounts.iter().any(|a| a.id == account.id) {
            return Err(LedgerError::storage(format!("duplicate account id {}", account.id)));
        }
        state.accounts.push(account.clone());
        Ok(account.clone())
    }

    async fn update_account(&self, account: &GlAccount) -> Result<GlAccount, LedgerError> {
        let mut state = self.state();
        let stored = state
            .account_mut(account.id)
            .ok_or(LedgerError::AccountNotFound(account.id))?;
        let balance = stored.balance;
        *stored = GlAccount {
            balance,
            ..account.clone()
        };
        Ok(stored.clone())
    }

    async fn find_account(&self, id: Uuid) -> Result<Option<GlAccount>, LedgerError> {
        Ok(self.account(id))
    }

    async fn find_accounts(&self, ids: &[Uuid]) -> Result<Vec<GlAccount>, LedgerError> {
        Ok(self
            .state()
            .accounts
            .iter()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn find_account_by_entity(
        &self,
        organisation_id: Uuid,
        entity: BoundEntity,
    ) -> Result<Option<GlAccount>, LedgerError> {
        Ok(self
            .state()
            .accounts
            .iter()
            .find(|a| a.organisation_id == organisation_id && a.bound_entity == Some(entity))
            .cloned())
    }

    async fn list_accounts(
        &self,
        filter: &GlAccountFilter,
        page: PageRequest,
    ) -> Result<(Vec<GlAccount>, u64), LedgerError> {
        let mut rows: Vec<GlAccount> = self
            .state()
            .accounts
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(paginate(rows, page))
    }

    async fn accounts_for_stats(
        &self,
        organisation_id: Option<Uuid>,
    ) -> Result<Vec<GlAccount>, LedgerError> {
        Ok(self
            .state()
            .accounts
            .iter()
            .filter(|a| organisation_id.is_none_or(|org| a.organisation_id == org))
            .cloned()
            .collect())
    }

    async fn account_has_entries(&self, id: Uuid) -> Result<bool, LedgerError> {
        Ok(self
            .state()
            .transactions
            .iter()
            .any(|t| t.entries.iter().any(|e| e.gl_account_id == id)))
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool, LedgerError> {
        let mut state = self.state();
        let before = state.accounts.len();
        state.accounts.retain(|a| a.id != id);
        Ok(state.accounts.len() != before)
    }

    async fn list_source_entities(
        &self,
        organisation_id: Uuid,
        kind: BoundEntityKind,
    ) -> Result<Vec<SourceEntity>, LedgerError> {
        Ok(self
            .state()
            .entities
            .iter()
            .filter(|(org, e)| *org == organisation_id && e.entity.kind() == kind)
            .map(|(_, e)| e.clone())
            .collect())
    }
}

impl GlTransactionRepository for MemoryLedgerStore {
    async fn insert_posting(
        &self,
        posting: &PreparedPosting,
    ) -> Result<GlTransaction, LedgerError> {
        let mut state = self.state();
        state.check_posting(posting)?;
        Ok(state.apply_posting(posting))
    }

    async fn reverse_posting(
        &self,
        reversal: &ReversalWrite,
    ) -> Result<ReversalResult, LedgerError> {
        let mut state = self.state();
        let idx = state.check_reversal(reversal)?;
        Ok(state.apply_reversal(idx, reversal))
    }

    async fn find_transaction(
        &self,
        organisation_id: Uuid,
        id: Uuid,
    ) -> Result<Option<GlTransaction>, LedgerError> {
        Ok(self
            .state()
            .transactions
            .iter()
            .find(|t| t.id == id && t.organisation_id == organisation_id)
            .cloned())
    }

    async fn list_transactions(
        &self,
        organisation_id: Uuid,
        filter: &GlTransactionFilter,
        page: PageRequest,
    ) -> Result<(Vec<GlTransaction>, u64), LedgerError> {
        let mut rows: Vec<GlTransaction> = self
            .state()
            .transactions
            .iter()
            .filter(|t| t.organisation_id == organisation_id && filter.matches(t))
            .cloned()
            .collect();
        rows.reverse();
        Ok(paginate(rows, page))
    }

    async fn transactions_for_stats(
        &self,
        organisation_id: Uuid,
    ) -> Result<Vec<GlTransaction>, LedgerError> {
        Ok(self
            .state()
            .transactions
            .iter()
            .filter(|t| t.organisation_id == organisation_id)
            .cloned()
            .collect())
    }
}

impl SettlementRepository for MemoryLedgerStore {
    async fn organisation_name(
        &self,
        organisation_id: Uuid,
    ) -> Result<Option<String>, SettlementError> {
        Ok(self.state().organisations.get(&organisation_id).cloned())
    }

    async fn find_pending_charges(
        &self,
        organisation_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<TransactionCharge>, SettlementError> {
        Ok(self
            .state()
            .charges
            .iter()
            .filter(|c| {
                c.organisation_id == organisation_id && c.status.is_pending() && ids.contains(&c.id)
            })
            .cloned()
            .collect())
    }

    async fn find_charges(
        &self,
        organisation_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<TransactionCharge>, SettlementError> {
        Ok(self
            .state()
            .charges
            .iter()
            .filter(|c| c.organisation_id == organisation_id && ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn allocate_reference_sequence(
        &self,
        organisation_id: Uuid,
        charge_type: ChargeType,
        day: NaiveDate,
    ) -> Result<u32, SettlementError> {
        let mut state = self.state();
        let counter = state
            .sequences
            .entry((organisation_id, charge_type, day))
            .or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn insert_payment(
        &self,
        payment: &ChargesPayment,
    ) -> Result<ChargesPayment, SettlementError> {
        let mut state = self.state();
        if state
            .payments
            .iter()
            .any(|p| p.reference_number == payment.reference_number)
        {
            return Err(SettlementError::storage(format!(
                "duplicate reference number {}",
                payment.reference_number
            )));
        }
        state.payments.push(payment.clone());
        Ok(payment.clone())
    }

    async fn find_payment(
        &self,
        organisation_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ChargesPayment>, SettlementError> {
        Ok(self
            .state()
            .payments
            .iter()
            .find(|p| p.id == id && p.organisation_id == organisation_id)
            .cloned())
    }

    async fn approve_payment(
        &self,
        approval: &PaymentApproval,
    ) -> Result<ChargesPayment, SettlementError> {
        let mut state = self.state();
        let idx = state
            .payments
            .iter()
            .position(|p| p.id == approval.payment_id)
            .ok_or(SettlementError::PaymentNotFound(approval.payment_id))?;
        if state.payments[idx].status != PaymentStatus::Pending {
            return Err(SettlementError::ConcurrentModification(approval.payment_id));
        }
        let ids = &approval.transaction_charge_ids;
        let pending = state.charges_in_status(ids, ChargeStatus::Pending);
        if pending != ids.len() {
            return Err(SettlementError::InvalidCharges {
                requested: ids.len(),
                found: pending,
            });
        }
        if let Some(posting) = &approval.posting {
            state.check_posting(posting)?;
        }

        let gl_transaction_id = approval
            .posting
            .as_ref()
            .map(|posting| state.apply_posting(posting).id);
        state.set_charge_status(ids, ChargeStatus::Pending, ChargeStatus::Paid);

        let payment = &mut state.payments[idx];
        payment.status = PaymentStatus::Completed;
        payment.date_completed = Some(approval.date_completed);
        payment.notes = Some(approval.notes.clone());
        payment.gl_transaction_id = gl_transaction_id;
        Ok(payment.clone())
    }

    async fn reverse_payment(
        &self,
        reversal: &PaymentReversal,
    ) -> Result<ChargesPayment, SettlementError> {
        let mut state = self.state();
        let idx = state
            .payments
            .iter()
            .position(|p| p.id == reversal.payment_id)
            .ok_or(SettlementError::PaymentNotFound(reversal.payment_id))?;
        if state.payments[idx].status != PaymentStatus::Completed {
            return Err(SettlementError::ConcurrentModification(reversal.payment_id));
        }
        let gl_idx = match &reversal.gl_reversal {
            Some(write) => Some(state.check_reversal(write)?),
            None => None,
        };

        if let (Some(gl_idx), Some(write)) = (gl_idx, &reversal.gl_reversal) {
            state.apply_reversal(gl_idx, write);
        }
        state.set_charge_status(
            &reversal.transaction_charge_ids,
            ChargeStatus::Paid,
            ChargeStatus::Pending,
        );

        let payment = &mut state.payments[idx];
        payment.status = PaymentStatus::Failed;
        payment.notes = Some(reversal.notes.clone());
        Ok(payment.clone())
    }

    async fn list_pending_charges(
        &self,
        organisation_id: Uuid,
        filter: &PendingChargeFilter,
        page: PageRequest,
    ) -> Result<(Vec<TransactionCharge>, u64), SettlementError> {
        let mut rows: Vec<TransactionCharge> = self
            .state()
            .charges
            .iter()
            .filter(|c| c.organisation_id == organisation_id && filter.matches(c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(rows, page))
    }

    async fn list_payments(
        &self,
        organisation_id: Uuid,
        filter: &ChargesPaymentFilter,
        page: PageRequest,
    ) -> Result<(Vec<ChargesPayment>, u64), SettlementError> {
        let mut rows: Vec<ChargesPayment> = self
            .state()
            .payments
            .iter()
            .filter(|p| p.organisation_id == organisation_id && filter.matches(p))
            .cloned()
            .collect();
        rows.reverse();
        Ok(paginate(rows, page))
    }

    async fn pending_charges_for_stats(
        &self,
        organisation_id: Uuid,
    ) -> Result<Vec<TransactionCharge>, SettlementError> {
        Ok(self
            .state()
            .charges
            .iter()
            .filter(|c| c.organisation_id == organisation_id && c.status.is_pending())
            .cloned()
            .collect())
    }

    async fn payments_for_stats(
        &self,
        organisation_id: Uuid,
    ) -> Result<Vec<ChargesPayment>, SettlementError> {
        Ok(self
            .state()
            .payments
            .iter()
            .filter(|p| p.organisation_id == organisation_id)
            .cloned()
            .collect())
    }
}
