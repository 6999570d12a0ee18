//! Business rule validation for postings.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use uuid::Uuid;

use super::account::{AccountState, GlAccount};
use super::balance::balance_delta;
use super::entry::{DrCr, EntryInput};
use super::error::LedgerError;
use super::transaction::AccountDelta;

/// Maximum allowed difference between debit and credit totals (0.01).
pub const BALANCE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Debit and credit sums of a set of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryTotals {
    /// Sum of debit amounts.
    pub debits: Decimal,
    /// Sum of credit amounts.
    pub credits: Decimal,
}

/// Returns true if the totals differ by less than [`BALANCE_TOLERANCE`].
#[must_use]
pub fn is_balanced(debits: Decimal, credits: Decimal) -> bool {
    (debits - credits).abs() < BALANCE_TOLERANCE
}

/// Validates that a set of entries is non-empty, positive and balanced.
///
/// # Errors
///
/// Returns an error if the entries are empty, carry a non-positive amount, or
/// do not balance.
pub fn validate_entries(entries: &[EntryInput]) -> Result<EntryTotals, LedgerError> {
    if entries.is_empty() {
        return Err(LedgerError::NoEntries);
    }

    let mut debits = Decimal::ZERO;
    let mut credits = Decimal::ZERO;

    for entry in entries {
        if entry.amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount);
        }
        match entry.dr_cr {
            DrCr::Debit => debits += entry.amount,
            DrCr::Credit => credits += entry.amount,
        }
    }

    if !is_balanced(debits, credits) {
        return Err(LedgerError::Unbalanced { debits, credits });
    }

    Ok(EntryTotals { debits, credits })
}

/// Folds entries into one signed delta per account, ordered by account ID.
///
/// # Errors
///
/// Returns `AccountNotFound` if an entry references an account missing from `accounts`.
pub fn compute_deltas(
    entries: &[EntryInput],
    accounts: &HashMap<Uuid, GlAccount>,
) -> Result<Vec<AccountDelta>, LedgerError> {
    let mut per_account: BTreeMap<Uuid, Decimal> = BTreeMap::new();

    for entry in entries {
        let account = accounts
            .get(&entry.account_id)
            .ok_or(LedgerError::AccountNotFound(entry.account_id))?;
        *per_account.entry(account.id).or_default() +=
            balance_delta(account.account_type, entry.dr_cr, entry.amount);
    }

    Ok(per_account
        .into_iter()
        .map(|(account_id, delta)| AccountDelta {
            account_id,
            delta,
            bounded: false,
        })
        .collect())
}

/// Rejects postings to closed or frozen accounts.
///
/// # Errors
///
/// Returns `AccountNotOpen` unless the account is open.
pub fn ensure_open(account: &GlAccount) -> Result<(), LedgerError> {
    match account.state() {
        AccountState::Open => Ok(()),
        state => Err(LedgerError::AccountNotOpen {
            account_id: account.id,
            state,
        }),
    }
}

/// Rejects a delta that would move the account outside its bounds.
///
/// # Errors
///
/// Returns `BalanceOutOfBounds` if the resulting balance is out of range.
pub fn ensure_within_bounds(account: &GlAccount, delta: Decimal) -> Result<(), LedgerError> {
    let resulting = account.balance + delta;
    if account.within_bounds(resulting) {
        Ok(())
    } else {
        Err(LedgerError::BalanceOutOfBounds {
            account_id: account.id,
            resulting,
        })
    }
}
