//! Stats result types.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

/// Count and balance totals for a group of accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BalanceBucket {
    /// Number of accounts.
    pub count: u64,
    /// Sum of balances.
    pub balance: Decimal,
    /// Sum of locked balances.
    pub locked_balance: Decimal,
}

impl BalanceBucket {
    pub(super) fn add(&mut self, balance: Decimal, locked: Decimal) {
        self.count += 1;
        self.balance += balance;
        self.locked_balance += locked;
    }
}

/// Count and amount total for a group of transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AmountBucket {
    /// Number of rows.
    pub count: u64,
    /// Sum of amounts.
    pub total: Decimal,
}

/// Count and internal/external totals for a group of payments or charges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaymentBucket {
    /// Number of rows.
    pub count: u64,
    /// Sum of internal amounts.
    pub internal_total: Decimal,
    /// Sum of external amounts.
    pub external_total: Decimal,
}

impl PaymentBucket {
    pub(super) fn add(&mut self, internal: Decimal, external: Decimal) {
        self.count += 1;
        self.internal_total += internal;
        self.external_total += external;
    }
}

/// GL account rollup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountStats {
    /// Number of accounts.
    pub total_accounts: u64,
    /// Sum of all balances.
    pub total_balance: Decimal,
    /// Sum of all locked balances.
    pub total_locked_balance: Decimal,
    /// Keyed by account type.
    pub by_type: BTreeMap<String, BalanceBucket>,
    /// Keyed by currency code.
    pub by_currency: BTreeMap<String, BalanceBucket>,
    /// Keyed by organisation ID.
    pub by_organisation: BTreeMap<String, BalanceBucket>,
    /// Keyed by lifecycle state.
    pub by_state: BTreeMap<String, BalanceBucket>,
}

/// GL transaction rollup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionStats {
    /// Number of transactions.
    pub total_transactions: u64,
    /// Sum of header amounts.
    pub total_amount: Decimal,
    /// Keyed by status.
    pub by_status: BTreeMap<String, AmountBucket>,
    /// Keyed by transaction type.
    pub by_type: BTreeMap<String, AmountBucket>,
    /// Keyed by currency code.
    pub by_currency: BTreeMap<String, AmountBucket>,
}

/// Charges payment rollup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaymentStats {
    /// Number of payments.
    pub total_payments: u64,
    /// Sum of internal totals.
    pub internal_total: Decimal,
    /// Sum of external totals.
    pub external_total: Decimal,
    /// Keyed by payment status.
    pub by_status: BTreeMap<String, PaymentBucket>,
    /// Keyed by charge type.
    pub by_type: BTreeMap<String, PaymentBucket>,
    /// Keyed by currency code.
    pub by_currency: BTreeMap<String, PaymentBucket>,
}

/// Pending charge obligation rollup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PendingChargeStats {
    /// Number of pending charges.
    pub total_pending: u64,
    /// Sum of internal amounts.
    pub internal_total: Decimal,
    /// Sum of external amounts.
    pub external_total: Decimal,
    /// Keyed by charge type.
    pub by_type: BTreeMap<String, PaymentBucket>,
    /// Keyed by currency code.
    pub by_currency: BTreeMap<String, PaymentBucket>,
}
