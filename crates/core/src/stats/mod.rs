//! Read-only rollups consumed by the dashboard.
//!
//! Every function here is a pure fold over row snapshots loaded by a repository.

mod types;

pub use types::{
    AccountStats, AmountBucket, BalanceBucket, PaymentBucket, PaymentStats, PendingChargeStats,
    TransactionStats,
};

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::ledger::{GlAccount, GlTransaction};
use crate::settlement::{ChargesPayment, TransactionCharge};

/// Bucket key for rows without a currency.
pub const NO_CURRENCY: &str = "UNSPECIFIED";

fn currency_key(code: Option<&str>) -> String {
    code.map_or_else(|| NO_CURRENCY.to_string(), str::to_uppercase)
}

/// Aggregates balances by type, currency, organisation and lifecycle state.
#[must_use]
pub fn account_stats(accounts: &[GlAccount]) -> AccountStats {
    let mut stats = AccountStats::default();

    for account in accounts {
        stats.total_accounts += 1;
        stats.total_balance += account.balance;
        stats.total_locked_balance += account.locked_balance;

        for (map, key) in [
            (&mut stats.by_type, account.account_type.as_str().to_string()),
            (&mut stats.by_currency, currency_key(account.currency_code.as_deref())),
            (&mut stats.by_organisation, account.organisation_id.to_string()),
            (&mut stats.by_state, account.state().as_str().to_string()),
        ] {
            map.entry(key).or_default().add(account.balance, account.locked_balance);
        }
    }

    stats
}

/// Aggregates GL transaction counts and amounts by status, type and currency.
#[must_use]
pub fn transaction_stats(transactions: &[GlTransaction]) -> TransactionStats {
    let mut stats = TransactionStats::default();

    for tx in transactions {
        stats.total_transactions += 1;
        stats.total_amount += tx.amount;
        add_amount(&mut stats.by_status, tx.status.as_str(), tx.amount);
        add_amount(&mut stats.by_type, tx.transaction_type.as_str(), tx.amount);
        add_amount(
            &mut stats.by_currency,
            &currency_key(tx.currency_code.as_deref()),
            tx.amount,
        );
    }

    stats
}

/// Aggregates charges payments by status, charge type and currency.
#[must_use]
pub fn payment_stats(payments: &[ChargesPayment]) -> PaymentStats {
    let mut stats = PaymentStats::default();

    for payment in payments {
        stats.total_payments += 1;
        stats.internal_total += payment.internal_total_amount;
        stats.external_total += payment.external_total_amount;

        for (map, key) in [
            (&mut stats.by_status, payment.status.as_str().to_string()),
            (&mut stats.by_type, payment.charge_type.as_str().to_string()),
            (&mut stats.by_currency, currency_key(payment.currency_code.as_deref())),
        ] {
            map.entry(key)
                .or_default()
                .add(payment.internal_total_amount, payment.external_total_amount);
        }
    }

    stats
}

/// Aggregates pending charge obligations by charge type and currency.
#[must_use]
pub fn pending_charge_stats(charges: &[TransactionCharge]) -> PendingChargeStats {
    let mut stats = PendingChargeStats::default();

    for charge in charges.iter().filter(|c| c.status.is_pending()) {
        stats.total_pending += 1;
        stats.internal_total += charge.internal_amount;
        stats.external_total += charge.external_amount;

        for (map, key) in [
            (&mut stats.by_type, charge.charge_type.as_str().to_string()),
            (&mut stats.by_currency, currency_key(charge.currency_code.as_deref())),
        ] {
            map.entry(key)
                .or_default()
                .add(charge.internal_amount, charge.external_amount);
        }
    }

    stats
}

fn add_amount(map: &mut BTreeMap<String, AmountBucket>, key: &str, amount: Decimal) {
    let bucket = map.entry(key.to_string()).or_default();
    bucket.count += 1;
    bucket.total += amount;
}
