//! Balance direction rules.
//!
//! - Asset/Expense: balance += debit - credit (debit-normal)
//! - Liability/Equity/Revenue: balance += credit - debit (credit-normal)

use rust_decimal::Decimal;

use super::account::GlAccountType;
use super::entry::DrCr;

/// Returns the side on which an account of this type increases.
#[must_use]
pub const fn normal_balance_side(account_type: GlAccountType) -> DrCr {
    match account_type {
        GlAccountType::Asset | GlAccountType::Expense => DrCr::Debit,
        GlAccountType::Liability | GlAccountType::Equity | GlAccountType::Revenue => DrCr::Credit,
    }
}

/// Signed balance change of posting `amount` on `side` to an account of `account_type`.
#[must_use]
pub fn balance_delta(account_type: GlAccountType, side: DrCr, amount: Decimal) -> Decimal {
    if normal_balance_side(account_type) == side {
        amount
    } else {
        -amount
    }
}
