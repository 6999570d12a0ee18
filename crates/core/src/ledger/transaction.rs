//! GL transaction aggregate and posting inputs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::GlAccount;
use super::entry::{EntryInput, GlEntry};
use super::error::LedgerError;

/// Kind of financial event a GL transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GlTransactionType {
    /// Cash or bank deposit.
    Deposit,
    /// Cash or bank withdrawal.
    Withdrawal,
    /// Movement between internal accounts.
    Transfer,
    /// Outbound or inbound remittance.
    Remittance,
    /// Settlement of a charges payment batch.
    ChargesPayment,
    /// Manual adjustment.
    Adjustment,
    /// Compensating reversal of another transaction.
    Reversal,
}

impl GlTransactionType {
    /// All transaction types.
    pub const ALL: [Self; 7] = [
        Self::Deposit,
        Self::Withdrawal,
        Self::Transfer,
        Self::Remittance,
        Self::ChargesPayment,
        Self::Adjustment,
        Self::Reversal,
    ];

    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
            Self::Transfer => "TRANSFER",
            Self::Remittance => "REMITTANCE",
            Self::ChargesPayment => "CHARGES_PAYMENT",
            Self::Adjustment => "ADJUSTMENT",
            Self::Reversal => "REVERSAL",
        }
    }
}

impl fmt::Display for GlTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GlTransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LedgerError::InvalidTransactionType(s.to_string()))
    }
}

/// GL transaction status. `Posted -> Reversed` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GlTransactionStatus {
    /// Applied to the ledger.
    Posted,
    /// Compensated by a reversal (terminal).
    Reversed,
}

impl GlTransactionStatus {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Posted => "POSTED",
            Self::Reversed => "REVERSED",
        }
    }
}

impl FromStr for GlTransactionStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Posted, Self::Reversed]
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LedgerError::InvalidStatus(s.to_string()))
    }
}

impl fmt::Display for GlTransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional links to the records that caused a posting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingContext {
    /// Vault involved.
    pub vault_id: Option<Uuid>,
    /// Till involved.
    pub till_id: Option<Uuid>,
    /// Customer involved.
    pub customer_id: Option<Uuid>,
    /// Remittance transaction involved.
    pub transaction_id: Option<Uuid>,
}

/// Input for posting a GL transaction.
#[derive(Debug, Clone)]
pub struct PostTransactionInput {
    /// Owning organisation.
    pub organisation_id: Uuid,
    /// Transaction type.
    pub transaction_type: GlTransactionType,
    /// Header amount; defaults to the debit total.
    pub amount: Option<Decimal>,
    /// Currency code.
    pub currency_code: Option<String>,
    /// Description.
    pub description: String,
    /// The legs.
    pub entries: Vec<EntryInput>,
    /// Causing records.
    pub context: PostingContext,
    /// The posting user.
    pub created_by: Option<Uuid>,
}

/// An immutable record of a balanced financial event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlTransaction {
    /// Transaction ID.
    pub id: Uuid,
    /// Owning organisation.
    pub organisation_id: Uuid,
    /// Transaction type.
    #[serde(rename = "type")]
    pub transaction_type: GlTransactionType,
    /// Header amount.
    pub amount: Decimal,
    /// Currency code.
    pub currency_code: Option<String>,
    /// Description.
    pub description: String,
    /// Status.
    pub status: GlTransactionStatus,
    /// Causing records.
    #[serde(flatten)]
    pub context: PostingContext,
    /// The transaction this one reverses.
    pub reversal_of: Option<Uuid>,
    /// The transaction that reversed this one.
    pub reversed_by: Option<Uuid>,
    /// Why it was reversed.
    pub reversal_reason: Option<String>,
    /// When it was reversed.
    pub reversed_at: Option<DateTime<Utc>>,
    /// The posting user.
    pub created_by: Option<Uuid>,
    /// Posting time.
    pub created_at: DateTime<Utc>,
    /// The legs.
    pub entries: Vec<GlEntry>,
}

/// Signed balance change for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountDelta {
    /// The account.
    pub account_id: Uuid,
    /// Signed change to apply.
    pub delta: Decimal,
    /// The write must fail if the resulting balance leaves the account's
    /// stored `[min_balance, max_balance]` range.
    pub bounded: bool,
}

/// A validated posting ready to be written in one unit of work.
#[derive(Debug, Clone)]
pub struct PreparedPosting {
    /// Transaction header and entries to insert.
    pub transaction: GlTransaction,
    /// Balance changes, one per account, ordered by account ID.
    pub deltas: Vec<AccountDelta>,
}

/// A prepared reversal of a posted transaction.
#[derive(Debug, Clone)]
pub struct ReversalWrite {
    /// The transaction being reversed.
    pub original_id: Uuid,
    /// Reason recorded on the original.
    pub reason: String,
    /// The compensating posting.
    pub posting: PreparedPosting,
}

/// Outcome of a successful posting.
#[derive(Debug, Clone, Serialize)]
pub struct PostedTransaction {
    /// The persisted transaction.
    pub transaction: GlTransaction,
    /// Snapshots of the touched accounts after the posting.
    pub accounts: Vec<GlAccount>,
}

/// Outcome of a successful reversal.
#[derive(Debug, Clone, Serialize)]
pub struct ReversalResult {
    /// The original, now reversed.
    pub original: GlTransaction,
    /// The compensating transaction.
    pub reversal: GlTransaction,
}

/// Filter for listing GL transactions.
#[derive(Debug, Clone, Default)]
pub struct GlTransactionFilter {
    /// Restrict to one type.
    pub transaction_type: Option<GlTransactionType>,
    /// Restrict to one status.
    pub status: Option<GlTransactionStatus>,
    /// Created at or after.
    pub from: Option<DateTime<Utc>>,
    /// Created at or before.
    pub to: Option<DateTime<Utc>>,
    /// Amount at least.
    pub min_amount: Option<Decimal>,
    /// Amount at most.
    pub max_amount: Option<Decimal>,
    /// Has an entry on this account.
    pub account_id: Option<Uuid>,
    /// Case-insensitive substring match on the description.
    pub search: Option<String>,
}

impl GlTransactionFilter {
    /// Returns true if the transaction satisfies every set predicate.
    #[must_use]
    pub fn matches(&self, tx: &GlTransaction) -> bool {
        self.transaction_type.is_none_or(|t| tx.transaction_type == t)
            && self.status.is_none_or(|s| tx.status == s)
            && self.from.is_none_or(|from| tx.created_at >= from)
            && self.to.is_none_or(|to| tx.created_at <= to)
            && self.min_amount.is_none_or(|min| tx.amount >= min)
            && self.max_amount.is_none_or(|max| tx.amount <= max)
            && self
                .account_id
                .is_none_or(|acc| tx.entries.iter().any(|e| e.gl_account_id == acc))
            && self.search.as_deref().is_none_or(|q| {
                tx.description.to_lowercase().contains(&q.trim().to_lowercase())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transaction_type_round_trips_through_str() {
        for t in GlTransactionType::ALL {
            assert_eq!(t.as_str().parse::<GlTransactionType>().unwrap(), t);
        }
        assert!("REFUND".parse::<GlTransactionType>().is_err());
    }

    #[test]
    fn test_filter_by_amount_and_search() {
        let tx = GlTransaction {
            id: Uuid::new_v4(),
            organisation_id: Uuid::new_v4(),
            transaction_type: GlTransactionType::Deposit,
            amount: dec!(150),
            currency_code: Some("USD".to_string()),
            description: "Vault cash-in".to_string(),
            status: GlTransactionStatus::Posted,
            context: PostingContext::default(),
            reversal_of: None,
            reversed_by: None,
            reversal_reason: None,
            reversed_at: None,
            created_by: None,
            created_at: Utc::now(),
            entries: vec![],
        };

        let filter = GlTransactionFilter {
            min_amount: Some(dec!(100)),
            max_amount: Some(dec!(200)),
            search: Some("CASH".to_string()),
            ..GlTransactionFilter::default()
        };
        assert!(filter.matches(&tx));

        let filter = GlTransactionFilter {
            status: Some(GlTransactionStatus::Reversed),
            ..GlTransactionFilter::default()
        };
        assert!(!filter.matches(&tx));
    }
}
