//! Settlement domain types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::SettlementError;
use crate::ledger::{PreparedPosting, ReversalWrite};

/// Classification of a charge obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeType {
    /// Agent or partner commission.
    Commission,
    /// Tax collected on a transfer.
    Tax,
    /// Internal processing fee.
    InternalFee,
    /// Anything else.
    Other,
}

impl ChargeType {
    /// All charge types.
    pub const ALL: [Self; 4] = [Self::Commission, Self::Tax, Self::InternalFee, Self::Other];

    /// Returns the stored representation, also used inside reference numbers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Commission => "COMMISSION",
            Self::Tax => "TAX",
            Self::InternalFee => "INTERNAL_FEE",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for ChargeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChargeType {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SettlementError::InvalidFilter(format!("unknown charge type {s}")))
    }
}

/// Status of a per-transaction charge obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChargeStatus {
    /// Awaiting settlement.
    Pending,
    /// Settled by a completed payment.
    Paid,
}

impl ChargeStatus {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
        }
    }

    /// Returns true for pending obligations.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Charges payment status.
///
/// `Pending --approve--> Completed --reverse--> Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    /// Created, awaiting approval.
    Pending,
    /// Approved; its charges are paid.
    Completed,
    /// Reversed after completion (terminal).
    Failed,
}

impl PaymentStatus {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Pending, Self::Completed, Self::Failed]
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SettlementError::InvalidFilter(format!("unknown payment status {s}")))
    }
}

/// A charge obligation raised by one remittance transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCharge {
    /// Obligation ID.
    pub id: Uuid,
    /// Owning organisation.
    pub organisation_id: Uuid,
    /// The remittance transaction that raised it.
    pub transaction_id: Uuid,
    /// The charge definition it was computed from.
    pub charge_id: Uuid,
    /// Charge type.
    #[serde(rename = "type")]
    pub charge_type: ChargeType,
    /// Amount owed internally.
    pub internal_amount: Decimal,
    /// Amount owed to the external party.
    pub external_amount: Decimal,
    /// Origin currency of the remittance transaction.
    pub currency_code: Option<String>,
    /// Status.
    pub status: ChargeStatus,
    /// Free-text description (usually the charge name).
    pub description: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// One obligation settled by a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargesPaymentItem {
    /// Item ID.
    pub id: Uuid,
    /// Owning payment.
    pub charges_payment_id: Uuid,
    /// The settled obligation.
    pub transaction_charge_id: Uuid,
    /// Internal amount settled.
    pub internal_amount: Decimal,
    /// External amount settled.
    pub external_amount: Decimal,
}

/// A settlement batch of charge obligations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargesPayment {
    /// Payment ID.
    pub id: Uuid,
    /// Owning organisation.
    pub organisation_id: Uuid,
    /// Charge type shared by every item.
    #[serde(rename = "type")]
    pub charge_type: ChargeType,
    /// `PAY-<YYYYMMDD>-<TYPE>-<ORG3>-<seq>`.
    pub reference_number: String,
    /// Sum of item internal amounts.
    pub internal_total_amount: Decimal,
    /// Sum of item external amounts.
    pub external_total_amount: Decimal,
    /// Settlement currency.
    pub currency_code: Option<String>,
    /// Destination organisation.
    pub destination_org_id: Option<Uuid>,
    /// Status.
    pub status: PaymentStatus,
    /// Accumulated notes.
    pub notes: Option<String>,
    /// Creator.
    pub created_by: Option<Uuid>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Approval time.
    pub date_completed: Option<DateTime<Utc>>,
    /// GL transaction posted on approval.
    pub gl_transaction_id: Option<Uuid>,
    /// Line items.
    pub items: Vec<ChargesPaymentItem>,
}

/// Input for creating a charges payment.
#[derive(Debug, Clone)]
pub struct CreateChargesPaymentInput {
    /// Owning organisation.
    pub organisation_id: Uuid,
    /// Pending obligations to settle.
    pub transaction_charge_ids: Vec<Uuid>,
    /// Destination organisation.
    pub destination_org_id: Option<Uuid>,
    /// Initial notes.
    pub notes: Option<String>,
    /// Creator.
    pub created_by: Option<Uuid>,
}

/// Input for approving a charges payment.
#[derive(Debug, Clone)]
pub struct ApproveChargesPaymentInput {
    /// Owning organisation.
    pub organisation_id: Uuid,
    /// Payment to approve.
    pub payment_id: Uuid,
    /// Approval notes.
    pub notes: Option<String>,
    /// When set, post the settlement to the ledger against this account.
    pub settlement_account_id: Option<Uuid>,
    /// Approver.
    pub approved_by: Option<Uuid>,
}

/// Input for reversing a charges payment.
#[derive(Debug, Clone)]
pub struct ReverseChargesPaymentInput {
    /// Owning organisation.
    pub organisation_id: Uuid,
    /// Payment to reverse.
    pub payment_id: Uuid,
    /// Why (required).
    pub reason: String,
    /// Additional notes.
    pub notes: Option<String>,
    /// Reverser.
    pub reversed_by: Option<Uuid>,
}

/// Writes performed atomically when a payment is approved.
#[derive(Debug, Clone)]
pub struct PaymentApproval {
    /// Payment to complete. Must still be PENDING at write time.
    pub payment_id: Uuid,
    /// Completion time.
    pub date_completed: DateTime<Utc>,
    /// Notes after appending the approval line.
    pub notes: String,
    /// Obligations to mark PAID.
    pub transaction_charge_ids: Vec<Uuid>,
    /// Optional ledger posting.
    pub posting: Option<PreparedPosting>,
}

/// Writes performed atomically when a payment is reversed.
#[derive(Debug, Clone)]
pub struct PaymentReversal {
    /// Payment to fail. Must still be COMPLETED at write time.
    pub payment_id: Uuid,
    /// Notes after appending the reversal line.
    pub notes: String,
    /// Obligations to reset to PENDING.
    pub transaction_charge_ids: Vec<Uuid>,
    /// Optional reversal of the approval's ledger posting.
    pub gl_reversal: Option<ReversalWrite>,
}

/// Filter for pending charge listings.
#[derive(Debug, Clone, Default)]
pub struct PendingChargeFilter {
    /// Restrict to one charge type.
    pub charge_type: Option<ChargeType>,
    /// Restrict to one currency.
    pub currency_code: Option<String>,
    /// Created at or after.
    pub from: Option<DateTime<Utc>>,
    /// Created at or before.
    pub to: Option<DateTime<Utc>>,
    /// Internal amount at least.
    pub min_amount: Option<Decimal>,
    /// Internal amount at most.
    pub max_amount: Option<Decimal>,
    /// Case-insensitive substring match on the description.
    pub search: Option<String>,
}

impl PendingChargeFilter {
    /// Returns true if the charge is pending and satisfies every set predicate.
    #[must_use]
    pub fn matches(&self, charge: &TransactionCharge) -> bool {
        charge.status.is_pending()
            && self.charge_type.is_none_or(|t| charge.charge_type == t)
            && currency_matches(self.currency_code.as_deref(), charge.currency_code.as_deref())
            && self.from.is_none_or(|from| charge.created_at >= from)
            && self.to.is_none_or(|to| charge.created_at <= to)
            && self.min_amount.is_none_or(|min| charge.internal_amount >= min)
            && self.max_amount.is_none_or(|max| charge.internal_amount <= max)
            && self.search.as_deref().is_none_or(|q| {
                charge
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&q.trim().to_lowercase()))
            })
    }
}

/// Filter for charges payment listings.
#[derive(Debug, Clone, Default)]
pub struct ChargesPaymentFilter {
    /// Restrict to one charge type.
    pub charge_type: Option<ChargeType>,
    /// Restrict to one status.
    pub status: Option<PaymentStatus>,
    /// Restrict to one currency.
    pub currency_code: Option<String>,
    /// Created at or after.
    pub from: Option<DateTime<Utc>>,
    /// Created at or before.
    pub to: Option<DateTime<Utc>>,
    /// Internal total at least.
    pub min_amount: Option<Decimal>,
    /// Internal total at most.
    pub max_amount: Option<Decimal>,
    /// Case-insensitive substring match on reference number or notes.
    pub search: Option<String>,
}

impl ChargesPaymentFilter {
    /// Returns true if the payment satisfies every set predicate.
    #[must_use]
    pub fn matches(&self, payment: &ChargesPayment) -> bool {
        self.charge_type.is_none_or(|t| payment.charge_type == t)
            && self.status.is_none_or(|s| payment.status == s)
            && currency_matches(self.currency_code.as_deref(), payment.currency_code.as_deref())
            && self.from.is_none_or(|from| payment.created_at >= from)
            && self.to.is_none_or(|to| payment.created_at <= to)
            && self.min_amount.is_none_or(|min| payment.internal_total_amount >= min)
            && self.max_amount.is_none_or(|max| payment.internal_total_amount <= max)
            && self.search.as_deref().is_none_or(|q| {
                let q = q.trim().to_lowercase();
                payment.reference_number.to_lowercase().contains(&q)
                    || payment
                        .notes
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&q))
            })
    }
}

fn currency_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    wanted.is_none_or(|w| actual.is_some_and(|a| a.eq_ignore_ascii_case(w)))
}
