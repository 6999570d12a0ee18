//! Charges payment settlement.
//!
//! Batches pending per-transaction charge obligations into a payment, approves
//! it (marking the obligations paid and optionally posting to the ledger), and
//! supports compensating reversal.

mod error;
mod reference;
mod repository;
mod service;
mod types;
mod workflow;

#[cfg(test)]
mod tests;
#[cfg(test)]
mod workflow_props;

pub use error::SettlementError;
pub use reference::{FALLBACK_ORG_CODE, org_code, reference_number};
pub use repository::SettlementRepository;
pub use service::ChargesSettlement;
pub use types::{
    ApproveChargesPaymentInput, ChargeStatus, ChargeType, ChargesPayment, ChargesPaymentFilter,
    ChargesPaymentItem, CreateChargesPaymentInput, PaymentApproval, PaymentReversal,
    PaymentStatus, PendingChargeFilter, ReverseChargesPaymentInput, TransactionCharge,
};
pub use workflow::{PaymentWorkflow, append_note, approval_note, reversal_note};
