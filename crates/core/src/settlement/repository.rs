//! Repository trait for settlement persistence.

use chrono::NaiveDate;
use remitgl_shared::types::PageRequest;
use uuid::Uuid;

use super::error::SettlementError;
use super::types::{
    ChargeType, ChargesPayment, ChargesPaymentFilter, PaymentApproval, PaymentReversal,
    PendingChargeFilter, TransactionCharge,
};

/// Persistence for charges payments and the obligations they settle.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait SettlementRepository: Send + Sync {
    /// Returns the organisation's display name.
    fn organisation_name(
        &self,
        organisation_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Option<String>, SettlementError>> + Send;

    /// Load charges with the given IDs that belong to the organisation and are PENDING.
    fn find_pending_charges(
        &self,
        organisation_id: Uuid,
        ids: &[Uuid],
    ) -> impl std::future::Future<Output = Result<Vec<TransactionCharge>, SettlementError>> + Send;

    /// Load charges with the given IDs that belong to the organisation, any status.
    fn find_charges(
        &self,
        organisation_id: Uuid,
        ids: &[Uuid],
    ) -> impl std::future::Future<Output = Result<Vec<TransactionCharge>, SettlementError>> + Send;

    /// Atomically increment and return the per-(organisation, type, day) counter.
    ///
    /// The first call for a key returns 1.
    fn allocate_reference_sequence(
        &self,
        organisation_id: Uuid,
        charge_type: ChargeType,
        day: NaiveDate,
    ) -> impl std::future::Future<Output = Result<u32, SettlementError>> + Send;

    /// Insert a payment and its items in one unit of work.
    fn insert_payment(
        &self,
        payment: &ChargesPayment,
    ) -> impl std::future::Future<Output = Result<ChargesPayment, SettlementError>> + Send;

    /// Find a payment with its items.
    fn find_payment(
        &self,
        organisation_id: Uuid,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ChargesPayment>, SettlementError>> + Send;

    /// Complete a payment, mark its charges PAID and apply the optional posting
    /// in one unit of work.
    ///
    /// Fails with `ConcurrentModification` if the payment is no longer PENDING
    /// and with `InvalidCharges` if any of its charges is no longer PENDING.
    fn approve_payment(
        &self,
        approval: &PaymentApproval,
    ) -> impl std::future::Future<Output = Result<ChargesPayment, SettlementError>> + Send;

    /// Fail a payment, move its PAID charges back to PENDING and apply the optional
    /// GL reversal in one unit of work.
    ///
    /// Fails with `ConcurrentModification` if the payment is no longer COMPLETED.
    fn reverse_payment(
        &self,
        reversal: &PaymentReversal,
    ) -> impl std::future::Future<Output = Result<ChargesPayment, SettlementError>> + Send;

    /// List one page of pending charges, newest first.
    fn list_pending_charges(
        &self,
        organisation_id: Uuid,
        filter: &PendingChargeFilter,
        page: PageRequest,
    ) -> impl std::future::Future<
        Output = Result<(Vec<TransactionCharge>, u64), SettlementError>,
    > + Send;

    /// List one page of payments, newest first.
    fn list_payments(
        &self,
        organisation_id: Uuid,
        filter: &ChargesPaymentFilter,
        page: PageRequest,
    ) -> impl std::future::Future<Output = Result<(Vec<ChargesPayment>, u64), SettlementError>>
    + Send;

    /// Load every pending charge of an organisation.
    fn pending_charges_for_stats(
        &self,
        organisation_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<TransactionCharge>, SettlementError>> + Send;

    /// Load every payment header of an organisation. Items may be omitted.
    fn payments_for_stats(
        &self,
        organisation_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ChargesPayment>, SettlementError>> + Send;
}
