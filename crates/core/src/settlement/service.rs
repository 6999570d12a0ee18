//! Charges payment settlement service.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use remitgl_shared::types::{PageRequest, PageResponse};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::SettlementError;
use super::reference::reference_number;
use super::repository::SettlementRepository;
use super::types::{
    ApproveChargesPaymentInput, ChargesPayment, ChargesPaymentFilter, ChargesPaymentItem,
    CreateChargesPaymentInput, PaymentApproval, PaymentReversal, PaymentStatus,
    PendingChargeFilter, ReverseChargesPaymentInput, TransactionCharge,
};
use super::workflow::{PaymentWorkflow, append_note, approval_note, reversal_note};
use crate::ledger::{
    BoundEntity, DrCr, EntryInput, GlAccountRepository, GlPoster, GlTransactionRepository,
    GlTransactionStatus, GlTransactionType, LedgerPolicy, PostTransactionInput,
    PostingContext, PreparedPosting,
};
use crate::stats::{PaymentStats, PendingChargeStats, payment_stats, pending_charge_stats};

/// Service batching pending charges into payments and settling them.
pub struct ChargesSettlement<R> {
    repo: Arc<R>,
    poster: GlPoster<R>,
}

impl<R> ChargesSettlement<R>
where
    R: SettlementRepository + GlAccountRepository + GlTransactionRepository,
{
    /// Create a new settlement service.
    #[must_use]
    pub fn new(repo: Arc<R>, policy: LedgerPolicy) -> Self {
        let poster = GlPoster::new(Arc::clone(&repo), policy);
        Self { repo, poster }
    }

    /// Batch pending charges into a new PENDING payment.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - no charge IDs are given
    /// - any ID is unknown, foreign or not pending
    /// - the charges do not share one type
    /// - the organisation does not exist
    pub async fn create_charges_payment(
        &self,
        input: CreateChargesPaymentInput,
    ) -> Result<ChargesPayment, SettlementError> {
        let ids = &input.transaction_charge_ids;
        if ids.is_empty() {
            return Err(SettlementError::NoChargesSelected);
        }

        let charges = self
            .repo
            .find_pending_charges(input.organisation_id, ids)
            .await?;
        if charges.len() != ids.len() {
            return Err(SettlementError::InvalidCharges {
                requested: ids.len(),
                found: charges.len(),
            });
        }

        let charge_type = charges[0].charge_type;
        if charges.iter().any(|c| c.charge_type != charge_type) {
            return Err(SettlementError::MixedChargeTypes);
        }

        let currency_code = charges
            .iter()
            .find(|c| c.id == ids[0])
            .unwrap_or(&charges[0])
            .currency_code
            .clone();

        let internal_total_amount: Decimal = charges.iter().map(|c| c.internal_amount).sum();
        let external_total_amount: Decimal = charges.iter().map(|c| c.external_amount).sum();

        let org_name = self
            .repo
            .organisation_name(input.organisation_id)
            .await?
            .ok_or(SettlementError::OrganisationNotFound(input.organisation_id))?;

        let now = Utc::now();
        let sequence = self
            .repo
            .allocate_reference_sequence(input.organisation_id, charge_type, now.date_naive())
            .await?;

        let payment_id = Uuid::new_v4();
        let items = charges
            .iter()
            .map(|c| ChargesPaymentItem {
                id: Uuid::new_v4(),
                charges_payment_id: payment_id,
                transaction_charge_id: c.id,
                internal_amount: c.internal_amount,
                external_amount: c.external_amount,
            })
            .collect();

        let payment = ChargesPayment {
            id: payment_id,
            organisation_id: input.organisation_id,
            charge_type,
            reference_number: reference_number(now.date_naive(), charge_type, &org_name, sequence),
            internal_total_amount,
            external_total_amount,
            currency_code,
            destination_org_id: input.destination_org_id,
            status: PaymentStatus::Pending,
            notes: input
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            created_by: input.created_by,
            created_at: now,
            date_completed: None,
            gl_transaction_id: None,
            items,
        };

        let payment = self.repo.insert_payment(&payment).await?;
        info!(
            payment_id = %payment.id,
            org_id = %payment.organisation_id,
            reference = %payment.reference_number,
            items = payment.items.len(),
            "Charges payment created"
        );
        Ok(payment)
    }

    /// Approve a PENDING payment: COMPLETED, charges PAID, optional GL posting.
    ///
    /// # Errors
    ///
    /// Returns `PaymentNotFound` if missing and `InvalidTransition` unless PENDING.
    /// With a settlement account, ledger errors from the posting are returned
    /// and nothing is written.
    pub async fn approve_charges_payment(
        &self,
        input: ApproveChargesPaymentInput,
    ) -> Result<ChargesPayment, SettlementError> {
        let payment = self
            .get_charges_payment(input.organisation_id, input.payment_id)
            .await?;
        PaymentWorkflow::approve(payment.status)?;

        let now = Utc::now();
        let posting = match input.settlement_account_id {
            Some(account_id) => {
                self.settlement_posting(&payment, account_id, input.approved_by, now)
                    .await?
            }
            None => None,
        };

        let approval = PaymentApproval {
            payment_id: payment.id,
            date_completed: now,
            notes: append_note(
                payment.notes.as_deref(),
                &approval_note(input.notes.as_deref(), now),
            ),
            transaction_charge_ids: charge_ids(&payment),
            posting,
        };

        let approved = self.repo.approve_payment(&approval).await?;
        info!(
            payment_id = %approved.id,
            org_id = %approved.organisation_id,
            gl_transaction_id = ?approved.gl_transaction_id,
            "Charges payment approved"
        );
        Ok(approved)
    }

    /// Reverse a COMPLETED payment: FAILED, charges back to PENDING, GL posting reversed.
    ///
    /// # Errors
    ///
    /// Returns `PaymentNotFound` if missing, `ReasonRequired` for a blank reason
    /// and `InvalidTransition` unless COMPLETED.
    pub async fn reverse_charges_payment(
        &self,
        input: ReverseChargesPaymentInput,
    ) -> Result<ChargesPayment, SettlementError> {
        let payment = self
            .get_charges_payment(input.organisation_id, input.payment_id)
            .await?;
        let reason = input.reason.trim();
        if reason.is_empty() {
            return Err(SettlementError::ReasonRequired);
        }
        PaymentWorkflow::reverse(payment.status)?;

        let gl_reversal = match payment.gl_transaction_id {
            Some(gl_id) => {
                let original = self
                    .poster
                    .get_transaction(payment.organisation_id, gl_id)
                    .await?;
                if original.status == GlTransactionStatus::Reversed {
                    warn!(
                        payment_id = %payment.id,
                        gl_transaction_id = %gl_id,
                        "Settlement posting already reversed"
                    );
                    None
                } else {
                    Some(
                        self.poster
                            .prepare_reversal(&original, reason, input.reversed_by, Utc::now())
                            .await?,
                    )
                }
            }
            None => None,
        };

        let reversal = PaymentReversal {
            payment_id: payment.id,
            notes: append_note(
                payment.notes.as_deref(),
                &reversal_note(reason, input.notes.as_deref()),
            ),
            transaction_charge_ids: charge_ids(&payment),
            gl_reversal,
        };

        let reversed = self.repo.reverse_payment(&reversal).await?;
        info!(
            payment_id = %reversed.id,
            org_id = %reversed.organisation_id,
            reason = %reason,
            "Charges payment reversed"
        );
        Ok(reversed)
    }

    /// Fetch one payment with its items.
    ///
    /// # Errors
    ///
    /// Returns `PaymentNotFound` if it does not exist in the organisation.
    pub async fn get_charges_payment(
        &self,
        organisation_id: Uuid,
        payment_id: Uuid,
    ) -> Result<ChargesPayment, SettlementError> {
        self.repo
            .find_payment(organisation_id, payment_id)
            .await?
            .ok_or(SettlementError::PaymentNotFound(payment_id))
    }

    /// List payments matching a filter.
    pub async fn get_charges_payments(
        &self,
        organisation_id: Uuid,
        filter: &ChargesPaymentFilter,
        page: PageRequest,
    ) -> Result<PageResponse<ChargesPayment>, SettlementError> {
        let page = page.normalized();
        let (items, total) = self.repo.list_payments(organisation_id, filter, page).await?;
        Ok(PageResponse::new(items, page, total))
    }

    /// List pending charges matching a filter.
    pub async fn get_pending_transaction_charges(
        &self,
        organisation_id: Uuid,
        filter: &PendingChargeFilter,
        page: PageRequest,
    ) -> Result<PageResponse<TransactionCharge>, SettlementError> {
        let page = page.normalized();
        let (items, total) = self
            .repo
            .list_pending_charges(organisation_id, filter, page)
            .await?;
        Ok(PageResponse::new(items, page, total))
    }

    /// Aggregate pending charges.
    pub async fn get_pending_charges_stats(
        &self,
        organisation_id: Uuid,
    ) -> Result<PendingChargeStats, SettlementError> {
        let charges = self.repo.pending_charges_for_stats(organisation_id).await?;
        Ok(pending_charge_stats(&charges))
    }

    /// Aggregate payments.
    pub async fn get_charges_payment_stats(
        &self,
        organisation_id: Uuid,
    ) -> Result<PaymentStats, SettlementError> {
        let payments = self.repo.payments_for_stats(organisation_id).await?;
        Ok(payment_stats(&payments))
    }

    /// Debit each charge's GL account by its settled internal amount and credit
    /// the settlement account by the total. Returns `None` when nothing is owed.
    async fn settlement_posting(
        &self,
        payment: &ChargesPayment,
        settlement_account_id: Uuid,
        approved_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Option<PreparedPosting>, SettlementError> {
        let ids = charge_ids(payment);
        let charges: HashMap<Uuid, TransactionCharge> = self
            .repo
            .find_charges(payment.organisation_id, &ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let mut entries = Vec::with_capacity(payment.items.len() + 1);
        let mut total = Decimal::ZERO;

        for item in payment.items.iter().filter(|i| i.internal_amount > Decimal::ZERO) {
            let charge = charges
                .get(&item.transaction_charge_id)
                .ok_or(SettlementError::InvalidCharges {
                    requested: ids.len(),
                    found: charges.len(),
                })?;
            let account = self
                .repo
                .find_account_by_entity(
                    payment.organisation_id,
                    BoundEntity::Charge(charge.charge_id),
                )
                .await?
                .ok_or(SettlementError::ChargeAccountMissing(charge.charge_id))?;

            entries.push(EntryInput {
                account_id: account.id,
                amount: item.internal_amount,
                dr_cr: DrCr::Debit,
                description: Some(format!("Charge settlement {}", charge.id)),
            });
            total += item.internal_amount;
        }

        if total == Decimal::ZERO {
            return Ok(None);
        }

        entries.push(EntryInput {
            account_id: settlement_account_id,
            amount: total,
            dr_cr: DrCr::Credit,
            description: Some(format!("Settlement of {}", payment.reference_number)),
        });

        let posting = self
            .poster
            .prepare_posting(
                PostTransactionInput {
                    organisation_id: payment.organisation_id,
                    transaction_type: GlTransactionType::ChargesPayment,
                    amount: Some(total),
                    currency_code: payment.currency_code.clone(),
                    description: format!("Charges payment {}", payment.reference_number),
                    entries,
                    context: PostingContext::default(),
                    created_by: approved_by,
                },
                now,
            )
            .await?;

        Ok(Some(posting))
    }
}

fn charge_ids(payment: &ChargesPayment) -> Vec<Uuid> {
    payment.items.iter().map(|i| i.transaction_charge_id).collect()
}
