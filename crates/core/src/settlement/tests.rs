//! Settlement workflow tests against the in-memory store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use remitgl_shared::types::PageRequest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use super::*;
use crate::ledger::{
    BoundEntity, GlAccount, GlAccountRegistry, GlAccountType, GlPoster, GlTransactionStatus,
    GlTransactionType, LedgerError, LedgerPolicy, NewGlAccount,
};
use crate::memory::MemoryLedgerStore;

struct Fixture {
    store: Arc<MemoryLedgerStore>,
    settlement: ChargesSettlement<MemoryLedgerStore>,
    registry: GlAccountRegistry<MemoryLedgerStore>,
    poster: GlPoster<MemoryLedgerStore>,
    org: Uuid,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryLedgerStore::new());
    let org = store.add_organisation("Acme Remit");
    let policy = LedgerPolicy::default();
    Fixture {
        settlement: ChargesSettlement::new(Arc::clone(&store), policy),
        registry: GlAccountRegistry::new(Arc::clone(&store), policy),
        poster: GlPoster::new(Arc::clone(&store), policy),
        store,
        org,
    }
}

impl Fixture {
    fn charge(&self, charge_type: ChargeType, internal: Decimal, charge_id: Uuid) -> Uuid {
        let charge = TransactionCharge {
            id: Uuid::new_v4(),
            organisation_id: self.org,
            transaction_id: Uuid::new_v4(),
            charge_id,
            charge_type,
            internal_amount: internal,
            external_amount: internal / dec!(2),
            currency_code: Some("USD".to_string()),
            status: ChargeStatus::Pending,
            description: Some(format!("{} charge", charge_type.as_str())),
            created_at: Utc::now(),
        };
        let id = charge.id;
        self.store.add_charge(charge);
        id
    }

    fn tax_charges(&self, amounts: &[Decimal]) -> Vec<Uuid> {
        let charge_id = Uuid::new_v4();
        amounts
            .iter()
            .map(|a| self.charge(ChargeType::Tax, *a, charge_id))
            .collect()
    }

    async fn create(&self, ids: Vec<Uuid>) -> Result<ChargesPayment, SettlementError> {
        self.settlement
            .create_charges_payment(CreateChargesPaymentInput {
                organisation_id: self.org,
                transaction_charge_ids: ids,
                destination_org_id: None,
                notes: None,
                created_by: None,
            })
            .await
    }

    async fn approve(
        &self,
        payment_id: Uuid,
        settlement_account_id: Option<Uuid>,
    ) -> Result<ChargesPayment, SettlementError> {
        self.settlement
            .approve_charges_payment(ApproveChargesPaymentInput {
                organisation_id: self.org,
                payment_id,
                notes: Some("Paid by wire".to_string()),
                settlement_account_id,
                approved_by: None,
            })
            .await
    }

    async fn reverse(
        &self,
        payment_id: Uuid,
        reason: &str,
    ) -> Result<ChargesPayment, SettlementError> {
        self.settlement
            .reverse_charges_payment(ReverseChargesPaymentInput {
                organisation_id: self.org,
                payment_id,
                reason: reason.to_string(),
                notes: None,
                reversed_by: None,
            })
            .await
    }

    async fn account(
        &self,
        name: &str,
        account_type: GlAccountType,
        entity: Option<BoundEntity>,
    ) -> GlAccount {
        self.registry
            .create_account(NewGlAccount {
                organisation_id: self.org,
                name: name.to_string(),
                account_type,
                currency_code: Some("USD".to_string()),
                bound_entity: entity,
                initial_balance: dec!(1000),
                min_balance: None,
                max_balance: None,
                opened_by: None,
            })
            .await
            .unwrap()
    }
}

fn today_prefix() -> String {
    format!("PAY-{}-TAX-ACM-", Utc::now().format("%Y%m%d"))
}

#[tokio::test]
async fn test_create_approve_reverse_lifecycle() {
    let fx = fixture();
    let ids = fx.tax_charges(&[dec!(10), dec!(20), dec!(30)]);

    let payment = fx.create(ids.clone()).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.charge_type, ChargeType::Tax);
    assert_eq!(payment.internal_total_amount, dec!(60));
    assert_eq!(payment.external_total_amount, dec!(30));
    assert_eq!(payment.items.len(), 3);
    assert_eq!(payment.reference_number, format!("{}001", today_prefix()));
    assert!(ids.iter().all(|id| fx.store.charge(*id).unwrap().status == ChargeStatus::Pending));

    let approved = fx.approve(payment.id, None).await.unwrap();
    assert_eq!(approved.status, PaymentStatus::Completed);
    assert!(approved.date_completed.is_some());
    assert_eq!(approved.notes.as_deref(), Some("Approved: Paid by wire"));
    assert!(approved.gl_transaction_id.is_none());
    assert!(ids.iter().all(|id| fx.store.charge(*id).unwrap().status == ChargeStatus::Paid));

    let reversed = fx.reverse(payment.id, "Bank returned funds").await.unwrap();
    assert_eq!(reversed.status, PaymentStatus::Failed);
    assert_eq!(
        reversed.notes.as_deref(),
        Some("Approved: Paid by wire\nReversed: Bank returned funds")
    );
    assert!(ids.iter().all(|id| fx.store.charge(*id).unwrap().status == ChargeStatus::Pending));
}

#[tokio::test]
async fn test_reference_sequence_increments_per_type() {
    let fx = fixture();
    for expected in ["001", "002", "003"] {
        let ids = fx.tax_charges(&[dec!(5)]);
        let payment = fx.create(ids).await.unwrap();
        assert_eq!(payment.reference_number, format!("{}{expected}", today_prefix()));
    }

    let commission = fx.charge(ChargeType::Commission, dec!(3), Uuid::new_v4());
    let payment = fx.create(vec![commission]).await.unwrap();
    assert!(payment.reference_number.ends_with("-COMMISSION-ACM-001"));
}

#[tokio::test]
async fn test_create_without_charges() {
    let fx = fixture();
    assert!(matches!(
        fx.create(Vec::new()).await,
        Err(SettlementError::NoChargesSelected)
    ));
}

#[tokio::test]
async fn test_create_with_unknown_or_paid_charges() {
    let fx = fixture();
    let ids = fx.tax_charges(&[dec!(10)]);
    let result = fx.create(vec![ids[0], Uuid::new_v4()]).await;
    assert!(matches!(
        result,
        Err(SettlementError::InvalidCharges { requested: 2, found: 1 })
    ));

    let payment = fx.create(ids.clone()).await.unwrap();
    fx.approve(payment.id, None).await.unwrap();
    assert!(matches!(
        fx.create(ids).await,
        Err(SettlementError::InvalidCharges { requested: 1, found: 0 })
    ));
}

#[tokio::test]
async fn test_create_with_foreign_charge() {
    let fx = fixture();
    let other_org = fx.store.add_organisation("Other");
    let foreign = TransactionCharge {
        id: Uuid::new_v4(),
        organisation_id: other_org,
        transaction_id: Uuid::new_v4(),
        charge_id: Uuid::new_v4(),
        charge_type: ChargeType::Tax,
        internal_amount: dec!(1),
        external_amount: Decimal::ZERO,
        currency_code: None,
        status: ChargeStatus::Pending,
        description: None,
        created_at: Utc::now(),
    };
    let foreign_id = foreign.id;
    fx.store.add_charge(foreign);

    assert!(matches!(
        fx.create(vec![foreign_id]).await,
        Err(SettlementError::InvalidCharges { .. })
    ));
}

#[tokio::test]
async fn test_create_with_mixed_types() {
    let fx = fixture();
    let tax = fx.charge(ChargeType::Tax, dec!(10), Uuid::new_v4());
    let fee = fx.charge(ChargeType::InternalFee, dec!(10), Uuid::new_v4());
    assert!(matches!(
        fx.create(vec![tax, fee]).await,
        Err(SettlementError::MixedChargeTypes)
    ));
}

#[tokio::test]
async fn test_create_for_unknown_organisation() {
    let fx = fixture();
    let orphan = TransactionCharge {
        id: Uuid::new_v4(),
        organisation_id: Uuid::new_v4(),
        transaction_id: Uuid::new_v4(),
        charge_id: Uuid::new_v4(),
        charge_type: ChargeType::Other,
        internal_amount: dec!(1),
        external_amount: dec!(1),
        currency_code: None,
        status: ChargeStatus::Pending,
        description: None,
        created_at: Utc::now(),
    };
    let (org, id) = (orphan.organisation_id, orphan.id);
    fx.store.add_charge(orphan);

    let result = fx
        .settlement
        .create_charges_payment(CreateChargesPaymentInput {
            organisation_id: org,
            transaction_charge_ids: vec![id],
            destination_org_id: None,
            notes: None,
            created_by: None,
        })
        .await;
    assert!(matches!(result, Err(SettlementError::OrganisationNotFound(_))));
}

#[tokio::test]
async fn test_invalid_transitions_do_not_mutate() {
    let fx = fixture();
    let ids = fx.tax_charges(&[dec!(10)]);
    let payment = fx.create(ids.clone()).await.unwrap();

    assert!(matches!(
        fx.reverse(payment.id, "too early").await,
        Err(SettlementError::InvalidTransition {
            from: PaymentStatus::Pending,
            to: PaymentStatus::Failed
        })
    ));
    assert_eq!(
        fx.settlement.get_charges_payment(fx.org, payment.id).await.unwrap(),
        payment
    );

    fx.approve(payment.id, None).await.unwrap();
    let completed = fx.settlement.get_charges_payment(fx.org, payment.id).await.unwrap();
    assert!(matches!(
        fx.approve(payment.id, None).await,
        Err(SettlementError::InvalidTransition {
            from: PaymentStatus::Completed,
            ..
        })
    ));
    assert_eq!(
        fx.settlement.get_charges_payment(fx.org, payment.id).await.unwrap(),
        completed
    );

    fx.reverse(payment.id, "returned").await.unwrap();
    assert!(fx.approve(payment.id, None).await.is_err());
    assert!(fx.reverse(payment.id, "again").await.is_err());
    assert_eq!(fx.store.charge(ids[0]).unwrap().status, ChargeStatus::Pending);
}

#[tokio::test]
async fn test_reverse_requires_reason() {
    let fx = fixture();
    let payment = fx.create(fx.tax_charges(&[dec!(1)])).await.unwrap();
    fx.approve(payment.id, None).await.unwrap();
    assert!(matches!(
        fx.reverse(payment.id, "   ").await,
        Err(SettlementError::ReasonRequired)
    ));
}

#[tokio::test]
async fn test_missing_payment() {
    let fx = fixture();
    assert!(matches!(
        fx.approve(Uuid::new_v4(), None).await,
        Err(SettlementError::PaymentNotFound(_))
    ));
    assert!(matches!(
        fx.reverse(Uuid::new_v4(), "").await,
        Err(SettlementError::PaymentNotFound(_))
    ));
}

#[tokio::test]
async fn test_charge_settles_in_one_batch_only() {
    let fx = fixture();
    let ids = fx.tax_charges(&[dec!(10)]);
    let first = fx.create(ids.clone()).await.unwrap();
    let second = fx.create(ids.clone()).await.unwrap();

    fx.approve(first.id, None).await.unwrap();
    assert!(matches!(
        fx.approve(second.id, None).await,
        Err(SettlementError::InvalidCharges {
            requested: 1,
            found: 0
        })
    ));
    let second = fx.settlement.get_charges_payment(fx.org, second.id).await.unwrap();
    assert_eq!(second.status, PaymentStatus::Pending);

    fx.reverse(first.id, "returned").await.unwrap();
    assert_eq!(fx.store.charge(ids[0]).unwrap().status, ChargeStatus::Pending);

    // Once released, the charge can be settled by the other batch.
    let approved = fx.approve(second.id, None).await.unwrap();
    assert_eq!(approved.status, PaymentStatus::Completed);
    assert_eq!(fx.store.charge(ids[0]).unwrap().status, ChargeStatus::Paid);
}

#[tokio::test]
async fn test_approval_into_foreign_settlement_account_fails() {
    let fx = fixture();
    let charge_id = Uuid::new_v4();
    let id = fx.charge(ChargeType::Tax, dec!(10), charge_id);
    fx.account("Charge - Tax", GlAccountType::Revenue, Some(BoundEntity::Charge(charge_id)))
        .await;
    let other_org = fx.store.add_organisation("Other Remit");
    let foreign_bank = fx
        .registry
        .create_account(NewGlAccount {
            organisation_id: other_org,
            name: "Bank".to_string(),
            account_type: GlAccountType::Asset,
            currency_code: Some("USD".to_string()),
            bound_entity: None,
            initial_balance: dec!(1000),
            min_balance: None,
            max_balance: None,
            opened_by: None,
        })
        .await
        .unwrap();

    let payment = fx.create(vec![id]).await.unwrap();
    assert!(matches!(
        fx.approve(payment.id, Some(foreign_bank.id)).await,
        Err(SettlementError::Ledger(LedgerError::AccountNotFound(_)))
    ));
    assert_eq!(fx.store.account(foreign_bank.id).unwrap().balance, dec!(1000));
    assert_eq!(fx.store.charge(id).unwrap().status, ChargeStatus::Pending);
}

#[tokio::test]
async fn test_approval_posts_and_reversal_restores_ledger() {
    let fx = fixture();
    let charge_id = Uuid::new_v4();
    let ids: Vec<Uuid> = [dec!(10), dec!(20), dec!(30)]
        .iter()
        .map(|a| fx.charge(ChargeType::Tax, *a, charge_id))
        .collect();
    let revenue = fx
        .account("Charge - Tax", GlAccountType::Revenue, Some(BoundEntity::Charge(charge_id)))
        .await;
    let bank = fx.account("Bank Account - Settlement", GlAccountType::Asset, None).await;

    let payment = fx.create(ids).await.unwrap();
    let approved = fx.approve(payment.id, Some(bank.id)).await.unwrap();

    let gl_id = approved.gl_transaction_id.unwrap();
    let posted = fx.poster.get_transaction(fx.org, gl_id).await.unwrap();
    assert_eq!(posted.transaction_type, GlTransactionType::ChargesPayment);
    assert_eq!(posted.amount, dec!(60));
    assert_eq!(fx.store.account(revenue.id).unwrap().balance, dec!(940));
    assert_eq!(fx.store.account(bank.id).unwrap().balance, dec!(940));

    fx.reverse(payment.id, "Wire bounced").await.unwrap();
    let original = fx.poster.get_transaction(fx.org, gl_id).await.unwrap();
    assert_eq!(original.status, GlTransactionStatus::Reversed);
    assert_eq!(fx.store.account(revenue.id).unwrap().balance, dec!(1000));
    assert_eq!(fx.store.account(bank.id).unwrap().balance, dec!(1000));
}

#[tokio::test]
async fn test_approval_without_charge_account_writes_nothing() {
    let fx = fixture();
    let ids = fx.tax_charges(&[dec!(10)]);
    let bank = fx.account("Bank", GlAccountType::Asset, None).await;
    let payment = fx.create(ids.clone()).await.unwrap();

    assert!(matches!(
        fx.approve(payment.id, Some(bank.id)).await,
        Err(SettlementError::ChargeAccountMissing(_))
    ));
    let unchanged = fx.settlement.get_charges_payment(fx.org, payment.id).await.unwrap();
    assert_eq!(unchanged.status, PaymentStatus::Pending);
    assert_eq!(fx.store.charge(ids[0]).unwrap().status, ChargeStatus::Pending);
    assert_eq!(fx.store.transaction_count(), 0);
}

#[tokio::test]
async fn test_approval_into_closed_settlement_account_fails() {
    let fx = fixture();
    let charge_id = Uuid::new_v4();
    let id = fx.charge(ChargeType::Tax, dec!(10), charge_id);
    fx.account("Charge - Tax", GlAccountType::Revenue, Some(BoundEntity::Charge(charge_id)))
        .await;
    let bank = fx.account("Bank", GlAccountType::Asset, None).await;
    fx.registry
        .update_account(
            bank.id,
            crate::ledger::GlAccountChanges {
                close_reason: Some(Some("Closed".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let payment = fx.create(vec![id]).await.unwrap();
    assert!(matches!(
        fx.approve(payment.id, Some(bank.id)).await,
        Err(SettlementError::Ledger(LedgerError::AccountNotOpen { .. }))
    ));
    assert_eq!(fx.store.charge(id).unwrap().status, ChargeStatus::Pending);
}

#[tokio::test]
async fn test_reversal_skips_already_reversed_posting() {
    let fx = fixture();
    let charge_id = Uuid::new_v4();
    let id = fx.charge(ChargeType::Tax, dec!(25), charge_id);
    let revenue = fx
        .account("Charge - Tax", GlAccountType::Revenue, Some(BoundEntity::Charge(charge_id)))
        .await;
    let bank = fx.account("Bank", GlAccountType::Asset, None).await;

    let payment = fx.create(vec![id]).await.unwrap();
    let approved = fx.approve(payment.id, Some(bank.id)).await.unwrap();
    fx.poster
        .reverse_transaction(fx.org, approved.gl_transaction_id.unwrap(), "manual fix", None)
        .await
        .unwrap();

    let reversed = fx.reverse(payment.id, "returned").await.unwrap();
    assert_eq!(reversed.status, PaymentStatus::Failed);
    assert_eq!(fx.store.account(revenue.id).unwrap().balance, dec!(1000));
    assert_eq!(fx.store.transaction_count(), 2);
}

#[tokio::test]
async fn test_pending_listing_and_stats() {
    let fx = fixture();
    let tax = fx.tax_charges(&[dec!(10), dec!(20)]);
    fx.charge(ChargeType::Commission, dec!(7), Uuid::new_v4());
    let payment = fx.create(vec![tax[0]]).await.unwrap();
    fx.approve(payment.id, None).await.unwrap();

    let pending = fx
        .settlement
        .get_pending_transaction_charges(
            fx.org,
            &PendingChargeFilter::default(),
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(pending.pagination.total, 2);

    let filtered = fx
        .settlement
        .get_pending_transaction_charges(
            fx.org,
            &PendingChargeFilter {
                charge_type: Some(ChargeType::Tax),
                from: Some(Utc::now() - Duration::hours(1)),
                ..PendingChargeFilter::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(filtered.items.len(), 1);
    assert_eq!(filtered.items[0].id, tax[1]);

    let stats = fx.settlement.get_pending_charges_stats(fx.org).await.unwrap();
    assert_eq!(stats.total_pending, 2);
    assert_eq!(stats.internal_total, dec!(27));
    assert_eq!(stats.by_type["TAX"].count, 1);

    let payments = fx.settlement.get_charges_payment_stats(fx.org).await.unwrap();
    assert_eq!(payments.total_payments, 1);
    assert_eq!(payments.by_status["COMPLETED"].internal_total, dec!(10));

    let listed = fx
        .settlement
        .get_charges_payments(
            fx.org,
            &ChargesPaymentFilter {
                status: Some(PaymentStatus::Completed),
                ..ChargesPaymentFilter::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(listed.items.len(), 1);
}
