//! Conversions between `SeaORM` models and domain types.

use chrono::{DateTime, Utc};
use remitgl_core::ledger::{
    BoundEntity, DrCr as CoreDrCr, GlAccount, GlAccountType as CoreAccountType, GlEntry,
    GlTransaction, GlTransactionStatus as CoreTxStatus, GlTransactionType as CoreTxType,
    LedgerError, PostingContext,
};
use remitgl_core::settlement::{
    ChargeStatus as CoreChargeStatus, ChargeType as CoreChargeType, ChargesPayment,
    ChargesPaymentItem, PaymentStatus as CorePaymentStatus, SettlementError, TransactionCharge,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{DbErr, Set};

use crate::entities::sea_orm_active_enums::{
    ChargeStatus, ChargeType, DrCr, GlAccountType, GlTransactionStatus, GlTransactionType,
    PaymentStatus,
};
use crate::entities::{
    charges_payment_items, charges_payments, gl_accounts, gl_entries, gl_transactions,
    transaction_charges,
};

pub(crate) fn ledger_err(err: DbErr) -> LedgerError {
    LedgerError::storage(err.to_string())
}

pub(crate) fn settlement_err(err: DbErr) -> SettlementError {
    SettlementError::storage(err.to_string())
}

pub(crate) fn to_utc(at: DateTimeWithTimeZone) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

pub(crate) fn to_db_time(at: DateTime<Utc>) -> DateTimeWithTimeZone {
    at.fixed_offset()
}

/// Mirrors a domain enum onto its stored counterpart in both directions.
macro_rules! mirror_enum {
    ($stored:ident <=> $domain:ident { $($variant:ident),+ $(,)? }) => {
        impl From<$domain> for $stored {
            fn from(value: $domain) -> Self {
                match value {
                    $($domain::$variant => Self::$variant),+
                }
            }
        }

        impl From<$stored> for $domain {
            fn from(value: $stored) -> Self {
                match value {
                    $($stored::$variant => Self::$variant),+
                }
            }
        }
    };
}

mirror_enum!(GlAccountType <=> CoreAccountType { Asset, Liability, Equity, Revenue, Expense });
mirror_enum!(DrCr <=> CoreDrCr { Debit, Credit });
mirror_enum!(GlTransactionType <=> CoreTxType {
    Deposit,
    Withdrawal,
    Transfer,
    Remittance,
    ChargesPayment,
    Adjustment,
    Reversal,
});
mirror_enum!(GlTransactionStatus <=> CoreTxStatus { Posted, Reversed });
mirror_enum!(ChargeType <=> CoreChargeType { Commission, Tax, InternalFee, Other });
mirror_enum!(ChargeStatus <=> CoreChargeStatus { Pending, Paid });
mirror_enum!(PaymentStatus <=> CorePaymentStatus { Pending, Completed, Failed });

// ========== GL accounts ==========

fn bound_entity(model: &gl_accounts::Model) -> Option<BoundEntity> {
    model
        .bank_account_id
        .map(BoundEntity::BankAccount)
        .or(model.till_id.map(BoundEntity::Till))
        .or(model.vault_id.map(BoundEntity::Vault))
        .or(model.charge_id.map(BoundEntity::Charge))
        .or(model.org_balance_id.map(BoundEntity::OrgBalance))
}

impl From<gl_accounts::Model> for GlAccount {
    fn from(model: gl_accounts::Model) -> Self {
        let bound_entity = bound_entity(&model);
        Self {
            id: model.id,
            organisation_id: model.organisation_id,
            name: model.name,
            account_type: model.account_type.into(),
            balance: model.balance,
            locked_balance: model.locked_balance,
            min_balance: model.min_balance,
            max_balance: model.max_balance,
            currency_code: model.currency_code,
            bound_entity,
            opened_at: to_utc(model.opened_at),
            opened_by: model.opened_by,
            closed_at: model.closed_at.map(to_utc),
            close_reason: model.close_reason,
            frozen_at: model.frozen_at.map(to_utc),
            frozen_reason: model.frozen_reason,
            updated_at: to_utc(model.updated_at),
        }
    }
}

/// Full active model for an insert.
pub(crate) fn account_active_model(account: &GlAccount) -> gl_accounts::ActiveModel {
    let entity_column = |kind: fn(&BoundEntity) -> Option<uuid::Uuid>| {
        Set(account.bound_entity.as_ref().and_then(kind))
    };

    gl_accounts::ActiveModel {
        id: Set(account.id),
        organisation_id: Set(account.organisation_id),
        balance: Set(account.balance),
        opened_at: Set(to_db_time(account.opened_at)),
        opened_by: Set(account.opened_by),
        bank_account_id: entity_column(|e| match e {
            BoundEntity::BankAccount(id) => Some(*id),
            _ => None,
        }),
        till_id: entity_column(|e| match e {
            BoundEntity::Till(id) => Some(*id),
            _ => None,
        }),
        vault_id: entity_column(|e| match e {
            BoundEntity::Vault(id) => Some(*id),
            _ => None,
        }),
        charge_id: entity_column(|e| match e {
            BoundEntity::Charge(id) => Some(*id),
            _ => None,
        }),
        org_balance_id: entity_column(|e| match e {
            BoundEntity::OrgBalance(id) => Some(*id),
            _ => None,
        }),
        ..account_metadata(account)
    }
}

/// Active model carrying only the columns an update may change.
///
/// `balance` stays unset so it is only ever moved by postings.
pub(crate) fn account_metadata(account: &GlAccount) -> gl_accounts::ActiveModel {
    gl_accounts::ActiveModel {
        id: Set(account.id),
        name: Set(account.name.clone()),
        account_type: Set(account.account_type.into()),
        locked_balance: Set(account.locked_balance),
        min_balance: Set(account.min_balance),
        max_balance: Set(account.max_balance),
        currency_code: Set(account.currency_code.clone()),
        closed_at: Set(account.closed_at.map(to_db_time)),
        close_reason: Set(account.close_reason.clone()),
        frozen_at: Set(account.frozen_at.map(to_db_time)),
        frozen_reason: Set(account.frozen_reason.clone()),
        updated_at: Set(to_db_time(account.updated_at)),
        ..Default::default()
    }
}

// ========== GL transactions ==========

pub(crate) fn transaction_from_models(
    model: gl_transactions::Model,
    entries: Vec<gl_entries::Model>,
) -> GlTransaction {
    GlTransaction {
        id: model.id,
        organisation_id: model.organisation_id,
        transaction_type: model.transaction_type.into(),
        amount: model.amount,
        currency_code: model.currency_code,
        description: model.description,
        status: model.status.into(),
        context: PostingContext {
            vault_id: model.vault_id,
            till_id: model.till_id,
            customer_id: model.customer_id,
            transaction_id: model.transaction_id,
        },
        reversal_of: model.reversal_of,
        reversed_by: model.reversed_by,
        reversal_reason: model.reversal_reason,
        reversed_at: model.reversed_at.map(to_utc),
        created_by: model.created_by,
        created_at: to_utc(model.created_at),
        entries: entries.into_iter().map(GlEntry::from).collect(),
    }
}

impl From<gl_entries::Model> for GlEntry {
    fn from(model: gl_entries::Model) -> Self {
        Self {
            id: model.id,
            gl_transaction_id: model.gl_transaction_id,
            gl_account_id: model.gl_account_id,
            amount: model.amount,
            dr_cr: model.dr_cr.into(),
            description: model.description,
            created_at: to_utc(model.created_at),
        }
    }
}

pub(crate) fn transaction_active_model(tx: &GlTransaction) -> gl_transactions::ActiveModel {
    gl_transactions::ActiveModel {
        id: Set(tx.id),
        organisation_id: Set(tx.organisation_id),
        transaction_type: Set(tx.transaction_type.into()),
        amount: Set(tx.amount),
        currency_code: Set(tx.currency_code.clone()),
        description: Set(tx.description.clone()),
        status: Set(tx.status.into()),
        vault_id: Set(tx.context.vault_id),
        till_id: Set(tx.context.till_id),
        customer_id: Set(tx.context.customer_id),
        transaction_id: Set(tx.context.transaction_id),
        reversal_of: Set(tx.reversal_of),
        reversed_by: Set(tx.reversed_by),
        reversal_reason: Set(tx.reversal_reason.clone()),
        reversed_at: Set(tx.reversed_at.map(to_db_time)),
        created_by: Set(tx.created_by),
        created_at: Set(to_db_time(tx.created_at)),
    }
}

pub(crate) fn entry_active_model(entry: &GlEntry) -> gl_entries::ActiveModel {
    gl_entries::ActiveModel {
        id: Set(entry.id),
        gl_transaction_id: Set(entry.gl_transaction_id),
        gl_account_id: Set(entry.gl_account_id),
        amount: Set(entry.amount),
        dr_cr: Set(entry.dr_cr.into()),
        description: Set(entry.description.clone()),
        created_at: Set(to_db_time(entry.created_at)),
    }
}

// ========== Settlement ==========

pub(crate) fn charge_from_model(
    model: transaction_charges::Model,
    currency_code: Option<String>,
) -> TransactionCharge {
    TransactionCharge {
        id: model.id,
        organisation_id: model.organisation_id,
        transaction_id: model.transaction_id,
        charge_id: model.charge_id,
        charge_type: model.charge_type.into(),
        internal_amount: model.internal_amount,
        external_amount: model.external_amount,
        currency_code,
        status: model.status.into(),
        description: model.description,
        created_at: to_utc(model.created_at),
    }
}

pub(crate) fn payment_from_models(
    model: charges_payments::Model,
    items: Vec<charges_payment_items::Model>,
) -> ChargesPayment {
    ChargesPayment {
        id: model.id,
        organisation_id: model.organisation_id,
        charge_type: model.charge_type.into(),
        reference_number: model.reference_number,
        internal_total_amount: model.internal_total_amount,
        external_total_amount: model.external_total_amount,
        currency_code: model.currency_code,
        destination_org_id: model.destination_org_id,
        status: model.status.into(),
        notes: model.notes,
        created_by: model.created_by,
        created_at: to_utc(model.created_at),
        date_completed: model.date_completed.map(to_utc),
        gl_transaction_id: model.gl_transaction_id,
        items: items
            .into_iter()
            .map(|item| ChargesPaymentItem {
                id: item.id,
                charges_payment_id: item.charges_payment_id,
                transaction_charge_id: item.transaction_charge_id,
                internal_amount: item.internal_amount,
                external_amount: item.external_amount,
            })
            .collect(),
    }
}

pub(crate) fn payment_active_model(payment: &ChargesPayment) -> charges_payments::ActiveModel {
    charges_payments::ActiveModel {
        id: Set(payment.id),
        organisation_id: Set(payment.organisation_id),
        charge_type: Set(payment.charge_type.into()),
        reference_number: Set(payment.reference_number.clone()),
        internal_total_amount: Set(payment.internal_total_amount),
        external_total_amount: Set(payment.external_total_amount),
        currency_code: Set(payment.currency_code.clone()),
        destination_org_id: Set(payment.destination_org_id),
        status: Set(payment.status.into()),
        notes: Set(payment.notes.clone()),
        created_by: Set(payment.created_by),
        created_at: Set(to_db_time(payment.created_at)),
        date_completed: Set(payment.date_completed.map(to_db_time)),
        gl_transaction_id: Set(payment.gl_transaction_id),
    }
}

pub(crate) fn item_active_model(item: &ChargesPaymentItem) -> charges_payment_items::ActiveModel {
    charges_payment_items::ActiveModel {
        id: Set(item.id),
        charges_payment_id: Set(item.charges_payment_id),
        transaction_charge_id: Set(item.transaction_charge_id),
        internal_amount: Set(item.internal_amount),
        external_amount: Set(item.external_amount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn model() -> gl_accounts::Model {
        let now = Utc::now().fixed_offset();
        gl_accounts::Model {
            id: Uuid::new_v4(),
            organisation_id: Uuid::new_v4(),
            name: "Till - Front".to_string(),
            account_type: GlAccountType::Asset,
            balance: dec!(12.5),
            locked_balance: dec!(2),
            min_balance: None,
            max_balance: Some(dec!(100)),
            currency_code: Some("USD".to_string()),
            bank_account_id: None,
            till_id: None,
            vault_id: None,
            charge_id: None,
            org_balance_id: None,
            opened_at: now,
            opened_by: None,
            closed_at: None,
            close_reason: None,
            frozen_at: None,
            frozen_reason: None,
            updated_at: now,
        }
    }

    #[test]
    fn test_account_without_entity() {
        let account = GlAccount::from(model());
        assert!(account.bound_entity.is_none());
        assert_eq!(account.account_type, CoreAccountType::Asset);
        assert_eq!(account.available_balance(), dec!(10.5));
    }

    #[rstest]
    #[case(BoundEntity::BankAccount(Uuid::new_v4()))]
    #[case(BoundEntity::Till(Uuid::new_v4()))]
    #[case(BoundEntity::Vault(Uuid::new_v4()))]
    #[case(BoundEntity::Charge(Uuid::new_v4()))]
    #[case(BoundEntity::OrgBalance(Uuid::new_v4()))]
    fn test_bound_entity_uses_one_column(#[case] entity: BoundEntity) {
        let mut account = GlAccount::from(model());
        account.bound_entity = Some(entity);

        let active = account_active_model(&account);
        let set: Vec<Uuid> = [
            active.bank_account_id,
            active.till_id,
            active.vault_id,
            active.charge_id,
            active.org_balance_id,
        ]
        .into_iter()
        .filter_map(|v| v.unwrap())
        .collect();
        assert_eq!(set, vec![entity.id()]);

        let mut stored = model();
        match entity {
            BoundEntity::BankAccount(id) => stored.bank_account_id = Some(id),
            BoundEntity::Till(id) => stored.till_id = Some(id),
            BoundEntity::Vault(id) => stored.vault_id = Some(id),
            BoundEntity::Charge(id) => stored.charge_id = Some(id),
            BoundEntity::OrgBalance(id) => stored.org_balance_id = Some(id),
        }
        assert_eq!(GlAccount::from(stored).bound_entity, Some(entity));
    }

    #[test]
    fn test_metadata_never_sets_balance() {
        let account = GlAccount::from(model());
        assert!(account_metadata(&account).balance.is_not_set());
        assert!(account_active_model(&account).balance.is_set());
    }

    #[test]
    fn test_enum_mirrors() {
        for t in CoreTxType::ALL {
            assert_eq!(CoreTxType::from(GlTransactionType::from(t)), t);
        }
        for t in CoreChargeType::ALL {
            assert_eq!(CoreChargeType::from(ChargeType::from(t)), t);
        }
        assert_eq!(PaymentStatus::from(CorePaymentStatus::Failed), PaymentStatus::Failed);
    }
}
