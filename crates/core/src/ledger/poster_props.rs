//! Property-based tests for posting and reversal against the in-memory store.

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::*;
use crate::memory::MemoryLedgerStore;

fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn account_type() -> impl Strategy<Value = GlAccountType> {
    prop::sample::select(GlAccountType::ALL.to_vec())
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

async fn open_account(
    registry: &GlAccountRegistry<MemoryLedgerStore>,
    org: Uuid,
    account_type: GlAccountType,
    balance: Decimal,
) -> GlAccount {
    registry
        .create_account(NewGlAccount {
            organisation_id: org,
            name: format!("{account_type} account"),
            account_type,
            currency_code: None,
            bound_entity: None,
            initial_balance: balance,
            min_balance: None,
            max_balance: None,
            opened_by: None,
        })
        .await
        .expect("create account")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Posting then reversing leaves every balance where it started.
    #[test]
    fn prop_reversal_nets_to_zero(
        debit_types in prop::collection::vec(account_type(), 1..4),
        credit_type in account_type(),
        amounts in prop::collection::vec(amount(), 4),
        opening in amount(),
    ) {
        runtime().block_on(async {
            let store = Arc::new(MemoryLedgerStore::new());
            let org = store.add_organisation("Prop Remit");
            let policy = LedgerPolicy { enforce_balance_bounds: false, ..LedgerPolicy::default() };
            let registry = GlAccountRegistry::new(Arc::clone(&store), policy);
            let poster = GlPoster::new(Arc::clone(&store), policy);

            let mut entries = Vec::new();
            let mut accounts = Vec::new();
            for (account_type, amount) in debit_types.iter().zip(&amounts) {
                let account = open_account(&registry, org, *account_type, opening).await;
                entries.push(EntryInput {
                    account_id: account.id,
                    amount: *amount,
                    dr_cr: DrCr::Debit,
                    description: None,
                });
                accounts.push(account);
            }
            let total: Decimal = entries.iter().map(|e| e.amount).sum();
            let credit = open_account(&registry, org, credit_type, opening).await;
            entries.push(EntryInput {
                account_id: credit.id,
                amount: total,
                dr_cr: DrCr::Credit,
                description: None,
            });
            accounts.push(credit);

            let posted = poster
                .post_transaction(PostTransactionInput {
                    organisation_id: org,
                    transaction_type: GlTransactionType::Transfer,
                    amount: None,
                    currency_code: None,
                    description: "prop".to_string(),
                    entries,
                    context: PostingContext::default(),
                    created_by: None,
                })
                .await
                .expect("post");
            prop_assert_eq!(posted.transaction.amount, total);

            poster
                .reverse_transaction(org, posted.transaction.id, "prop", None)
                .await
                .expect("reverse");

            for account in &accounts {
                let now = store.account(account.id).expect("account");
                prop_assert_eq!(now.balance, account.balance);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// The signed delta of a debit and a credit of the same amount cancel out.
    #[test]
    fn prop_balance_delta_is_antisymmetric(account_type in account_type(), amount in amount()) {
        prop_assert_eq!(
            balance_delta(account_type, DrCr::Debit, amount),
            -balance_delta(account_type, DrCr::Credit, amount)
        );
    }
}
