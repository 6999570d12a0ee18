//! Property-based tests for posting validation.

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::entry::{DrCr, EntryInput};
use super::error::LedgerError;
use super::validation::{BALANCE_TOLERANCE, validate_entries};

/// Amounts from 0.01 to 1,000,000.00.
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn leg(dr_cr: DrCr, amount: Decimal) -> EntryInput {
    EntryInput {
        account_id: Uuid::new_v4(),
        amount,
        dr_cr,
        description: None,
    }
}

/// Splits `total` into debit legs matching one credit leg.
fn balanced_set(parts: &[Decimal]) -> Vec<EntryInput> {
    let total: Decimal = parts.iter().copied().sum();
    let mut entries: Vec<EntryInput> = parts.iter().map(|a| leg(DrCr::Debit, *a)).collect();
    entries.push(leg(DrCr::Credit, total));
    entries
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any set whose credit equals the sum of its debits is accepted.
    #[test]
    fn prop_balanced_sets_accepted(parts in prop::collection::vec(positive_amount(), 1..8)) {
        let entries = balanced_set(&parts);
        let totals = validate_entries(&entries);
        prop_assert!(totals.is_ok(), "balanced set rejected: {:?}", totals);
        let totals = totals.unwrap();
        prop_assert_eq!(totals.debits, totals.credits);
    }

    /// Perturbing one side by at least the tolerance is rejected.
    #[test]
    fn prop_unbalanced_sets_rejected(
        parts in prop::collection::vec(positive_amount(), 1..8),
        extra_cents in 1i64..1_000_000i64,
    ) {
        let mut entries = balanced_set(&parts);
        let extra = Decimal::new(extra_cents, 2);
        prop_assert!(extra >= BALANCE_TOLERANCE);
        entries.push(leg(DrCr::Debit, extra));

        prop_assert!(
            matches!(validate_entries(&entries), Err(LedgerError::Unbalanced { .. })),
            "unbalanced set accepted"
        );
    }

    /// Non-positive amounts are rejected before balance is considered.
    #[test]
    fn prop_non_positive_amount_rejected(
        parts in prop::collection::vec(positive_amount(), 1..5),
        bad_cents in 0i64..100_000i64,
    ) {
        let mut entries = balanced_set(&parts);
        entries.push(leg(DrCr::Debit, Decimal::new(-bad_cents, 2)));
        entries.push(leg(DrCr::Credit, Decimal::new(-bad_cents, 2)));

        prop_assert!(matches!(validate_entries(&entries), Err(LedgerError::NonPositiveAmount)));
    }
}
