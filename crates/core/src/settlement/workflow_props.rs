//! Property-based tests for the charges payment state machine.

use proptest::prelude::*;

use super::error::SettlementError;
use super::types::PaymentStatus;
use super::workflow::{PaymentWorkflow, append_note};

#[derive(Debug, Clone, Copy)]
enum Action {
    Approve,
    Reverse,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![Just(Action::Approve), Just(Action::Reverse)]
}

fn status() -> impl Strategy<Value = PaymentStatus> {
    prop_oneof![
        Just(PaymentStatus::Pending),
        Just(PaymentStatus::Completed),
        Just(PaymentStatus::Failed),
    ]
}

fn step(current: PaymentStatus, action: Action) -> Result<PaymentStatus, SettlementError> {
    match action {
        Action::Approve => PaymentWorkflow::approve(current),
        Action::Reverse => PaymentWorkflow::reverse(current),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// FAILED is terminal and nothing ever returns to PENDING.
    #[test]
    fn prop_failed_is_terminal(actions in prop::collection::vec(action(), 0..12)) {
        let mut current = PaymentStatus::Pending;
        let mut left_pending = false;
        for action in actions {
            if let Ok(next) = step(current, action) {
                prop_assert_ne!(current, PaymentStatus::Failed);
                prop_assert_ne!(next, PaymentStatus::Pending);
                current = next;
                left_pending = true;
            }
        }
        if !left_pending {
            prop_assert_eq!(current, PaymentStatus::Pending);
        }
    }

    /// A rejected transition always names the state it was attempted from.
    #[test]
    fn prop_rejection_reports_source(current in status(), action in action()) {
        if let Err(err) = step(current, action) {
            let is_reported = matches!(
                err,
                SettlementError::InvalidTransition { from, .. } if from == current
            );
            prop_assert!(is_reported);
        }
    }

    /// Appending keeps every earlier line intact.
    #[test]
    fn prop_append_note_preserves_history(
        lines in prop::collection::vec("[a-zA-Z0-9]{1,20}", 1..6),
    ) {
        let mut notes: Option<String> = None;
        for line in &lines {
            notes = Some(append_note(notes.as_deref(), line));
        }
        let notes = notes.unwrap_or_default();
        for line in &lines {
            prop_assert!(notes.contains(line.as_str()));
        }
    }
}
