//! Charges payment state machine and note formatting.

use chrono::{DateTime, Utc};

use super::error::SettlementError;
use super::types::PaymentStatus;

/// Stateless transition rules for charges payments.
pub struct PaymentWorkflow;

impl PaymentWorkflow {
    /// Approve a pending payment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the payment is `Pending`.
    pub fn approve(current: PaymentStatus) -> Result<PaymentStatus, SettlementError> {
        match current {
            PaymentStatus::Pending => Ok(PaymentStatus::Completed),
            _ => Err(SettlementError::InvalidTransition {
                from: current,
                to: PaymentStatus::Completed,
            }),
        }
    }

    /// Reverse a completed payment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the payment is `Completed`.
    pub fn reverse(current: PaymentStatus) -> Result<PaymentStatus, SettlementError> {
        match current {
            PaymentStatus::Completed => Ok(PaymentStatus::Failed),
            _ => Err(SettlementError::InvalidTransition {
                from: current,
                to: PaymentStatus::Failed,
            }),
        }
    }
}

/// Appends a line to existing notes.
#[must_use]
pub fn append_note(existing: Option<&str>, line: &str) -> String {
    match existing.map(str::trim).filter(|n| !n.is_empty()) {
        Some(existing) => format!("{existing}\n{line}"),
        None => line.to_string(),
    }
}

/// The line recorded on approval.
#[must_use]
pub fn approval_note(notes: Option<&str>, at: DateTime<Utc>) -> String {
    match notes.map(str::trim).filter(|n| !n.is_empty()) {
        Some(notes) => format!("Approved: {notes}"),
        None => format!("Approved: {}", at.format("%Y-%m-%d %H:%M UTC")),
    }
}

/// The line recorded on reversal.
#[must_use]
pub fn reversal_note(reason: &str, notes: Option<&str>) -> String {
    match notes.map(str::trim).filter(|n| !n.is_empty()) {
        Some(notes) => format!("Reversed: {} - {notes}", reason.trim()),
        None => format!("Reversed: {}", reason.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[test]
    fn test_approve_from_pending() {
        assert_eq!(
            PaymentWorkflow::approve(PaymentStatus::Pending).unwrap(),
            PaymentStatus::Completed
        );
    }

    #[rstest]
    #[case(PaymentStatus::Completed)]
    #[case(PaymentStatus::Failed)]
    fn test_approve_rejected(#[case] status: PaymentStatus) {
        assert!(matches!(
            PaymentWorkflow::approve(status),
            Err(SettlementError::InvalidTransition {
                from,
                to: PaymentStatus::Completed,
            }) if from == status
        ));
    }

    #[test]
    fn test_reverse_from_completed() {
        assert_eq!(
            PaymentWorkflow::reverse(PaymentStatus::Completed).unwrap(),
            PaymentStatus::Failed
        );
    }

    #[rstest]
    #[case(PaymentStatus::Pending)]
    #[case(PaymentStatus::Failed)]
    fn test_reverse_rejected(#[case] status: PaymentStatus) {
        assert!(PaymentWorkflow::reverse(status).is_err());
    }

    #[test]
    fn test_notes() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(approval_note(Some("ok"), at), "Approved: ok");
        assert_eq!(approval_note(None, at), "Approved: 2026-01-02 03:04 UTC");
        assert_eq!(reversal_note("duplicate", None), "Reversed: duplicate");
        assert_eq!(
            reversal_note("duplicate", Some("bank recalled")),
            "Reversed: duplicate - bank recalled"
        );
        assert_eq!(append_note(None, "Approved: ok"), "Approved: ok");
        assert_eq!(append_note(Some("batch 4"), "Approved: ok"), "batch 4\nApproved: ok");
    }
}
