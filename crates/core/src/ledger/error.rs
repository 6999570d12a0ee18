//! Ledger error types for the account registry and the poster.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use remitgl_shared::AppError;

use super::account::{AccountState, BoundEntity};
use crate::error::ErrorKind;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Account name is empty.
    #[error("Account name is required")]
    EmptyName,

    /// Account type is not one of the recognised values.
    #[error("Invalid account type: {0}")]
    InvalidAccountType(String),

    /// Bound entity kind is not one of the recognised values.
    #[error("Invalid entity kind: {0}")]
    InvalidEntityKind(String),

    /// Transaction type is not one of the recognised values.
    #[error("Invalid transaction type: {0}")]
    InvalidTransactionType(String),

    /// Status or lifecycle state filter is not recognised.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Minimum balance is above maximum balance.
    #[error("Minimum balance {min} exceeds maximum balance {max}")]
    InvalidBounds {
        /// Lower bound.
        min: Decimal,
        /// Upper bound.
        max: Decimal,
    },

    /// Posting has no entries.
    #[error("Transaction must have at least one entry")]
    NoEntries,

    /// Entry or header amount is zero or negative.
    #[error("Amount must be positive")]
    NonPositiveAmount,

    /// Debits and credits differ by more than the tolerance.
    #[error("Unbalanced entries: debits ({debits}) != credits ({credits})")]
    Unbalanced {
        /// Total debit amount.
        debits: Decimal,
        /// Total credit amount.
        credits: Decimal,
    },

    /// Posting would push an account outside its min/max bounds.
    #[error("Posting would move account {account_id} to {resulting}, outside its balance bounds")]
    BalanceOutOfBounds {
        /// The account that would be pushed out of range.
        account_id: Uuid,
        /// The balance after the posting.
        resulting: Decimal,
    },

    /// Reversal reason is empty.
    #[error("A reversal reason is required")]
    ReasonRequired,

    // ========== Lookup Errors ==========
    /// Account not found.
    #[error("GL account not found: {0}")]
    AccountNotFound(Uuid),

    /// GL transaction not found.
    #[error("GL transaction not found: {0}")]
    TransactionNotFound(Uuid),

    // ========== State Errors ==========
    /// Account is closed or frozen.
    #[error("GL account {account_id} is {state} and cannot be posted to")]
    AccountNotOpen {
        /// The account ID.
        account_id: Uuid,
        /// Its current lifecycle state.
        state: AccountState,
    },

    /// Transaction was already reversed.
    #[error("GL transaction {0} has already been reversed")]
    AlreadyReversed(Uuid),

    /// Transaction is itself a reversal and cannot be reversed.
    #[error("GL transaction {0} is a reversal and cannot be reversed")]
    CannotReverseReversal(Uuid),

    // ========== Conflict Errors ==========
    /// The entity already has a GL account in this organisation.
    #[error("{0} already has a GL account in this organisation")]
    DuplicateEntityAccount(BoundEntity),

    /// Account is referenced by ledger entries.
    #[error("GL account {0} is referenced by ledger entries and cannot be deleted")]
    AccountInUse(Uuid),

    // ========== Storage Errors ==========
    /// Repository operation failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Create a storage error.
    #[must_use]
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Returns the coarse error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyName
            | Self::InvalidAccountType(_)
            | Self::InvalidEntityKind(_)
            | Self::InvalidTransactionType(_)
            | Self::InvalidStatus(_)
            | Self::InvalidBounds { .. }
            | Self::NoEntries
            | Self::NonPositiveAmount
            | Self::Unbalanced { .. }
            | Self::BalanceOutOfBounds { .. }
            | Self::ReasonRequired => ErrorKind::Validation,
            Self::AccountNotFound(_) | Self::TransactionNotFound(_) => ErrorKind::NotFound,
            Self::AccountNotOpen { .. }
            | Self::AlreadyReversed(_)
            | Self::CannotReverseReversal(_) => ErrorKind::InvalidState,
            Self::DuplicateEntityAccount(_) | Self::AccountInUse(_) => ErrorKind::Conflict,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyName => "EMPTY_NAME",
            Self::InvalidAccountType(_) => "INVALID_ACCOUNT_TYPE",
            Self::InvalidEntityKind(_) => "INVALID_ENTITY_KIND",
            Self::InvalidTransactionType(_) => "INVALID_TRANSACTION_TYPE",
            Self::InvalidStatus(_) => "INVALID_STATUS",
            Self::InvalidBounds { .. } => "INVALID_BOUNDS",
            Self::NoEntries => "NO_ENTRIES",
            Self::NonPositiveAmount => "NON_POSITIVE_AMOUNT",
            Self::Unbalanced { .. } => "UNBALANCED_ENTRIES",
            Self::BalanceOutOfBounds { .. } => "BALANCE_OUT_OF_BOUNDS",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::AccountNotOpen { .. } => "ACCOUNT_NOT_OPEN",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::CannotReverseReversal(_) => "CANNOT_REVERSE_REVERSAL",
            Self::DuplicateEntityAccount(_) => "DUPLICATE_ENTITY_ACCOUNT",
            Self::AccountInUse(_) => "ACCOUNT_IN_USE",
            Self::Storage(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let msg = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(msg),
            ErrorKind::NotFound => Self::NotFound(msg),
            ErrorKind::InvalidState => Self::InvalidState(msg),
            ErrorKind::Conflict => Self::Conflict(msg),
            ErrorKind::Internal => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LedgerError::NoEntries, 400, "NO_ENTRIES")]
    #[case(
        LedgerError::Unbalanced { debits: Decimal::new(100, 2), credits: Decimal::new(50, 2) },
        400,
        "UNBALANCED_ENTRIES"
    )]
    #[case(LedgerError::AccountNotFound(Uuid::nil()), 404, "ACCOUNT_NOT_FOUND")]
    #[case(LedgerError::AlreadyReversed(Uuid::nil()), 409, "ALREADY_REVERSED")]
    #[case(LedgerError::AccountInUse(Uuid::nil()), 409, "ACCOUNT_IN_USE")]
    #[case(LedgerError::storage("boom"), 500, "INTERNAL_ERROR")]
    fn test_status_and_code(#[case] err: LedgerError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_converts_into_app_error_by_kind() {
        let app: AppError = LedgerError::AlreadyReversed(Uuid::nil()).into();
        assert!(matches!(app, AppError::InvalidState(_)));

        let app: AppError = LedgerError::storage("connection reset").into();
        assert!(app.is_internal());
    }
}
