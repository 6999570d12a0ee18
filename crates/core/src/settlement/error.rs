//! Settlement error types.

use thiserror::Error;
use uuid::Uuid;

use remitgl_shared::AppError;

use super::types::PaymentStatus;
use crate::error::ErrorKind;
use crate::ledger::LedgerError;

/// Errors that can occur during charges payment operations.
#[derive(Debug, Error)]
pub enum SettlementError {
    // ========== Validation Errors ==========
    /// No charge IDs were supplied.
    #[error("At least one transaction charge must be selected")]
    NoChargesSelected,

    /// Some IDs are unknown, foreign, duplicated or already settled.
    #[error("Some charges are invalid or not pending: requested {requested}, found {found}")]
    InvalidCharges {
        /// Number of IDs requested.
        requested: usize,
        /// Number of pending charges found.
        found: usize,
    },

    /// Selected charges do not share one type.
    #[error("Selected charges have mixed charge types")]
    MixedChargeTypes,

    /// Reversal reason is empty.
    #[error("A reversal reason is required")]
    ReasonRequired,

    /// A charge definition has no GL account to post against.
    #[error("Charge {0} has no GL account; generate charge accounts first")]
    ChargeAccountMissing(Uuid),

    /// A filter value is not recognised.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    // ========== Lookup Errors ==========
    /// Organisation not found.
    #[error("Organisation not found: {0}")]
    OrganisationNotFound(Uuid),

    /// Charges payment not found.
    #[error("Charges payment not found: {0}")]
    PaymentNotFound(Uuid),

    // ========== State Errors ==========
    /// Attempted an invalid status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: PaymentStatus,
        /// The attempted target status.
        to: PaymentStatus,
    },

    /// The payment changed status between read and write.
    #[error("Charges payment {0} was modified concurrently")]
    ConcurrentModification(Uuid),

    // ========== Delegated Errors ==========
    /// Ledger posting failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Repository operation failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl SettlementError {
    /// Create a storage error.
    #[must_use]
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Returns the coarse error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NoChargesSelected
            | Self::InvalidCharges { .. }
            | Self::MixedChargeTypes
            | Self::ReasonRequired
            | Self::ChargeAccountMissing(_)
            | Self::InvalidFilter(_) => ErrorKind::Validation,
            Self::OrganisationNotFound(_) | Self::PaymentNotFound(_) => ErrorKind::NotFound,
            Self::InvalidTransition { .. } | Self::ConcurrentModification(_) => {
                ErrorKind::InvalidState
            }
            Self::Ledger(inner) => inner.kind(),
            Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NoChargesSelected => "NO_CHARGES_SELECTED",
            Self::InvalidCharges { .. } => "INVALID_CHARGES",
            Self::MixedChargeTypes => "MIXED_CHARGE_TYPES",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::ChargeAccountMissing(_) => "CHARGE_ACCOUNT_MISSING",
            Self::InvalidFilter(_) => "INVALID_FILTER",
            Self::OrganisationNotFound(_) => "ORGANISATION_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_STATE",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::Ledger(inner) => inner.error_code(),
            Self::Storage(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

impl From<SettlementError> for AppError {
    fn from(err: SettlementError) -> Self {
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
