//! Error taxonomy shared by the ledger and settlement modules.

use serde::Serialize;

/// Coarse error classification used to map domain errors onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed, missing or mismatched input.
    Validation,
    /// A referenced record does not exist.
    NotFound,
    /// The operation is not allowed from the record's current state.
    InvalidState,
    /// The operation would violate a uniqueness or reference rule.
    Conflict,
    /// Unexpected persistence or infrastructure failure.
    Internal,
}

impl ErrorKind {
    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::InvalidState | Self::Conflict => 409,
            Self::Internal => 500,
        }
    }
}
