//! Boundary error type.
//!
//! Domain errors from the core convert into `AppError`; the HTTP layer renders
//! it using `status_code`, `error_code` and `public_message`.

use thiserror::Error;

use crate::jwt::JwtError;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// No bearer token on a protected route.
    #[error("Authorization header with Bearer token is required")]
    MissingToken,

    /// Bearer token past its expiry.
    #[error("Token has expired")]
    TokenExpired,

    /// Bearer token failed verification. The detail is kept for logs only.
    #[error("Invalid or malformed token")]
    InvalidToken(String),

    /// No authenticated caller where one is required.
    #[error("Authentication required")]
    Unauthorized,

    /// The caller may not act on the requested organisation.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed, missing or mismatched input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation attempted from a state that forbids it.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Uniqueness or reference rule would be violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unexpected storage or infrastructure failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for the error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MissingToken
            | Self::TokenExpired
            | Self::InvalidToken(_)
            | Self::Unauthorized => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::InvalidState(_) | Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }

    /// Machine-readable code for the `error` field.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingToken => "MISSING_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True when the detail must not reach the caller.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    /// Message safe to show to API callers.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => Self::TokenExpired,
            JwtError::Invalid(detail) => Self::InvalidToken(detail),
            JwtError::Signing(detail) => Self::Internal(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::MissingToken, 401, "MISSING_TOKEN")]
    #[case(AppError::TokenExpired, 401, "TOKEN_EXPIRED")]
    #[case(AppError::InvalidToken(String::new()), 401, "INVALID_TOKEN")]
    #[case(AppError::Forbidden(String::new()), 403, "FORBIDDEN")]
    #[case(AppError::NotFound(String::new()), 404, "NOT_FOUND")]
    #[case(AppError::Validation(String::new()), 400, "VALIDATION_ERROR")]
    #[case(AppError::InvalidState(String::new()), 409, "INVALID_STATE")]
    #[case(AppError::Conflict(String::new()), 409, "CONFLICT")]
    #[case(AppError::Internal(String::new()), 500, "INTERNAL_ERROR")]
    fn test_status_and_code(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_jwt_errors_map_to_token_codes() {
        assert_eq!(AppError::from(JwtError::Expired).error_code(), "TOKEN_EXPIRED");

        let invalid = AppError::from(JwtError::Invalid("InvalidSignature".into()));
        assert_eq!(invalid.error_code(), "INVALID_TOKEN");
        assert_eq!(invalid.public_message(), "Invalid or malformed token");
    }

    #[test]
    fn test_public_message_hides_internal_detail() {
        let err = AppError::Internal("relation \"gl_accounts\" does not exist".into());
        assert_eq!(err.public_message(), "An internal error occurred");

        let err = AppError::Validation("mixed charge types".into());
        assert_eq!(err.public_message(), "Validation error: mixed charge types");
    }
}
