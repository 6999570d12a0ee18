//! Bearer token issuing and validation.
//!
//! Tokens are issued by the identity service; this crate validates them and can
//! mint access tokens for tooling and tests. Only HS256 is accepted.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Claims;
use crate::config::JwtSettings;

/// Longest access-token lifetime accepted from configuration.
const MAX_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Signing secret and token lifetime.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HMAC secret.
    pub secret: String,
    /// Lifetime of issued access tokens.
    pub access_token_ttl: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            access_token_ttl: Duration::minutes(15),
        }
    }
}

impl From<&JwtSettings> for JwtConfig {
    fn from(settings: &JwtSettings) -> Self {
        let secs = settings.access_token_expiry_secs.min(MAX_TTL_SECS);
        Self {
            secret: settings.secret.clone(),
            access_token_ttl: Duration::seconds(i64::try_from(secs).unwrap_or_default()),
        }
    }
}

/// Token failures.
#[derive(Debug, Error)]
pub enum JwtError {
    /// The token could not be signed.
    #[error("failed to sign token: {0}")]
    Signing(String),

    /// Malformed, wrongly signed or missing required claims.
    #[error("invalid token: {0}")]
    Invalid(String),

    /// The `exp` claim is in the past.
    #[error("token has expired")]
    Expired,
}

/// Issues and validates HS256 access tokens.
#[derive(Clone)]
pub struct JwtService {
    ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// Builds a service from a secret and lifetime.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            ttl: config.access_token_ttl,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    /// Signs an access token for a user acting in an organisation.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Signing` if encoding fails.
    pub fn issue_access_token(
        &self,
        user_id: Uuid,
        organisation_id: Uuid,
        role: &str,
    ) -> Result<String, JwtError> {
        let claims = Claims::new(user_id, organisation_id, role, Utc::now(), self.ttl);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Signing(e.to_string()))
    }

    /// Verifies the signature and expiry and returns the claims.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Expired` for an expired token and `JwtError::Invalid`
    /// for anything else that fails verification.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) if matches!(e.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature) => {
                Err(JwtError::Expired)
            }
            Err(e) => Err(JwtError::Invalid(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn service(secret: &str, ttl: Duration) -> JwtService {
        JwtService::new(JwtConfig {
            secret: secret.to_string(),
            access_token_ttl: ttl,
        })
    }

    #[test]
    fn test_issued_token_round_trips_claims() {
        let svc = service("ledger-secret", Duration::minutes(15));
        let (user, org) = (Uuid::new_v4(), Uuid::new_v4());

        let token = svc.issue_access_token(user, org, "teller").unwrap();
        let claims = svc.validate_token(&token).unwrap();

        assert_eq!(claims.user_id(), user);
        assert_eq!(claims.organisation_id(), org);
        assert_eq!(claims.role, "teller");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[rstest]
    #[case("")]
    #[case("not-a-token")]
    #[case("a.b.c")]
    fn test_garbage_is_invalid(#[case] token: &str) {
        let svc = service("ledger-secret", Duration::minutes(15));
        assert!(matches!(svc.validate_token(token), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_foreign_secret_is_invalid() {
        let token = service("other-issuer", Duration::minutes(15))
            .issue_access_token(Uuid::new_v4(), Uuid::new_v4(), "admin")
            .unwrap();

        let result = service("ledger-secret", Duration::minutes(15)).validate_token(&token);
        assert!(matches!(result, Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_expired_token() {
        let svc = service("ledger-secret", Duration::minutes(-10));
        let token = svc
            .issue_access_token(Uuid::new_v4(), Uuid::new_v4(), "admin")
            .unwrap();

        assert!(matches!(svc.validate_token(&token), Err(JwtError::Expired)));
    }

    #[rstest]
    #[case(900, 900)]
    #[case(u64::MAX, 7 * 24 * 60 * 60)]
    fn test_ttl_from_settings(#[case] configured: u64, #[case] expected: i64) {
        let config = JwtConfig::from(&JwtSettings {
            secret: "s".to_string(),
            access_token_expiry_secs: configured,
        });
        assert_eq!(config.access_token_ttl.num_seconds(), expected);
    }
}
