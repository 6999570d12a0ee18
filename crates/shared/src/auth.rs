//! Claims carried by bearer tokens.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access-token claims. `org` scopes every ledger operation of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Acting user; recorded as `opened_by` / `created_by` on mutations.
    pub sub: Uuid,
    /// Organisation the user acts in.
    pub org: Uuid,
    /// Role name as issued by the identity service.
    pub role: String,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl Claims {
    /// Claims issued at `issued_at` that expire `ttl` later.
    #[must_use]
    pub fn new(
        user_id: Uuid,
        organisation_id: Uuid,
        role: &str,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            sub: user_id,
            org: organisation_id,
            role: role.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    /// The acting user.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.sub
    }

    /// The organisation the token is scoped to.
    #[must_use]
    pub const fn organisation_id(&self) -> Uuid {
        self.org
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_expiry_is_issue_time_plus_ttl() {
        let issued = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let claims = Claims::new(Uuid::nil(), Uuid::nil(), "teller", issued, Duration::minutes(15));

        assert_eq!(claims.iat, issued.timestamp());
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_serialized_field_names() {
        let org = Uuid::new_v4();
        let claims = Claims::new(Uuid::nil(), org, "admin", Utc::now(), Duration::minutes(1));
        let json = serde_json::to_value(&claims).unwrap();

        assert_eq!(json["org"], org.to_string());
        assert_eq!(json["role"], "admin");
        assert!(json.get("sub").is_some());
    }
}
