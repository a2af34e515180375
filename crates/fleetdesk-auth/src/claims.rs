//! JWT claims
//!
//! Every token is bound to exactly one agency; handlers never accept an agency id from
//! the request itself.

use chrono::{Duration, Utc};
use fleetdesk_core::models::UserRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by a Fleetdesk access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (staff user id or login)
    pub sub: String,

    /// Agency the user acts for
    pub agency_id: Uuid,

    pub role: UserRole,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp), zero until signed
    pub exp: i64,
}

impl Claims {
    /// Create claims without an expiration; `JwtService` fills it in when signing.
    ///
    /// ```
    /// use fleetdesk_auth::Claims;
    /// use fleetdesk_core::models::UserRole;
    /// use uuid::Uuid;
    ///
    /// let agency = Uuid::new_v4();
    /// let claims = Claims::new("desk-1", agency, UserRole::Agent);
    /// assert_eq!(claims.agency_id, agency);
    /// assert_eq!(claims.exp, 0);
    /// ```
    pub fn new(subject: &str, agency_id: Uuid, role: UserRole) -> Self {
        Self {
            sub: subject.to_string(),
            agency_id,
            role,
            iat: Utc::now().timestamp(),
            exp: 0,
        }
    }

    pub fn with_expiration(
        subject: &str,
        agency_id: Uuid,
        role: UserRole,
        expires_in_secs: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: subject.to_string(),
            agency_id,
            role,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(expires_in_secs)).timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }

    pub fn is_manager(&self) -> bool {
        self.role.is_manager()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let agency = Uuid::new_v4();
        let claims = Claims::new("desk-1", agency, UserRole::Agent);
        assert_eq!(claims.sub, "desk-1");
        assert_eq!(claims.agency_id, agency);
        assert!(claims.iat > 0);
        assert!(!claims.is_manager());
    }

    #[test]
    fn test_claims_with_expiration() {
        let claims = Claims::with_expiration("boss", Uuid::new_v4(), UserRole::Manager, 3600);
        assert!(!claims.is_expired());
        assert!(claims.is_manager());

        let now = Utc::now().timestamp();
        assert!(claims.exp > now);
        assert!(claims.exp <= now + 3600);
    }

    #[test]
    fn test_expired_claims() {
        let mut claims = Claims::new("desk-1", Uuid::new_v4(), UserRole::Agent);
        claims.exp = (Utc::now() - Duration::hours(1)).timestamp();
        assert!(claims.is_expired());
    }

    #[test]
    fn test_claims_json_shape() {
        let claims = Claims::with_expiration("boss", Uuid::nil(), UserRole::Manager, 60);
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["role"], "manager");
        assert_eq!(json["agency_id"], "00000000-0000-0000-0000-000000000000");
    }
}
