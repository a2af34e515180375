//! JWT token creation and validation

use crate::claims::Claims;
use chrono::{Duration, Utc};
use fleetdesk_core::{config::AuthConfig, error::AppError, models::UserRole};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Signs and validates HS256 access tokens
#[derive(Clone)]
pub struct JwtService {
    expiration_secs: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// ```
    /// use fleetdesk_auth::JwtService;
    ///
    /// let jwt_service = JwtService::new("my-secret-key", 3600);
    /// assert_eq!(jwt_service.expiration_secs(), 3600);
    /// ```
    pub fn new(secret: &str, expiration_secs: i64) -> Self {
        Self {
            expiration_secs,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_expiration_secs)
    }

    /// Sign claims, stamping the default expiration when none is set
    pub fn create_token(&self, claims: &Claims) -> Result<String, AppError> {
        let mut token_claims = claims.clone();
        if token_claims.exp == 0 {
            token_claims.exp = (Utc::now() + Duration::seconds(self.expiration_secs)).timestamp();
        }

        debug!(
            subject = %token_claims.sub,
            agency_id = %token_claims.agency_id,
            role = %token_claims.role,
            "Creating JWT token"
        );

        encode(&Header::default(), &token_claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "Failed to create JWT token");
            AppError::InvalidToken(format!("Token creation failed: {}", e))
        })
    }

    pub fn create_token_for_user(
        &self,
        subject: &str,
        agency_id: Uuid,
        role: UserRole,
    ) -> Result<String, AppError> {
        self.create_token(&Claims::new(subject, agency_id, role))
    }

    /// Validate a token and return its claims
    ///
    /// # Errors
    ///
    /// - `AppError::TokenExpired` once `exp` has passed
    /// - `AppError::InvalidToken` for a bad signature or malformed token
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    warn!("Token expired");
                    AppError::TokenExpired
                }
                _ => {
                    warn!(error = %e, "Invalid token");
                    AppError::InvalidToken(format!("Token validation failed: {}", e))
                }
            })?;

        let claims = token_data.claims;

        // jsonwebtoken allows 60s of leeway by default
        if claims.is_expired() {
            warn!(subject = %claims.sub, "Token expired (within leeway)");
            return Err(AppError::TokenExpired);
        }

        debug!(
            subject = %claims.sub,
            agency_id = %claims.agency_id,
            "Token validated"
        );

        Ok(claims)
    }

    pub fn expiration_secs(&self) -> i64 {
        self.expiration_secs
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("expiration_secs", &self.expiration_secs)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-for-jwt-testing-12345";

    #[test]
    fn test_create_and_validate_token() {
        let jwt_service = JwtService::new(TEST_SECRET, 3600);
        let agency = Uuid::new_v4();

        let token = jwt_service
            .create_token_for_user("desk-1", agency, UserRole::Agent)
            .unwrap();
        let decoded = jwt_service.validate_token(&token).unwrap();

        assert_eq!(decoded.sub, "desk-1");
        assert_eq!(decoded.agency_id, agency);
        assert_eq!(decoded.role, UserRole::Agent);
    }

    #[test]
    fn test_from_config() {
        let config = AuthConfig {
            jwt_secret: TEST_SECRET.to_string(),
            jwt_expiration_secs: 900,
        };
        assert_eq!(JwtService::from_config(&config).expiration_secs(), 900);
    }

    #[test]
    fn test_expired_token() {
        let jwt_service = JwtService::new(TEST_SECRET, 1);
        let claims = Claims::with_expiration("desk-1", Uuid::new_v4(), UserRole::Agent, -10);
        let token = jwt_service.create_token(&claims).unwrap();

        let result = jwt_service.validate_token(&token);
        assert!(matches!(result, Err(AppError::TokenExpired)));
    }

    #[test]
    fn test_token_long_expired() {
        let jwt_service = JwtService::new(TEST_SECRET, 1);
        let claims = Claims::with_expiration("desk-1", Uuid::new_v4(), UserRole::Agent, -3600);
        let token = jwt_service.create_token(&claims).unwrap();

        assert!(matches!(
            jwt_service.validate_token(&token),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn test_invalid_token() {
        let jwt_service = JwtService::new(TEST_SECRET, 3600);
        let result = jwt_service.validate_token("invalid.token.here");
        assert!(matches!(result, Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn test_token_with_different_secret() {
        let issuer = JwtService::new("secret-one-secret-one", 3600);
        let verifier = JwtService::new("secret-two-secret-two", 3600);

        let token = issuer
            .create_token_for_user("desk-1", Uuid::new_v4(), UserRole::Manager)
            .unwrap();

        assert!(matches!(
            verifier.validate_token(&token),
            Err(AppError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_token_expiration_setting() {
        let jwt_service = JwtService::new(TEST_SECRET, 7200);
        let token = jwt_service
            .create_token_for_user("desk-1", Uuid::new_v4(), UserRole::Agent)
            .unwrap();
        let decoded = jwt_service.validate_token(&token).unwrap();

        let now = Utc::now().timestamp();
        assert!(decoded.exp > now);
        assert!(decoded.exp <= now + 7200);
    }

    #[test]
    fn test_debug_impl_hides_secret() {
        let debug_str = format!("{:?}", JwtService::new(TEST_SECRET, 3600));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains(TEST_SECRET));
    }
}
