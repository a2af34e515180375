//! Actix-web request extractors for authenticated staff
//!
//! The extractors need `web::Data<Arc<JwtService>>` registered on the app.

use crate::jwt::JwtService;
use crate::Claims;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use fleetdesk_core::error::AppError;
use fleetdesk_core::models::UserRole;
use futures::future::{ready, Ready};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Cookie checked when no Authorization header is present
pub const TOKEN_COOKIE: &str = "access_token";

/// Bearer header first, then the `access_token` cookie
fn extract_token_from_request(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    bearer.or_else(|| req.cookie(TOKEN_COOKIE).map(|c| c.value().to_string()))
}

/// Authenticated staff member
///
/// ```no_run
/// use actix_web::HttpResponse;
/// use fleetdesk_auth::AuthenticatedUser;
///
/// async fn whoami(user: AuthenticatedUser) -> HttpResponse {
///     HttpResponse::Ok().json(serde_json::json!({
///         "subject": user.subject(),
///         "agency_id": user.agency_id(),
///     }))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub claims: Claims,
}

impl AuthenticatedUser {
    /// Agency every query of this request is scoped to
    pub fn agency_id(&self) -> Uuid {
        self.claims.agency_id
    }

    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    pub fn role(&self) -> UserRole {
        self.claims.role
    }

    pub fn is_manager(&self) -> bool {
        self.claims.is_manager()
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let jwt_service = match req.app_data::<web::Data<Arc<JwtService>>>() {
            Some(service) => service.get_ref().clone(),
            None => {
                warn!("JwtService not found in app data");
                return ready(Err(AppError::Unauthorized(
                    "Authentication service not configured".to_string(),
                )
                .into()));
            }
        };

        let Some(token) = extract_token_from_request(req) else {
            debug!("No authentication token found in request");
            return ready(Err(AppError::Unauthorized(
                "No authentication token provided".to_string(),
            )
            .into()));
        };

        match jwt_service.validate_token(&token) {
            Ok(claims) => {
                debug!(
                    subject = %claims.sub,
                    agency_id = %claims.agency_id,
                    "User authenticated"
                );
                ready(Ok(AuthenticatedUser { claims }))
            }
            Err(e) => {
                warn!(error = %e, "Token validation failed");
                ready(Err(e.into()))
            }
        }
    }
}

/// Authenticated user holding the manager role
#[derive(Debug, Clone)]
pub struct ManagerUser(pub AuthenticatedUser);

impl std::ops::Deref for ManagerUser {
    type Target = AuthenticatedUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for ManagerUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let user = match AuthenticatedUser::from_request(req, payload).into_inner() {
            Ok(user) => user,
            Err(e) => return ready(Err(e)),
        };

        if !user.is_manager() {
            warn!(
                subject = %user.subject(),
                role = %user.role(),
                "Manager access denied"
            );
            return ready(Err(AppError::Forbidden.into()));
        }

        ready(Ok(ManagerUser(user)))
    }
}
