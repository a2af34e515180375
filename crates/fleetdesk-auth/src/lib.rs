//! Authentication for Fleetdesk
//!
//! Staff authenticate with HS256 JWTs issued by the identity provider. Each token carries
//! the agency the user works for, and the extractors in [`middleware`] hand that agency to
//! handlers so every query is scoped to it.
//!
//! ```no_run
//! use actix_web::HttpResponse;
//! use fleetdesk_auth::{AuthenticatedUser, ManagerUser};
//!
//! async fn list(user: AuthenticatedUser) -> HttpResponse {
//!     HttpResponse::Ok().json(serde_json::json!({ "agency_id": user.agency_id() }))
//! }
//!
//! async fn purge(manager: ManagerUser) -> HttpResponse {
//!     HttpResponse::NoContent().finish()
//! }
//! ```

pub mod claims;
pub mod jwt;
pub mod middleware;

pub use claims::Claims;
pub use jwt::JwtService;
pub use middleware::{AuthenticatedUser, ManagerUser};

#[cfg(test)]
mod tests {
    use super::*;
    use fleetdesk_core::models::UserRole;
    use uuid::Uuid;

    #[test]
    fn test_round_trip_keeps_agency_scope() {
        let jwt_service = JwtService::new("test-secret-key-12345", 3600);
        let agency = Uuid::new_v4();

        let token = jwt_service
            .create_token(&Claims::new("boss", agency, UserRole::Manager))
            .unwrap();
        let user = AuthenticatedUser {
            claims: jwt_service.validate_token(&token).unwrap(),
        };

        assert_eq!(user.agency_id(), agency);
        assert!(user.is_manager());
    }
}
