//! API layer for Fleetdesk
//!
//! actix-web handlers for reservations and fleet reports, mounted under `/api/v1` by the
//! server binary.

#![forbid(unsafe_code)]

pub mod dto;
pub mod handlers;

pub use dto::{ApiResponse, PaginationParams};
pub use handlers::{configure_metrics, configure_reservations, ApiSettings};

use actix_web::{web, HttpResponse};

/// Liveness probe
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "fleetdesk",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Mount every `/api/v1` route
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(configure_reservations)
            .configure(configure_metrics),
    );
}
