//! HTTP request handlers
//!
//! Handlers build their services per request from the shared pool, so registering
//! `web::Data<PgPool>` and `web::Data<ApiSettings>` is enough for every route. The recent
//! search routes also need `web::Data<Arc<RedisCache>>`, and the card routes
//! `web::Data<Arc<StripeGateway>>`.

pub mod metrics;
pub mod reservation;

use chrono_tz::Tz;
use fleetdesk_core::{config::DEFAULT_MAX_RANGE_DAYS, AppConfig};
use fleetdesk_db::{PgPool, PgReservationRepository, PgVehicleRepository};
use fleetdesk_services::{ReportService, ReservationService};
use std::sync::Arc;

pub use metrics::configure as configure_metrics;
pub use reservation::configure as configure_reservations;

/// Request-independent settings shared by the handlers
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Zone whose calendar days the reports bucket by
    pub tz: Tz,
    /// ISO currency code for card charges
    pub currency: String,
    pub recent_searches_limit: usize,
    /// Longest day range a day-bucketed report may span
    pub max_range_days: i64,
}

impl ApiSettings {
    pub fn from_config(config: &AppConfig) -> fleetdesk_core::AppResult<Self> {
        Ok(Self {
            tz: config.reporting.tz()?,
            currency: config.payments.currency.clone(),
            recent_searches_limit: config.redis.recent_searches_limit,
            max_range_days: config.reporting.max_range_days,
        })
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            tz: Tz::UTC,
            currency: "usd".to_string(),
            recent_searches_limit: 10,
            max_range_days: DEFAULT_MAX_RANGE_DAYS,
        }
    }
}

pub(crate) type PgReservationService = ReservationService<PgReservationRepository, PgVehicleRepository>;
pub(crate) type PgReportService = ReportService<PgReservationRepository, PgVehicleRepository>;

pub(crate) fn reservation_service(pool: &PgPool, settings: &ApiSettings) -> PgReservationService {
    ReservationService::new(
        Arc::new(PgReservationRepository::new(pool.clone())),
        Arc::new(PgVehicleRepository::new(pool.clone())),
        settings.tz,
    )
}

pub(crate) fn report_service(pool: &PgPool, settings: &ApiSettings) -> PgReportService {
    ReportService::new(
        Arc::new(PgReservationRepository::new(pool.clone())),
        Arc::new(PgVehicleRepository::new(pool.clone())),
        settings.tz,
    )
    .with_max_range_days(settings.max_range_days)
}
