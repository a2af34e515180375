//! Business logic services for Fleetdesk
//!
//! # Architecture
//!
//! Services are generic over the repository and gateway traits from fleetdesk-core and hold
//! their collaborators in `Arc`, so the same code runs against PostgreSQL, Redis and Stripe
//! in production and against in-memory doubles in tests. Nothing here reads the clock:
//! every operation that depends on "now" takes it as an argument.
//!
//! # Services
//!
//! - [`ReportService`] - Date-bucketed dashboard reports built on [`metrics`]
//! - [`ReservationService`] - Reservation CRUD, lookups, lifecycle and card payments
//! - [`SearchHistory`] - Recent guest searches per agency
//! - [`StripeGateway`] - Card charges through the Stripe API

pub mod metrics;
pub mod payments;
pub mod reports;
pub mod reservations;
pub mod search_history;

pub use payments::{StripeError, StripeGateway};
pub use reports::{
    CustomerBase, LedgerQuery, MonthToDate, ReportService, StatusCount, TopVehicle, UsageTotal,
    VehicleHours, VehicleLedger, VehicleTypeMonth,
};
pub use reservations::ReservationService;
pub use search_history::SearchHistory;

/// Business logic constants
pub mod constants {
    /// Seconds in one hour, for duration arithmetic
    pub const SECONDS_PER_HOUR: i64 = 3600;

    /// Largest single card charge in cents
    pub const MAX_CHARGE_CENTS: i64 = 99_999_999;
}
