//! Domain models for Fleetdesk

pub mod filter;
pub mod reservation;
pub mod user;
pub mod vehicle;

pub use filter::{ReservationFilter, VehicleFilter, VehicleMatch};
pub use reservation::{
    NewReservation, PaymentRecord, Reservation, ReservationChanges, ReservationGuest,
    ReservationMetrics, ReservationSource, ReservationStatus,
};
pub use user::UserRole;
pub use vehicle::{Vehicle, VehicleSummary};
