//! Repository implementations
//!
//! Concrete implementations of the store traits defined in fleetdesk-core, using sqlx for
//! PostgreSQL access.

pub mod reservation_repo;
pub mod vehicle_repo;

pub use reservation_repo::PgReservationRepository;
pub use vehicle_repo::PgVehicleRepository;
