//! Fleetdesk Database Layer
//!
//! PostgreSQL access for the reservation and fleet stores:
//!
//! - Connection pool management and embedded migrations
//! - `ReservationRepository` with the vehicle join and typed filters
//! - `VehicleRepository`

pub mod pool;
pub mod repositories;

pub use pool::{create_pool, run_migrations};
pub use repositories::*;

// Re-export commonly used types
pub use fleetdesk_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres};
