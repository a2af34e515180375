//! Fleetdesk Core Library
//!
//! Foundational types shared by every crate in the workspace:
//!
//! - Domain models (reservations, vehicles, filters)
//! - Repository and gateway traits
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
