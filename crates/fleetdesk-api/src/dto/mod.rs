//! Data Transfer Objects (DTOs) for API requests and responses

pub mod common;
pub mod metrics;
pub mod reservation;

pub use common::*;
pub use metrics::*;
pub use reservation::*;
