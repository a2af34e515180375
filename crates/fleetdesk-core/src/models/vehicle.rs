//! Fleet vehicle model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Vehicle entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub agency_id: Uuid,
    pub name: String,
    pub vehicle_type: String,
    pub serial_number: String,
    /// Inactive vehicles are kept for history but no longer rented out
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn summary(&self) -> VehicleSummary {
        VehicleSummary {
            id: self.id,
            name: self.name.clone(),
            vehicle_type: self.vehicle_type.clone(),
            serial_number: self.serial_number.clone(),
        }
    }
}

/// Vehicle fields joined onto a reservation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleSummary {
    pub id: Uuid,
    pub name: String,
    pub vehicle_type: String,
    pub serial_number: String,
}

impl From<&Vehicle> for VehicleSummary {
    fn from(vehicle: &Vehicle) -> Self {
        vehicle.summary()
    }
}
