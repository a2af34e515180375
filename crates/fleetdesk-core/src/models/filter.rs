//! Typed store filters
//!
//! Every predicate is optional and all present predicates must hold. `matches` gives the
//! reference semantics that database-backed stores translate into SQL.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::reservation::{Reservation, ReservationStatus};
use super::vehicle::Vehicle;

/// Vehicle constraint on a reservation query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VehicleMatch {
    One(Uuid),
    AnyOf(Vec<Uuid>),
}

impl VehicleMatch {
    pub fn contains(&self, id: Uuid) -> bool {
        match self {
            VehicleMatch::One(v) => *v == id,
            VehicleMatch::AnyOf(ids) => ids.contains(&id),
        }
    }

    pub fn ids(&self) -> Vec<Uuid> {
        match self {
            VehicleMatch::One(v) => vec![*v],
            VehicleMatch::AnyOf(ids) => ids.clone(),
        }
    }
}

/// Reservation query filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservationFilter {
    pub agency_id: Option<Uuid>,
    /// Inclusive lower bound on `reservation_date`
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `reservation_date`
    pub date_to: Option<DateTime<Utc>>,
    pub status: Option<ReservationStatus>,
    pub vehicle: Option<VehicleMatch>,
    /// Matched against the joined vehicle
    pub vehicle_type: Option<String>,
    /// Matched against the joined vehicle
    pub serial_number: Option<String>,
    /// Case-insensitive substring over guest names, emails and phones
    pub guest_text: Option<String>,
    /// Booked window `[reservation_date, reservation_date + expected_duration]` contains it
    pub active_at: Option<DateTime<Utc>>,
}

impl ReservationFilter {
    pub fn for_agency(agency_id: Uuid) -> Self {
        Self {
            agency_id: Some(agency_id),
            ..Default::default()
        }
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    pub fn with_status(mut self, status: Option<ReservationStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn with_vehicle(mut self, vehicle_id: Option<Uuid>) -> Self {
        self.vehicle = vehicle_id.map(VehicleMatch::One);
        self
    }

    pub fn with_vehicles(mut self, ids: Vec<Uuid>) -> Self {
        self.vehicle = Some(VehicleMatch::AnyOf(ids));
        self
    }

    pub fn with_vehicle_type(mut self, vehicle_type: Option<String>) -> Self {
        self.vehicle_type = vehicle_type;
        self
    }

    pub fn with_serial_number(mut self, serial_number: Option<String>) -> Self {
        self.serial_number = serial_number;
        self
    }

    pub fn with_guest_text(mut self, text: Option<String>) -> Self {
        self.guest_text = text;
        self
    }

    pub fn active_at(mut self, at: DateTime<Utc>) -> Self {
        self.active_at = Some(at);
        self
    }

    /// Evaluate the filter against one reservation
    pub fn matches(&self, r: &Reservation) -> bool {
        if self.agency_id.is_some_and(|a| a != r.agency_id) {
            return false;
        }
        if self.date_from.is_some_and(|from| r.reservation_date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| r.reservation_date > to) {
            return false;
        }
        if self.status.is_some_and(|s| s != r.status) {
            return false;
        }
        if let Some(vehicle) = &self.vehicle {
            match r.vehicle_id {
                Some(id) if vehicle.contains(id) => {}
                _ => return false,
            }
        }
        if let Some(vehicle_type) = &self.vehicle_type {
            if r.vehicle.as_ref().map(|v| &v.vehicle_type) != Some(vehicle_type) {
                return false;
            }
        }
        if let Some(serial) = &self.serial_number {
            if r.vehicle.as_ref().map(|v| &v.serial_number) != Some(serial) {
                return false;
            }
        }
        if let Some(text) = &self.guest_text {
            if !r.has_guest_matching(text) {
                return false;
            }
        }
        if self.active_at.is_some_and(|at| !r.is_active_at(at)) {
            return false;
        }
        true
    }
}

/// Fleet query filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleFilter {
    pub agency_id: Option<Uuid>,
    pub id: Option<Uuid>,
    pub vehicle_type: Option<String>,
    pub serial_number: Option<String>,
}

impl VehicleFilter {
    pub fn for_agency(agency_id: Uuid) -> Self {
        Self {
            agency_id: Some(agency_id),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: Option<Uuid>) -> Self {
        self.id = id;
        self
    }

    pub fn with_vehicle_type(mut self, vehicle_type: Option<String>) -> Self {
        self.vehicle_type = vehicle_type;
        self
    }

    pub fn with_serial_number(mut self, serial_number: Option<String>) -> Self {
        self.serial_number = serial_number;
        self
    }

    pub fn matches(&self, v: &Vehicle) -> bool {
        self.agency_id.map_or(true, |a| a == v.agency_id)
            && self.id.map_or(true, |id| id == v.id)
            && self
                .vehicle_type
                .as_ref()
                .map_or(true, |t| *t == v.vehicle_type)
            && self
                .serial_number
                .as_ref()
                .map_or(true, |s| *s == v.serial_number)
    }
}
