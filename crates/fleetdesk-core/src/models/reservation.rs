//! Reservation model
//!
//! A reservation books one fleet vehicle for an expected number of hours. Its status moves
//! through a small lifecycle and the `metrics` sub-record is filled in as it does.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::vehicle::VehicleSummary;

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Booked, waiting for the guest to pick up the vehicle
    #[default]
    Pending,
    /// Vehicle handed to the guest
    CheckedOut,
    /// Vehicle returned
    CheckedIn,
    /// Vehicle held back for service
    Maintenance,
    /// Charged and closed
    Finalized,
    Cancelled,
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ReservationStatus {
    /// All statuses in lifecycle order
    pub const ALL: [ReservationStatus; 6] = [
        ReservationStatus::Pending,
        ReservationStatus::CheckedOut,
        ReservationStatus::CheckedIn,
        ReservationStatus::Maintenance,
        ReservationStatus::Finalized,
        ReservationStatus::Cancelled,
    ];

    /// Stored and serialized name
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::CheckedOut => "checked_out",
            ReservationStatus::CheckedIn => "checked_in",
            ReservationStatus::Maintenance => "maintenance",
            ReservationStatus::Finalized => "finalized",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    /// Parse from string
    ///
    /// Accepts the stored snake_case names as well as display names such as
    /// `"Checked Out"` and the `"Checked-Out"` spelling.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "pending" => Some(ReservationStatus::Pending),
            "checked_out" | "checkedout" => Some(ReservationStatus::CheckedOut),
            "checked_in" | "checkedin" => Some(ReservationStatus::CheckedIn),
            "maintenance" => Some(ReservationStatus::Maintenance),
            "finalized" => Some(ReservationStatus::Finalized),
            "cancelled" | "canceled" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }

    /// No further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Finalized | ReservationStatus::Cancelled
        )
    }

    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;

        matches!(
            (self, next),
            (Pending, CheckedOut)
                | (Pending, Maintenance)
                | (Pending, Cancelled)
                | (CheckedOut, CheckedIn)
                | (CheckedOut, Maintenance)
                | (CheckedOut, Cancelled)
                | (CheckedIn, Finalized)
                | (CheckedIn, Maintenance)
                | (CheckedIn, Pending)
                | (Maintenance, Pending)
                | (Maintenance, CheckedIn)
                | (Maintenance, Finalized)
                | (Maintenance, Cancelled)
        )
    }
}

/// Booking channel of a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReservationSource {
    /// Booked by staff at the desk
    Helm,
    /// Booked by the guest online
    Consumer,
}

impl fmt::Display for ReservationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ReservationSource {
    pub const ALL: [ReservationSource; 2] = [ReservationSource::Helm, ReservationSource::Consumer];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationSource::Helm => "Helm",
            ReservationSource::Consumer => "Consumer",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "helm" => Some(ReservationSource::Helm),
            "consumer" => Some(ReservationSource::Consumer),
            _ => None,
        }
    }
}

/// Guest listed on a reservation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReservationGuest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ReservationGuest {
    /// Case-insensitive substring match on name, email or phone
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [
            Some(self.first_name.as_str()),
            Some(self.last_name.as_str()),
            self.email.as_deref(),
            self.phone.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Figures collected while a reservation moves through its lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReservationMetrics {
    pub pending_date: Option<DateTime<Utc>>,
    pub check_out_date: Option<DateTime<Utc>>,
    pub check_in_date: Option<DateTime<Utc>>,

    /// Hours between check-out and check-in
    pub actual_duration: Option<Decimal>,

    pub actual_charged_amount: Option<Decimal>,

    /// Charged amount minus the booked fee
    pub profit_difference: Option<Decimal>,

    /// Actual minus expected hours
    pub time_difference: Option<Decimal>,
}

/// Card payment captured for a reservation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub charge_id: String,
    pub amount_paid: Decimal,
    #[serde(default)]
    pub receipt_email: Option<String>,
}

/// Reservation entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,

    /// Owning agency (tenant scope)
    pub agency_id: Uuid,

    pub vehicle_id: Option<Uuid>,

    /// Vehicle fields joined in by the store, read-only
    pub vehicle: Option<VehicleSummary>,

    pub reservation_date: DateTime<Utc>,
    pub reservation_end_date: Option<DateTime<Utc>>,

    pub status: ReservationStatus,

    /// `None` when the stored channel is missing or unrecognized
    pub source: Option<ReservationSource>,

    /// Booked length in hours
    pub expected_duration: Decimal,

    /// Quoted price
    pub fee: Decimal,

    pub guests: Vec<ReservationGuest>,
    pub payment: Option<PaymentRecord>,
    pub metrics: ReservationMetrics,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Build a fresh pending reservation from creation input
    pub fn from_new(agency_id: Uuid, new: NewReservation, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agency_id,
            vehicle_id: new.vehicle_id,
            vehicle: None,
            reservation_date: new.reservation_date,
            reservation_end_date: new.reservation_end_date,
            status: ReservationStatus::Pending,
            source: new.source,
            expected_duration: new.expected_duration,
            fee: new.fee,
            guests: new.guests,
            payment: None,
            metrics: ReservationMetrics::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Instant the booked window closes
    pub fn window_end(&self) -> DateTime<Utc> {
        let seconds = (self.expected_duration * Decimal::from(3600))
            .round()
            .to_i64()
            .unwrap_or(0);
        self.reservation_date + Duration::seconds(seconds)
    }

    /// Whether `at` falls within the booked window, both ends inclusive
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.reservation_date <= at && at <= self.window_end()
    }

    /// Whether any guest matches the search text
    pub fn has_guest_matching(&self, needle: &str) -> bool {
        self.guests.iter().any(|g| g.matches(needle))
    }

    pub fn vehicle_name(&self) -> Option<&str> {
        self.vehicle.as_ref().map(|v| v.name.as_str())
    }
}

/// Input for creating a reservation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReservation {
    pub vehicle_id: Option<Uuid>,
    pub reservation_date: DateTime<Utc>,
    pub reservation_end_date: Option<DateTime<Utc>>,
    pub source: Option<ReservationSource>,
    pub expected_duration: Decimal,
    pub fee: Decimal,
    pub guests: Vec<ReservationGuest>,
}

/// Partial update of the booking fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservationChanges {
    pub vehicle_id: Option<Uuid>,
    pub reservation_date: Option<DateTime<Utc>>,
    pub reservation_end_date: Option<DateTime<Utc>>,
    pub source: Option<ReservationSource>,
    pub expected_duration: Option<Decimal>,
    pub fee: Option<Decimal>,
    pub guests: Option<Vec<ReservationGuest>>,
}

impl ReservationChanges {
    /// Copy every provided field onto `reservation`
    pub fn apply(self, reservation: &mut Reservation, now: DateTime<Utc>) {
        if let Some(vehicle_id) = self.vehicle_id {
            if reservation.vehicle_id != Some(vehicle_id) {
                reservation.vehicle = None;
            }
            reservation.vehicle_id = Some(vehicle_id);
        }
        if let Some(date) = self.reservation_date {
            reservation.reservation_date = date;
        }
        if let Some(end) = self.reservation_end_date {
            reservation.reservation_end_date = Some(end);
        }
        if let Some(source) = self.source {
            reservation.source = Some(source);
        }
        if let Some(hours) = self.expected_duration {
            reservation.expected_duration = hours;
        }
        if let Some(fee) = self.fee {
            reservation.fee = fee;
        }
        if let Some(guests) = self.guests {
            reservation.guests = guests;
        }
        reservation.updated_at = now;
    }
}
