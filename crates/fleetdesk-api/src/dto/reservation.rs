//! Reservation DTOs
//!
//! Request and query types for the reservation endpoints. Responses serialize the
//! `Reservation` model directly.

use super::common::OptionalRange;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use fleetdesk_core::models::{
    NewReservation, ReservationChanges, ReservationGuest, ReservationSource, ReservationStatus,
};
use fleetdesk_core::{AppError, AppResult};
use fleetdesk_services::metrics::DateRange;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Guest attached to a reservation
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GuestRequest {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 40))]
    pub phone: Option<String>,
}

impl From<GuestRequest> for ReservationGuest {
    fn from(req: GuestRequest) -> Self {
        Self {
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email: req.email,
            phone: req.phone,
        }
    }
}

/// Reservation creation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReservationRequest {
    pub vehicle_id: Option<Uuid>,

    pub reservation_date: DateTime<Utc>,

    pub reservation_end_date: Option<DateTime<Utc>>,

    /// `Helm` or `Consumer`; staff-entered bookings default to `Helm`
    pub source: Option<ReservationSource>,

    /// Booked hours
    pub expected_duration: Decimal,

    pub fee: Decimal,

    #[serde(default)]
    #[validate(length(max = 20), nested)]
    pub guests: Vec<GuestRequest>,
}

impl From<CreateReservationRequest> for NewReservation {
    fn from(req: CreateReservationRequest) -> Self {
        Self {
            vehicle_id: req.vehicle_id,
            reservation_date: req.reservation_date,
            reservation_end_date: req.reservation_end_date,
            source: Some(req.source.unwrap_or(ReservationSource::Helm)),
            expected_duration: req.expected_duration,
            fee: req.fee,
            guests: req.guests.into_iter().map(Into::into).collect(),
        }
    }
}

/// Card-paid reservation: the booking plus a Stripe card token
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChargeReservationRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub reservation: CreateReservationRequest,

    #[validate(length(min = 1, max = 255, message = "Card token is required"))]
    pub source_token: String,
}

/// Receipt email for a paid reservation
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReceiptRequest {
    pub reservation_id: Uuid,

    #[validate(email(message = "A valid email is required"))]
    pub email: String,
}

/// Reservation update request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateReservationRequest {
    pub vehicle_id: Option<Uuid>,
    pub reservation_date: Option<DateTime<Utc>>,
    pub reservation_end_date: Option<DateTime<Utc>>,
    pub source: Option<ReservationSource>,
    pub expected_duration: Option<Decimal>,
    pub fee: Option<Decimal>,

    #[validate(length(max = 20), nested)]
    pub guests: Option<Vec<GuestRequest>>,
}

impl From<UpdateReservationRequest> for ReservationChanges {
    fn from(req: UpdateReservationRequest) -> Self {
        Self {
            vehicle_id: req.vehicle_id,
            reservation_date: req.reservation_date,
            reservation_end_date: req.reservation_end_date,
            source: req.source,
            expected_duration: req.expected_duration,
            fee: req.fee,
            guests: req
                .guests
                .map(|guests| guests.into_iter().map(Into::into).collect()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinalizeRequest {
    pub actual_charged_amount: Decimal,
}

/// `GET /reservations/search`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(flatten)]
    pub range: OptionalRange,
    pub status: Option<String>,
}

impl SearchQuery {
    pub fn to_range(&self, tz: Tz) -> AppResult<Option<DateRange>> {
        self.range.to_range(tz)
    }

    /// Status filter; display names such as `Checked Out` are accepted
    pub fn status(&self) -> AppResult<Option<ReservationStatus>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => ReservationStatus::parse(raw)
                .map(Some)
                .ok_or_else(|| AppError::Validation(format!("unknown status '{}'", raw))),
        }
    }
}

/// `GET /reservations/guests?q=`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GuestSearchQuery {
    #[validate(length(min = 1, max = 100, message = "Search text is required"))]
    pub q: String,
}

/// A single local calendar day
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DateQuery {
    #[validate(length(min = 1, message = "date is required"))]
    pub date: String,
}

/// Body of `POST /reservations/searches`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordSearchRequest {
    #[validate(length(min = 1, max = 200, message = "Search text is required"))]
    pub text: String,
}
