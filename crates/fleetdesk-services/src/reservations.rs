//! Reservation workflow service
//!
//! Agency-scoped CRUD, lookups, the status lifecycle and card-paid creation. Timestamps are
//! always supplied by the caller.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use fleetdesk_core::{
    models::{
        NewReservation, PaymentRecord, Reservation, ReservationChanges, ReservationFilter,
        ReservationStatus,
    },
    traits::{
        ChargeRequest, PaginatedResponse, PaginationMeta, Pagination, PaymentGateway,
        ReservationRepository, VehicleRepository,
    },
    AppError, AppResult,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::constants::{MAX_CHARGE_CENTS, SECONDS_PER_HOUR};
use crate::metrics::DateRange;

/// Reservation service
pub struct ReservationService<R: ReservationRepository, V: VehicleRepository> {
    reservations: Arc<R>,
    vehicles: Arc<V>,
    tz: Tz,
}

impl<R: ReservationRepository, V: VehicleRepository> ReservationService<R, V> {
    pub fn new(reservations: Arc<R>, vehicles: Arc<V>, tz: Tz) -> Self {
        Self {
            reservations,
            vehicles,
            tz,
        }
    }

    /// Reject vehicles that do not exist or belong to another agency
    async fn ensure_vehicle(&self, agency_id: Uuid, vehicle_id: Option<Uuid>) -> AppResult<()> {
        let Some(id) = vehicle_id else {
            return Ok(());
        };
        match self.vehicles.find_by_id(id).await? {
            Some(vehicle) if vehicle.agency_id == agency_id => Ok(()),
            _ => Err(AppError::VehicleNotFound(id.to_string())),
        }
    }

    fn validate_new(new: &NewReservation) -> AppResult<()> {
        if new.expected_duration <= Decimal::ZERO {
            return Err(AppError::Validation(
                "expected_duration must be positive".to_string(),
            ));
        }
        if new.fee < Decimal::ZERO {
            return Err(AppError::Validation("fee cannot be negative".to_string()));
        }
        if let Some(end) = new.reservation_end_date {
            if end < new.reservation_date {
                return Err(AppError::Validation(
                    "reservation_end_date is before reservation_date".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Create a pending reservation
    #[instrument(skip(self, new))]
    pub async fn create(
        &self,
        agency_id: Uuid,
        new: NewReservation,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        Self::validate_new(&new)?;
        self.ensure_vehicle(agency_id, new.vehicle_id).await?;

        let reservation = Reservation::from_new(agency_id, new, now);
        let created = self.reservations.create(&reservation).await?;

        info!(
            reservation_id = %created.id,
            agency_id = %agency_id,
            "Reservation created"
        );
        Ok(created)
    }

    /// Create a reservation and stamp its pending date
    #[instrument(skip(self, new))]
    pub async fn create_pending(
        &self,
        agency_id: Uuid,
        new: NewReservation,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        Self::validate_new(&new)?;
        self.ensure_vehicle(agency_id, new.vehicle_id).await?;

        let mut reservation = Reservation::from_new(agency_id, new, now);
        reservation.metrics.pending_date = Some(now);
        let created = self.reservations.create(&reservation).await?;

        info!(reservation_id = %created.id, "Pending reservation created");
        Ok(created)
    }

    /// Fetch one reservation of the agency
    #[instrument(skip(self))]
    pub async fn get(&self, agency_id: Uuid, id: Uuid) -> AppResult<Reservation> {
        match self.reservations.find_by_id(id).await? {
            Some(r) if r.agency_id == agency_id => Ok(r),
            _ => Err(AppError::ReservationNotFound(id.to_string())),
        }
    }

    /// One page of reservations, newest first
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        agency_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Reservation>> {
        let (data, total) = self
            .reservations
            .list_for_agency(agency_id, pagination.limit(), pagination.offset())
            .await?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(total, pagination.page, pagination.per_page),
        })
    }

    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        agency_id: Uuid,
        id: Uuid,
        changes: ReservationChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let mut reservation = self.get(agency_id, id).await?;
        self.ensure_vehicle(agency_id, changes.vehicle_id).await?;

        changes.apply(&mut reservation, now);
        if reservation.expected_duration <= Decimal::ZERO {
            return Err(AppError::Validation(
                "expected_duration must be positive".to_string(),
            ));
        }

        self.reservations.update(&reservation).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, agency_id: Uuid, id: Uuid) -> AppResult<()> {
        self.get(agency_id, id).await?;
        if !self.reservations.delete(id).await? {
            return Err(AppError::ReservationNotFound(id.to_string()));
        }
        info!(reservation_id = %id, "Reservation deleted");
        Ok(())
    }

    /// Reservations within a date range and/or with a status
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        agency_id: Uuid,
        range: Option<&DateRange>,
        status: Option<ReservationStatus>,
    ) -> AppResult<Vec<Reservation>> {
        let mut filter = ReservationFilter::for_agency(agency_id).with_status(status);
        if let Some(range) = range {
            let (from, to) = range.query_bounds();
            filter = filter.between(from, to);
        }
        self.reservations.query(&filter).await
    }

    /// Reservations starting on one local calendar day
    #[instrument(skip(self))]
    pub async fn by_date(&self, agency_id: Uuid, day: NaiveDate) -> AppResult<Vec<Reservation>> {
        let range = DateRange::single_day(day, self.tz);
        self.search(agency_id, Some(&range), None).await
    }

    #[instrument(skip(self))]
    pub async fn by_vehicle_and_date(
        &self,
        agency_id: Uuid,
        vehicle_id: Uuid,
        day: NaiveDate,
    ) -> AppResult<Vec<Reservation>> {
        let (from, to) = DateRange::single_day(day, self.tz).query_bounds();
        let filter = ReservationFilter::for_agency(agency_id)
            .between(from, to)
            .with_vehicle(Some(vehicle_id));
        self.reservations.query(&filter).await
    }

    /// Reservations whose booked window contains `now`
    #[instrument(skip(self))]
    pub async fn current(&self, agency_id: Uuid, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        let filter = ReservationFilter::for_agency(agency_id).active_at(now);
        self.reservations.query(&filter).await
    }

    /// Case-insensitive guest lookup by name, email or phone
    #[instrument(skip(self))]
    pub async fn search_guests(&self, agency_id: Uuid, text: &str) -> AppResult<Vec<Reservation>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("search text is empty".to_string()));
        }
        let filter = ReservationFilter::for_agency(agency_id).with_guest_text(Some(text.to_string()));
        self.reservations.query(&filter).await
    }

    async fn transition<F>(
        &self,
        agency_id: Uuid,
        id: Uuid,
        next: ReservationStatus,
        now: DateTime<Utc>,
        effect: F,
    ) -> AppResult<Reservation>
    where
        F: FnOnce(&mut Reservation) + Send,
    {
        let mut reservation = self.get(agency_id, id).await?;
        let from = reservation.status;

        if !from.can_transition_to(next) {
            warn!(
                reservation_id = %id,
                from = %from.as_str(),
                to = %next.as_str(),
                "Rejected status change"
            );
            return Err(AppError::InvalidTransition {
                from: from.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        reservation.status = next;
        reservation.updated_at = now;
        effect(&mut reservation);

        let saved = self.reservations.update(&reservation).await?;
        info!(
            reservation_id = %id,
            from = %from.as_str(),
            to = %next.as_str(),
            "Reservation status changed"
        );
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn mark_pending(&self, agency_id: Uuid, id: Uuid, now: DateTime<Utc>) -> AppResult<Reservation> {
        self.transition(agency_id, id, ReservationStatus::Pending, now, |r| {
            r.metrics.pending_date = Some(now);
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn check_out(&self, agency_id: Uuid, id: Uuid, now: DateTime<Utc>) -> AppResult<Reservation> {
        self.transition(agency_id, id, ReservationStatus::CheckedOut, now, |r| {
            r.metrics.check_out_date = Some(now);
        })
        .await
    }

    /// Check the vehicle back in and derive the actual rental time
    #[instrument(skip(self))]
    pub async fn check_in(&self, agency_id: Uuid, id: Uuid, now: DateTime<Utc>) -> AppResult<Reservation> {
        self.transition(agency_id, id, ReservationStatus::CheckedIn, now, |r| {
            r.metrics.check_in_date = Some(now);
            if let Some(out) = r.metrics.check_out_date {
                let hours = Decimal::from((now - out).num_seconds())
                    / Decimal::from(SECONDS_PER_HOUR);
                let hours = hours.round_dp(2);
                r.metrics.actual_duration = Some(hours);
                r.metrics.time_difference = Some(hours - r.expected_duration);
            }
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn send_to_maintenance(
        &self,
        agency_id: Uuid,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        self.transition(agency_id, id, ReservationStatus::Maintenance, now, |_| {})
            .await
    }

    /// Close the reservation with the amount actually charged
    #[instrument(skip(self))]
    pub async fn finalize(
        &self,
        agency_id: Uuid,
        id: Uuid,
        charged: Decimal,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        if charged < Decimal::ZERO {
            return Err(AppError::Validation(
                "charged amount cannot be negative".to_string(),
            ));
        }
        self.transition(agency_id, id, ReservationStatus::Finalized, now, |r| {
            r.metrics.actual_charged_amount = Some(charged);
            r.metrics.profit_difference = Some(charged - r.fee);
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, agency_id: Uuid, id: Uuid, now: DateTime<Utc>) -> AppResult<Reservation> {
        self.transition(agency_id, id, ReservationStatus::Cancelled, now, |_| {})
            .await
    }

    /// Charge the card for the fee, then store the reservation with its payment
    ///
    /// A charge that succeeds while the insert fails yields
    /// [`AppError::PaymentNotRecorded`] so the charge can be reconciled by hand.
    #[instrument(skip(self, gateway, new, source_token))]
    pub async fn charge_and_create<P: PaymentGateway + ?Sized>(
        &self,
        gateway: &P,
        agency_id: Uuid,
        new: NewReservation,
        source_token: &str,
        currency: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        Self::validate_new(&new)?;
        self.ensure_vehicle(agency_id, new.vehicle_id).await?;

        let amount_cents = (new.fee * Decimal::from(100))
            .round()
            .to_i64()
            .filter(|c| (1..=MAX_CHARGE_CENTS).contains(c))
            .ok_or_else(|| AppError::Validation(format!("fee {} cannot be charged", new.fee)))?;

        let request = ChargeRequest {
            amount_cents,
            currency: currency.to_string(),
            source_token: source_token.to_string(),
            description: format!("Reservation for agency {}", agency_id),
        };
        let receipt = gateway.charge(&request).await?;
        info!(charge_id = %receipt.charge_id, amount_cents, "Card charged");

        let mut reservation = Reservation::from_new(agency_id, new, now);
        reservation.payment = Some(PaymentRecord {
            charge_id: receipt.charge_id.clone(),
            amount_paid: receipt.amount_paid,
            receipt_email: None,
        });

        self.reservations.create(&reservation).await.map_err(|e| {
            error!(
                charge_id = %receipt.charge_id,
                error = %e,
                "Charge succeeded but reservation insert failed"
            );
            AppError::PaymentNotRecorded {
                charge_id: receipt.charge_id.clone(),
                reason: e.to_string(),
            }
        })
    }

    /// Attach a receipt email to the reservation's charge
    #[instrument(skip(self, gateway))]
    pub async fn send_receipt<P: PaymentGateway + ?Sized>(
        &self,
        gateway: &P,
        agency_id: Uuid,
        id: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let mut reservation = self.get(agency_id, id).await?;
        let Some(payment) = reservation.payment.as_mut() else {
            return Err(AppError::Validation(format!(
                "reservation {} has no card payment",
                id
            )));
        };

        gateway.update_receipt_email(&payment.charge_id, email).await?;
        payment.receipt_email = Some(email.to_string());
        reservation.updated_at = now;

        self.reservations.update(&reservation).await
    }
}
