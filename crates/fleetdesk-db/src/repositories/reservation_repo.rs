//! Reservation repository implementation
//!
//! Every read joins the vehicle so reservations come back with their vehicle summary.
//! Filters are assembled with `QueryBuilder` so each predicate is a bound parameter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetdesk_core::{
    models::{
        PaymentRecord, Reservation, ReservationFilter, ReservationGuest, ReservationMetrics,
        ReservationSource, ReservationStatus, VehicleMatch, VehicleSummary,
    },
    traits::{Repository, ReservationRepository},
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

/// PostgreSQL implementation of ReservationRepository
pub struct PgReservationRepository {
    pool: PgPool,
}

impl PgReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const RESERVATION_COLUMNS: &str = r#"
    r.id, r.agency_id, r.vehicle_id,
    r.reservation_date, r.reservation_end_date,
    r.status, r.source,
    r.expected_duration, r.fee,
    r.guests, r.payment,
    r.pending_date, r.check_out_date, r.check_in_date,
    r.actual_duration, r.actual_charged_amount,
    r.profit_difference, r.time_difference,
    r.created_at, r.updated_at,
    v.name AS vehicle_name, v.vehicle_type, v.serial_number
"#;

const WRITE_COLUMNS: &str = r#"
    id, agency_id, vehicle_id,
    reservation_date, reservation_end_date,
    status, source,
    expected_duration, fee,
    guests, payment,
    pending_date, check_out_date, check_in_date,
    actual_duration, actual_charged_amount,
    profit_difference, time_difference,
    created_at, updated_at
"#;

/// Escape LIKE wildcards and wrap for a substring match
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Append the WHERE clause for `filter`
fn push_filter<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a ReservationFilter) {
    qb.push(" WHERE TRUE");

    if let Some(agency_id) = filter.agency_id {
        qb.push(" AND r.agency_id = ").push_bind(agency_id);
    }
    if let Some(from) = filter.date_from {
        qb.push(" AND r.reservation_date >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND r.reservation_date <= ").push_bind(to);
    }
    if let Some(status) = filter.status {
        qb.push(" AND r.status = ").push_bind(status.as_str());
    }
    match &filter.vehicle {
        Some(VehicleMatch::One(id)) => {
            qb.push(" AND r.vehicle_id = ").push_bind(*id);
        }
        Some(VehicleMatch::AnyOf(ids)) => {
            qb.push(" AND r.vehicle_id = ANY(").push_bind(ids.clone()).push(")");
        }
        None => {}
    }
    if let Some(vehicle_type) = &filter.vehicle_type {
        qb.push(" AND v.vehicle_type = ").push_bind(vehicle_type.as_str());
    }
    if let Some(serial) = &filter.serial_number {
        qb.push(" AND v.serial_number = ").push_bind(serial.as_str());
    }
    if let Some(text) = &filter.guest_text {
        let pattern = like_pattern(text);
        qb.push(" AND EXISTS (SELECT 1 FROM jsonb_array_elements(r.guests) g WHERE ");
        let mut fields = qb.separated(" OR ");
        for field in ["first_name", "last_name", "email", "phone"] {
            fields
                .push(format!("g->>'{}' ILIKE ", field))
                .push_bind_unseparated(pattern.clone());
        }
        qb.push(")");
    }
    if let Some(at) = filter.active_at {
        qb.push(" AND r.reservation_date <= ").push_bind(at);
        qb.push(" AND r.reservation_date + r.expected_duration * INTERVAL '1 hour' >= ")
            .push_bind(at);
    }
}

#[async_trait]
impl Repository<Reservation, Uuid> for PgReservationRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        debug!("Finding reservation by id: {}", id);

        let query = format!(
            "SELECT {} FROM reservations r LEFT JOIN vehicles v ON v.id = r.vehicle_id WHERE r.id = $1",
            RESERVATION_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, ReservationRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error finding reservation {}: {}", id, e);
                AppError::Database(format!("Failed to find reservation: {}", e))
            })?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self, entity), fields(reservation_id = %entity.id))]
    async fn create(&self, entity: &Reservation) -> AppResult<Reservation> {
        debug!("Creating reservation for agency {}", entity.agency_id);

        let query = format!(
            r#"
            WITH r AS (
                INSERT INTO reservations ({})
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                        $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
                RETURNING *
            )
            SELECT {} FROM r LEFT JOIN vehicles v ON v.id = r.vehicle_id
            "#,
            WRITE_COLUMNS, RESERVATION_COLUMNS
        );

        let row = bind_reservation(sqlx::query_as::<Postgres, ReservationRow>(&query), entity)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error creating reservation: {}", e);
                AppError::Database(format!("Failed to create reservation: {}", e))
            })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity), fields(reservation_id = %entity.id))]
    async fn update(&self, entity: &Reservation) -> AppResult<Reservation> {
        debug!("Updating reservation {}", entity.id);

        let query = format!(
            r#"
            WITH r AS (
                UPDATE reservations
                SET agency_id = $2, vehicle_id = $3,
                    reservation_date = $4, reservation_end_date = $5,
                    status = $6, source = $7,
                    expected_duration = $8, fee = $9,
                    guests = $10, payment = $11,
                    pending_date = $12, check_out_date = $13, check_in_date = $14,
                    actual_duration = $15, actual_charged_amount = $16,
                    profit_difference = $17, time_difference = $18,
                    created_at = $19, updated_at = $20
                WHERE id = $1
                RETURNING *
            )
            SELECT {} FROM r LEFT JOIN vehicles v ON v.id = r.vehicle_id
            "#,
            RESERVATION_COLUMNS
        );

        let row = bind_reservation(sqlx::query_as::<Postgres, ReservationRow>(&query), entity)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error updating reservation {}: {}", entity.id, e);
                AppError::Database(format!("Failed to update reservation: {}", e))
            })?;

        row.map(Into::into)
            .ok_or_else(|| AppError::ReservationNotFound(entity.id.to_string()))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        debug!("Deleting reservation {}", id);

        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting reservation {}: {}", id, e);
                AppError::Database(format!("Failed to delete reservation: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    #[instrument(skip(self))]
    async fn query(&self, filter: &ReservationFilter) -> AppResult<Vec<Reservation>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM reservations r LEFT JOIN vehicles v ON v.id = r.vehicle_id",
            RESERVATION_COLUMNS
        ));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY r.reservation_date ASC, r.id ASC");

        let rows = qb
            .build_query_as::<ReservationRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error querying reservations: {}", e);
                AppError::Database(format!("Failed to query reservations: {}", e))
            })?;

        debug!("Reservation query returned {} rows", rows.len());
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn list_for_agency(
        &self,
        agency_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Reservation>, i64)> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reservations WHERE agency_id = $1")
            .bind(agency_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting reservations: {}", e);
                AppError::Database(format!("Failed to count reservations: {}", e))
            })?;

        let query = format!(
            "SELECT {} FROM reservations r LEFT JOIN vehicles v ON v.id = r.vehicle_id \
             WHERE r.agency_id = $1 ORDER BY r.reservation_date DESC, r.id DESC LIMIT $2 OFFSET $3",
            RESERVATION_COLUMNS
        );

        let rows = sqlx::query_as::<Postgres, ReservationRow>(&query)
            .bind(agency_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error listing reservations: {}", e);
                AppError::Database(format!("Failed to fetch reservations: {}", e))
            })?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }
}

type RowQuery<'q> = sqlx::query::QueryAs<'q, Postgres, ReservationRow, sqlx::postgres::PgArguments>;

/// Bind every writable column in `WRITE_COLUMNS` order
fn bind_reservation<'q>(query: RowQuery<'q>, entity: &'q Reservation) -> RowQuery<'q> {
    let metrics = &entity.metrics;
    query
        .bind(entity.id)
        .bind(entity.agency_id)
        .bind(entity.vehicle_id)
        .bind(entity.reservation_date)
        .bind(entity.reservation_end_date)
        .bind(entity.status.as_str())
        .bind(entity.source.map(|s| s.as_str()))
        .bind(entity.expected_duration)
        .bind(entity.fee)
        .bind(Json(&entity.guests))
        .bind(entity.payment.as_ref().map(Json))
        .bind(metrics.pending_date)
        .bind(metrics.check_out_date)
        .bind(metrics.check_in_date)
        .bind(metrics.actual_duration)
        .bind(metrics.actual_charged_amount)
        .bind(metrics.profit_difference)
        .bind(metrics.time_difference)
        .bind(entity.created_at)
        .bind(entity.updated_at)
}

/// Helper struct for mapping database rows to domain model
#[derive(Debug, sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    agency_id: Uuid,
    vehicle_id: Option<Uuid>,
    reservation_date: DateTime<Utc>,
    reservation_end_date: Option<DateTime<Utc>>,
    status: String,
    source: Option<String>,
    expected_duration: Decimal,
    fee: Decimal,
    guests: Json<Vec<ReservationGuest>>,
    payment: Option<Json<PaymentRecord>>,
    pending_date: Option<DateTime<Utc>>,
    check_out_date: Option<DateTime<Utc>>,
    check_in_date: Option<DateTime<Utc>>,
    actual_duration: Option<Decimal>,
    actual_charged_amount: Option<Decimal>,
    profit_difference: Option<Decimal>,
    time_difference: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    vehicle_name: Option<String>,
    vehicle_type: Option<String>,
    serial_number: Option<String>,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        let status = ReservationStatus::parse(&row.status).unwrap_or_else(|| {
            warn!("Reservation {} has unknown status '{}'", row.id, row.status);
            ReservationStatus::default()
        });

        let vehicle = match (row.vehicle_id, row.vehicle_name) {
            (Some(id), Some(name)) => Some(VehicleSummary {
                id,
                name,
                vehicle_type: row.vehicle_type.unwrap_or_default(),
                serial_number: row.serial_number.unwrap_or_default(),
            }),
            _ => None,
        };

        Self {
            id: row.id,
            agency_id: row.agency_id,
            vehicle_id: row.vehicle_id,
            vehicle,
            reservation_date: row.reservation_date,
            reservation_end_date: row.reservation_end_date,
            status,
            source: row.source.as_deref().and_then(ReservationSource::parse),
            expected_duration: row.expected_duration,
            fee: row.fee,
            guests: row.guests.0,
            payment: row.payment.map(|p| p.0),
            metrics: ReservationMetrics {
                pending_date: row.pending_date,
                check_out_date: row.check_out_date,
                check_in_date: row.check_in_date,
                actual_duration: row.actual_duration,
                actual_charged_amount: row.actual_charged_amount,
                profit_difference: row.profit_difference,
                time_difference: row.time_difference,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
