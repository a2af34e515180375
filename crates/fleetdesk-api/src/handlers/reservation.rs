//! Reservation handlers
//!
//! CRUD, lookups, lifecycle transitions, card payments and recent searches. Every route is
//! scoped to the agency in the caller's token.

use super::{reservation_service, ApiSettings};
use crate::dto::{
    parse_day, ApiResponse, ChargeReservationRequest, CreateReservationRequest, DateQuery,
    FinalizeRequest, GuestSearchQuery, PaginationParams, ReceiptRequest, RecordSearchRequest,
    SearchQuery, UpdateReservationRequest,
};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use fleetdesk_auth::{AuthenticatedUser, ManagerUser};
use fleetdesk_cache::RedisCache;
use fleetdesk_core::traits::Pagination;
use fleetdesk_core::AppError;
use fleetdesk_db::PgPool;
use fleetdesk_services::{SearchHistory, StripeGateway};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// List reservations, newest first
///
/// GET /api/v1/reservations
#[instrument(skip(pool, settings, user))]
pub async fn list_reservations(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;

    let page = reservation_service(&pool, &settings)
        .list(user.agency_id(), Pagination::from(&query.into_inner()))
        .await?;

    Ok(HttpResponse::Ok().json(page))
}

/// POST /api/v1/reservations
#[instrument(skip(pool, settings, user, req))]
pub async fn create_reservation(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    req: web::Json<CreateReservationRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Reservation validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let created = reservation_service(&pool, &settings)
        .create(user.agency_id(), req.into_inner().into(), Utc::now())
        .await?;

    info!(id = %created.id, "Reservation created");
    Ok(HttpResponse::Created().json(ApiResponse::with_message(created, "Reservation created")))
}

/// Create a reservation that starts out pending
///
/// POST /api/v1/reservations/pending
#[instrument(skip(pool, settings, user, req))]
pub async fn create_pending_reservation(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    req: web::Json<CreateReservationRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let created = reservation_service(&pool, &settings)
        .create_pending(user.agency_id(), req.into_inner().into(), Utc::now())
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        created,
        "Pending reservation created",
    )))
}

/// Charge the guest's card, then store the reservation
///
/// POST /api/v1/reservations/charge
#[instrument(skip(pool, settings, gateway, user, req))]
pub async fn charge_reservation(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    gateway: Option<web::Data<Arc<StripeGateway>>>,
    user: AuthenticatedUser,
    req: web::Json<ChargeReservationRequest>,
) -> Result<HttpResponse, AppError> {
    let gateway = gateway
        .ok_or_else(|| AppError::Config("card payments are not configured".to_string()))?;
    req.validate()?;

    let ChargeReservationRequest {
        reservation,
        source_token,
    } = req.into_inner();

    let created = reservation_service(&pool, &settings)
        .charge_and_create(
            gateway.get_ref().as_ref(),
            user.agency_id(),
            reservation.into(),
            &source_token,
            &settings.currency,
            Utc::now(),
        )
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(created, "Payment captured")))
}

/// Attach a receipt email to the reservation's charge
///
/// POST /api/v1/reservations/receipt
#[instrument(skip(pool, settings, gateway, user, req))]
pub async fn send_receipt(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    gateway: Option<web::Data<Arc<StripeGateway>>>,
    user: AuthenticatedUser,
    req: web::Json<ReceiptRequest>,
) -> Result<HttpResponse, AppError> {
    let gateway = gateway
        .ok_or_else(|| AppError::Config("card payments are not configured".to_string()))?;
    req.validate()?;

    let updated = reservation_service(&pool, &settings)
        .send_receipt(
            gateway.get_ref().as_ref(),
            user.agency_id(),
            req.reservation_id,
            &req.email,
            Utc::now(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(updated, "Receipt sent")))
}

/// GET /api/v1/reservations/search
#[instrument(skip(pool, settings, user))]
pub async fn search_reservations(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let range = query.to_range(settings.tz)?;
    let status = query.status()?;

    let found = reservation_service(&pool, &settings)
        .search(user.agency_id(), range.as_ref(), status)
        .await?;

    debug!(count = found.len(), "Reservation search");
    Ok(HttpResponse::Ok().json(ApiResponse::success(found)))
}

/// GET /api/v1/reservations/guests?q=
#[instrument(skip(pool, settings, user))]
pub async fn search_guests(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    query: web::Query<GuestSearchQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;

    let found = reservation_service(&pool, &settings)
        .search_guests(user.agency_id(), &query.q)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(found)))
}

/// GET /api/v1/reservations/by-date?date=
#[instrument(skip(pool, settings, user))]
pub async fn reservations_by_date(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;
    let day = parse_day(&query.date, settings.tz)?;

    let found = reservation_service(&pool, &settings)
        .by_date(user.agency_id(), day)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(found)))
}

/// GET /api/v1/reservations/vehicle/{vehicle_id}?date=
#[instrument(skip(pool, settings, user))]
pub async fn reservations_by_vehicle(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;
    let day = parse_day(&query.date, settings.tz)?;

    let found = reservation_service(&pool, &settings)
        .by_vehicle_and_date(user.agency_id(), path.into_inner(), day)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(found)))
}

/// Reservations whose booked window contains the current instant
///
/// GET /api/v1/reservations/current
#[instrument(skip(pool, settings, user))]
pub async fn current_reservations(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let found = reservation_service(&pool, &settings)
        .current(user.agency_id(), Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(found)))
}

/// GET /api/v1/reservations/searches/recent
#[instrument(skip(cache, settings, user))]
pub async fn recent_searches(
    cache: web::Data<Arc<RedisCache>>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let history = SearchHistory::new(cache.get_ref().clone(), settings.recent_searches_limit);
    let searches = history.recent(user.agency_id()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(searches)))
}

/// POST /api/v1/reservations/searches
#[instrument(skip(cache, settings, user, req))]
pub async fn record_search(
    cache: web::Data<Arc<RedisCache>>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    req: web::Json<RecordSearchRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let history = SearchHistory::new(cache.get_ref().clone(), settings.recent_searches_limit);
    history.record(user.agency_id(), &req.text).await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        req.text.trim().to_string(),
        "Search recorded",
    )))
}

/// GET /api/v1/reservations/{id}
#[instrument(skip(pool, settings, user))]
pub async fn get_reservation(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let reservation = reservation_service(&pool, &settings)
        .get(user.agency_id(), path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(reservation)))
}

/// PUT /api/v1/reservations/{id}
#[instrument(skip(pool, settings, user, req))]
pub async fn update_reservation(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    req: web::Json<UpdateReservationRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let updated = reservation_service(&pool, &settings)
        .update(
            user.agency_id(),
            path.into_inner(),
            req.into_inner().into(),
            Utc::now(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(updated, "Reservation updated")))
}

/// Managers only
///
/// DELETE /api/v1/reservations/{id}
#[instrument(skip(pool, settings, manager))]
pub async fn delete_reservation(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    manager: ManagerUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    reservation_service(&pool, &settings)
        .delete(manager.agency_id(), id)
        .await?;

    info!(id = %id, subject = %manager.subject(), "Reservation deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// PUT /api/v1/reservations/{id}/check-out
#[instrument(skip(pool, settings, user))]
pub async fn check_out(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let updated = reservation_service(&pool, &settings)
        .check_out(user.agency_id(), path.into_inner(), Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(updated, "Vehicle checked out")))
}

/// PUT /api/v1/reservations/{id}/check-in
#[instrument(skip(pool, settings, user))]
pub async fn check_in(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let updated = reservation_service(&pool, &settings)
        .check_in(user.agency_id(), path.into_inner(), Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(updated, "Vehicle checked in")))
}

/// PUT /api/v1/reservations/{id}/pending
#[instrument(skip(pool, settings, user))]
pub async fn mark_pending(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let updated = reservation_service(&pool, &settings)
        .mark_pending(user.agency_id(), path.into_inner(), Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(updated, "Reservation pending")))
}

/// PUT /api/v1/reservations/{id}/maintenance
#[instrument(skip(pool, settings, user))]
pub async fn send_to_maintenance(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let updated = reservation_service(&pool, &settings)
        .send_to_maintenance(user.agency_id(), path.into_inner(), Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(updated, "Vehicle in maintenance")))
}

/// PUT /api/v1/reservations/{id}/finalize
#[instrument(skip(pool, settings, user, req))]
pub async fn finalize(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    req: web::Json<FinalizeRequest>,
) -> Result<HttpResponse, AppError> {
    let updated = reservation_service(&pool, &settings)
        .finalize(
            user.agency_id(),
            path.into_inner(),
            req.actual_charged_amount,
            Utc::now(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(updated, "Reservation finalized")))
}

/// PUT /api/v1/reservations/{id}/cancel
#[instrument(skip(pool, settings, user))]
pub async fn cancel(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let updated = reservation_service(&pool, &settings)
        .cancel(user.agency_id(), path.into_inner(), Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(updated, "Reservation cancelled")))
}

/// Configure reservation routes
///
/// Fixed paths are registered before `/{id}` so they are not captured by it.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reservations")
            .route("", web::get().to(list_reservations))
            .route("", web::post().to(create_reservation))
            .route("/pending", web::post().to(create_pending_reservation))
            .route("/charge", web::post().to(charge_reservation))
            .route("/receipt", web::post().to(send_receipt))
            .route("/search", web::get().to(search_reservations))
            .route("/guests", web::get().to(search_guests))
            .route("/by-date", web::get().to(reservations_by_date))
            .route("/current", web::get().to(current_reservations))
            .route("/vehicle/{vehicle_id}", web::get().to(reservations_by_vehicle))
            .route("/searches/recent", web::get().to(recent_searches))
            .route("/searches", web::post().to(record_search))
            .route("/{id}", web::get().to(get_reservation))
            .route("/{id}", web::put().to(update_reservation))
            .route("/{id}", web::delete().to(delete_reservation))
            .route("/{id}/check-out", web::put().to(check_out))
            .route("/{id}/check-in", web::put().to(check_in))
            .route("/{id}/pending", web::put().to(mark_pending))
            .route("/{id}/maintenance", web::put().to(send_to_maintenance))
            .route("/{id}/finalize", web::put().to(finalize))
            .route("/{id}/cancel", web::put().to(cancel)),
    );
}
