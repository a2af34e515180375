//! Report handlers
//!
//! Chart endpoints return the series shapes the dashboard charts consume, without the
//! `{data, message}` envelope.

use super::{report_service, ApiSettings};
use crate::dto::{DayQuery, LedgerParams, OptionalRange, RangeQuery, YearQuery};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use fleetdesk_auth::AuthenticatedUser;
use fleetdesk_core::AppError;
use fleetdesk_db::PgPool;
use tracing::{debug, instrument};
use validator::Validate;

/// Daily reservation counts per booking channel
///
/// GET /api/v1/metrics/line-chart
#[instrument(skip(pool, settings, user))]
pub async fn line_chart(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;
    let range = query.to_range(settings.tz)?;

    let series = report_service(&pool, &settings)
        .line_chart(user.agency_id(), &range)
        .await?;

    debug!(days = range.days(), "Line chart computed");
    Ok(HttpResponse::Ok().json(series))
}

/// GET /api/v1/metrics/pie-chart
#[instrument(skip(pool, settings, user))]
pub async fn pie_chart(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;
    let range = query.to_range(settings.tz)?;

    let slices = report_service(&pool, &settings)
        .pie_chart(user.agency_id(), &range)
        .await?;

    Ok(HttpResponse::Ok().json(slices))
}

/// GET /api/v1/metrics/year-usage
#[instrument(skip(pool, settings, user))]
pub async fn year_usage(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    query: web::Query<YearQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;

    let series = report_service(&pool, &settings)
        .year_usage(user.agency_id(), query.year, query.vehicle_id)
        .await?;

    Ok(HttpResponse::Ok().json(series))
}

/// GET /api/v1/metrics/date-range-usage
#[instrument(skip(pool, settings, user))]
pub async fn date_range_usage(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;
    let range = query.to_range(settings.tz)?;

    let series = report_service(&pool, &settings)
        .date_range_usage(user.agency_id(), &range, query.vehicle_id)
        .await?;

    Ok(HttpResponse::Ok().json(series))
}

/// GET /api/v1/metrics/weekday-usage
#[instrument(skip(pool, settings, user))]
pub async fn weekday_usage(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;
    let range = query.to_range(settings.tz)?;

    let series = report_service(&pool, &settings)
        .weekday_usage(user.agency_id(), &range, query.vehicle_id)
        .await?;

    Ok(HttpResponse::Ok().json(series))
}

/// GET /api/v1/metrics/most-used-vehicles
#[instrument(skip(pool, settings, user))]
pub async fn most_used_vehicles(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;
    let range = query.to_range(settings.tz)?;

    let ranking = report_service(&pool, &settings)
        .most_used_vehicles(user.agency_id(), &range)
        .await?;

    Ok(HttpResponse::Ok().json(ranking))
}

/// GET /api/v1/metrics/total-usage
#[instrument(skip(pool, settings, user))]
pub async fn total_usage(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;
    let range = query.to_range(settings.tz)?;

    let total = report_service(&pool, &settings)
        .total_usage(user.agency_id(), &range)
        .await?;

    Ok(HttpResponse::Ok().json(total))
}

/// Revenue and duration ledger, per vehicle when a serial number is given
///
/// GET /api/v1/metrics/vehicles
#[instrument(skip(pool, settings, user))]
pub async fn vehicle_metrics(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    query: web::Query<LedgerParams>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;
    let ledger_query = query.to_query(settings.tz)?;

    let rows = report_service(&pool, &settings)
        .vehicle_metrics(user.agency_id(), &ledger_query)
        .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// GET /api/v1/metrics/top-vehicles
#[instrument(skip(pool, settings, user))]
pub async fn top_vehicles(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    query: web::Query<LedgerParams>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;
    let ledger_query = query.to_query(settings.tz)?;

    let ranking = report_service(&pool, &settings)
        .top_vehicles(user.agency_id(), &ledger_query)
        .await?;

    Ok(HttpResponse::Ok().json(ranking))
}

/// GET /api/v1/metrics/last-month
#[instrument(skip(pool, settings, user))]
pub async fn last_month(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let groups = report_service(&pool, &settings)
        .last_month_by_type(user.agency_id(), Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(groups))
}

/// GET /api/v1/metrics/current-month
#[instrument(skip(pool, settings, user))]
pub async fn current_month(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let summary = report_service(&pool, &settings)
        .current_month_summary(user.agency_id(), Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(summary))
}

/// GET /api/v1/metrics/statuses
#[instrument(skip(pool, settings, user))]
pub async fn statuses(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    query: web::Query<DayQuery>,
) -> Result<HttpResponse, AppError> {
    let day = query.day(settings.tz, Utc::now())?;

    let counts = report_service(&pool, &settings)
        .status_counts(user.agency_id(), day)
        .await?;

    Ok(HttpResponse::Ok().json(counts))
}

/// GET /api/v1/metrics/customer-base
#[instrument(skip(pool, settings, user))]
pub async fn customer_base(
    pool: web::Data<PgPool>,
    settings: web::Data<ApiSettings>,
    user: AuthenticatedUser,
    query: web::Query<OptionalRange>,
) -> Result<HttpResponse, AppError> {
    let range = query.to_range(settings.tz)?;

    let base = report_service(&pool, &settings)
        .customer_base(user.agency_id(), range.as_ref())
        .await?;

    Ok(HttpResponse::Ok().json(base))
}

/// Configure report routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/metrics")
            .route("/line-chart", web::get().to(line_chart))
            .route("/pie-chart", web::get().to(pie_chart))
            .route("/year-usage", web::get().to(year_usage))
            .route("/date-range-usage", web::get().to(date_range_usage))
            .route("/weekday-usage", web::get().to(weekday_usage))
            .route("/most-used-vehicles", web::get().to(most_used_vehicles))
            .route("/total-usage", web::get().to(total_usage))
            .route("/vehicles", web::get().to(vehicle_metrics))
            .route("/top-vehicles", web::get().to(top_vehicles))
            .route("/last-month", web::get().to(last_month))
            .route("/current-month", web::get().to(current_month))
            .route("/statuses", web::get().to(statuses))
            .route("/customer-base", web::get().to(customer_base)),
    );
}
