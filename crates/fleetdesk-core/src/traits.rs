//! Common traits for repositories and external collaborators
//!
//! Services receive these as injected dependencies so they can run against PostgreSQL, Redis
//! and Stripe in production and against in-memory doubles in tests.

use crate::error::AppError;
use crate::models::{Reservation, ReservationFilter, Vehicle, VehicleFilter};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Single-entity CRUD operations
#[async_trait]
pub trait Repository<T, ID>: Send + Sync {
    /// Find entity by ID
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, AppError>;

    /// Create a new entity
    async fn create(&self, entity: &T) -> Result<T, AppError>;

    /// Update an existing entity
    async fn update(&self, entity: &T) -> Result<T, AppError>;

    /// Delete entity by ID
    async fn delete(&self, id: ID) -> Result<bool, AppError>;
}

/// Reservation store
///
/// Every read joins the vehicle summary onto the returned reservations.
#[async_trait]
pub trait ReservationRepository: Repository<Reservation, Uuid> {
    /// All reservations matching the filter, ordered by reservation date
    async fn query(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, AppError>;

    /// One page of an agency's reservations, newest first, with the total count
    async fn list_for_agency(
        &self,
        agency_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Reservation>, i64), AppError>;
}

/// Fleet store
#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Vehicle>, AppError>;

    /// Vehicles matching the filter, ordered by name
    async fn list(&self, filter: &VehicleFilter) -> Result<Vec<Vehicle>, AppError>;
}

/// Charge to place with the payment provider
#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    /// Amount in the currency's minor unit
    pub amount_cents: i64,
    pub currency: String,
    /// Card token produced by the provider's client library
    pub source_token: String,
    pub description: String,
}

/// Result of a successful charge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeReceipt {
    pub charge_id: String,
    /// Amount captured, in major units
    pub amount_paid: Decimal,
}

/// Card payment provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, AppError>;

    async fn update_receipt_email(&self, charge_id: &str, email: &str) -> Result<(), AppError>;
}

/// Cache service trait
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Push onto the head of a list and trim it to `cap` entries
    async fn push_capped(&self, key: &str, value: &str, cap: usize) -> Result<(), AppError>;

    /// Up to `count` entries from the head of a list
    async fn list_head(&self, key: &str, count: usize) -> Result<Vec<String>, AppError>;
}

/// Pagination parameters
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 500),
        }
    }

    /// Rows to skip, saturating at `i64::MAX`
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };

        Self {
            total,
            page,
            per_page,
            total_pages,
        }
    }
}
