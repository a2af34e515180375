//! Vehicle repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetdesk_core::{
    models::{Vehicle, VehicleFilter},
    traits::VehicleRepository,
    AppError, AppResult,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of VehicleRepository
pub struct PgVehicleRepository {
    pool: PgPool,
}

impl PgVehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const VEHICLE_SELECT: &str =
    "SELECT id, agency_id, name, vehicle_type, serial_number, active, created_at FROM vehicles";

#[async_trait]
impl VehicleRepository for PgVehicleRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        debug!("Finding vehicle by id: {}", id);

        let query = format!("{} WHERE id = $1", VEHICLE_SELECT);
        let row = sqlx::query_as::<Postgres, VehicleRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error finding vehicle {}: {}", id, e);
                AppError::Database(format!("Failed to find vehicle: {}", e))
            })?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &VehicleFilter) -> AppResult<Vec<Vehicle>> {
        let mut qb = QueryBuilder::<Postgres>::new(VEHICLE_SELECT);
        qb.push(" WHERE TRUE");
        if let Some(agency_id) = filter.agency_id {
            qb.push(" AND agency_id = ").push_bind(agency_id);
        }
        if let Some(id) = filter.id {
            qb.push(" AND id = ").push_bind(id);
        }
        if let Some(vehicle_type) = &filter.vehicle_type {
            qb.push(" AND vehicle_type = ").push_bind(vehicle_type.as_str());
        }
        if let Some(serial) = &filter.serial_number {
            qb.push(" AND serial_number = ").push_bind(serial.as_str());
        }
        qb.push(" ORDER BY name ASC, id ASC");

        let rows = qb
            .build_query_as::<VehicleRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error listing vehicles: {}", e);
                AppError::Database(format!("Failed to list vehicles: {}", e))
            })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping database rows to domain model
#[derive(Debug, sqlx::FromRow)]
struct VehicleRow {
    id: Uuid,
    agency_id: Uuid,
    name: String,
    vehicle_type: String,
    serial_number: String,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<VehicleRow> for Vehicle {
    fn from(row: VehicleRow) -> Self {
        Self {
            id: row.id,
            agency_id: row.agency_id,
            name: row.name,
            vehicle_type: row.vehicle_type,
            serial_number: row.serial_number,
            active: row.active,
            created_at: row.created_at,
        }
    }
}
