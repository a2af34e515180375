//! In-memory collaborators shared by the service integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use fleetdesk_core::{
    models::{
        NewReservation, Reservation, ReservationFilter, ReservationSource, Vehicle, VehicleFilter,
    },
    traits::{ChargeReceipt, ChargeRequest, PaymentGateway, Repository, ReservationRepository, VehicleRepository},
    AppError, AppResult,
};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const AGENCY: Uuid = Uuid::from_u128(0xF1EE7);
pub const OTHER_AGENCY: Uuid = Uuid::from_u128(0xBEEF);

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn vehicle(agency_id: Uuid, name: &str, vehicle_type: &str) -> Vehicle {
    Vehicle {
        id: Uuid::new_v4(),
        agency_id,
        name: name.to_string(),
        vehicle_type: vehicle_type.to_string(),
        serial_number: format!("SN-{}", name.to_uppercase().replace(' ', "-")),
        active: true,
        created_at: at(2023, 1, 1, 0),
    }
}

pub fn new_reservation(
    date: DateTime<Utc>,
    source: Option<ReservationSource>,
    vehicle: Option<&Vehicle>,
    hours: i64,
) -> NewReservation {
    NewReservation {
        vehicle_id: vehicle.map(|v| v.id),
        reservation_date: date,
        reservation_end_date: None,
        source,
        expected_duration: Decimal::from(hours),
        fee: Decimal::from(100),
        guests: Vec::new(),
    }
}

/// Reservation and fleet store backed by vectors
///
/// Applies `ReservationFilter::matches` and joins vehicle summaries like the database does.
#[derive(Default)]
pub struct MemoryStore {
    reservations: Mutex<Vec<Reservation>>,
    vehicles: Mutex<Vec<Vehicle>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_vehicle(&self, vehicle: Vehicle) -> Vehicle {
        self.vehicles.lock().unwrap().push(vehicle.clone());
        vehicle
    }

    /// Insert a record directly, bypassing service validation
    pub fn seed(&self, agency_id: Uuid, new: NewReservation) -> Reservation {
        self.seed_with(agency_id, new, |_| {})
    }

    /// Insert a record after adjusting it, e.g. to set status or metrics
    pub fn seed_with(
        &self,
        agency_id: Uuid,
        new: NewReservation,
        adjust: impl FnOnce(&mut Reservation),
    ) -> Reservation {
        let mut record = Reservation::from_new(agency_id, new, at(2023, 12, 1, 0));
        adjust(&mut record);
        self.join(&mut record);
        self.reservations.lock().unwrap().push(record.clone());
        record
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.reservations.lock().unwrap().len()
    }

    fn join(&self, record: &mut Reservation) {
        let vehicles = self.vehicles.lock().unwrap();
        record.vehicle = record
            .vehicle_id
            .and_then(|id| vehicles.iter().find(|v| v.id == id))
            .map(Vehicle::summary);
    }

    fn check_read(&self) -> AppResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Database("connection reset".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("insert rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository<Reservation, Uuid> for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        self.check_read()?;
        Ok(self
            .reservations
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn create(&self, entity: &Reservation) -> AppResult<Reservation> {
        self.check_write()?;
        let mut record = entity.clone();
        self.join(&mut record);
        self.reservations.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update(&self, entity: &Reservation) -> AppResult<Reservation> {
        self.check_write()?;
        let mut record = entity.clone();
        self.join(&mut record);
        let mut reservations = self.reservations.lock().unwrap();
        let slot = reservations
            .iter_mut()
            .find(|r| r.id == entity.id)
            .ok_or_else(|| AppError::NotFound(entity.id.to_string()))?;
        *slot = record.clone();
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        self.check_write()?;
        let mut reservations = self.reservations.lock().unwrap();
        let before = reservations.len();
        reservations.retain(|r| r.id != id);
        Ok(reservations.len() < before)
    }
}

#[async_trait]
impl ReservationRepository for MemoryStore {
    async fn query(&self, filter: &ReservationFilter) -> AppResult<Vec<Reservation>> {
        self.check_read()?;
        let mut found: Vec<Reservation> = self
            .reservations
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.reservation_date);
        Ok(found)
    }

    async fn list_for_agency(
        &self,
        agency_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Reservation>, i64)> {
        self.check_read()?;
        let mut found: Vec<Reservation> = self
            .reservations
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.agency_id == agency_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.reservation_date.cmp(&a.reservation_date));
        let total = found.len() as i64;
        let page = found
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }
}

#[async_trait]
impl VehicleRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        Ok(self
            .vehicles
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.id == id)
            .cloned())
    }

    async fn list(&self, filter: &VehicleFilter) -> AppResult<Vec<Vehicle>> {
        let mut found: Vec<Vehicle> = self
            .vehicles
            .lock()
            .unwrap()
            .iter()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }
}

/// Payment gateway that records what it was asked to do
#[derive(Default)]
pub struct MockGateway {
    pub charges: Mutex<Vec<ChargeRequest>>,
    pub receipts: Mutex<Vec<(String, String)>>,
    pub decline: AtomicBool,
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn charge(&self, request: &ChargeRequest) -> AppResult<ChargeReceipt> {
        if self.decline.load(Ordering::SeqCst) {
            return Err(AppError::Payment("Card declined".to_string()));
        }
        let mut charges = self.charges.lock().unwrap();
        charges.push(request.clone());
        Ok(ChargeReceipt {
            charge_id: format!("ch_{}", charges.len()),
            amount_paid: Decimal::new(request.amount_cents, 2),
        })
    }

    async fn update_receipt_email(&self, charge_id: &str, email: &str) -> AppResult<()> {
        self.receipts
            .lock()
            .unwrap()
            .push((charge_id.to_string(), email.to_string()));
        Ok(())
    }
}
