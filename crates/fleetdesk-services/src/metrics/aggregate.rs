//! Bucket aggregation
//!
//! Turns reservations into sparse per-bucket accumulations. Everything is collected into
//! `BTreeMap`s, so the result never depends on the order records arrive in.

use fleetdesk_core::models::{Reservation, ReservationSource, ReservationStatus, VehicleSummary};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::calendar::{BucketKey, CalendarGrid};

/// Per-channel reservation counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceCounts {
    pub helm: u64,
    pub consumer: u64,
}

impl SourceCounts {
    pub fn get(&self, source: ReservationSource) -> u64 {
        match source {
            ReservationSource::Helm => self.helm,
            ReservationSource::Consumer => self.consumer,
        }
    }

    fn increment(&mut self, source: ReservationSource) {
        match source {
            ReservationSource::Helm => self.helm += 1,
            ReservationSource::Consumer => self.consumer += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.helm + self.consumer
    }
}

/// Counting-mode result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceTally {
    pub buckets: BTreeMap<BucketKey, SourceCounts>,
    /// Records skipped because their channel is missing or unrecognized
    pub unrecognized: usize,
}

/// Count reservations per bucket and channel
pub fn count_by_source(grid: &CalendarGrid, records: &[Reservation]) -> SourceTally {
    let mut tally = SourceTally::default();

    for record in records {
        match record.source {
            Some(source) => tally
                .buckets
                .entry(grid.bucket_of(record.reservation_date))
                .or_default()
                .increment(source),
            None => tally.unrecognized += 1,
        }
    }

    tally
}

/// Quantity summed by usage reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageMeasure {
    /// Booked hours
    ExpectedDuration,
    /// Hours between check-out and check-in
    ActualDuration,
    /// Amount charged at finalization
    ActualChargedAmount,
}

impl UsageMeasure {
    /// Value contributed by one reservation, zero when not yet recorded
    pub fn of(&self, record: &Reservation) -> Decimal {
        match self {
            UsageMeasure::ExpectedDuration => record.expected_duration,
            UsageMeasure::ActualDuration => record.metrics.actual_duration.unwrap_or_default(),
            UsageMeasure::ActualChargedAmount => {
                record.metrics.actual_charged_amount.unwrap_or_default()
            }
        }
    }
}

/// Summing-mode result, vehicle then bucket
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleUsage {
    pub by_vehicle: BTreeMap<Uuid, BTreeMap<BucketKey, Decimal>>,
    /// Joined vehicle fields seen while summing
    pub vehicles: BTreeMap<Uuid, VehicleSummary>,
    /// Records skipped because no vehicle is assigned
    pub unassigned: usize,
}

/// Sum `measure` per vehicle and bucket
pub fn sum_by_vehicle(
    grid: &CalendarGrid,
    records: &[Reservation],
    measure: UsageMeasure,
) -> VehicleUsage {
    let mut usage = VehicleUsage::default();

    for record in records {
        let Some(vehicle_id) = record.vehicle_id else {
            usage.unassigned += 1;
            continue;
        };
        *usage
            .by_vehicle
            .entry(vehicle_id)
            .or_default()
            .entry(grid.bucket_of(record.reservation_date))
            .or_default() += measure.of(record);

        if let Some(summary) = &record.vehicle {
            usage.vehicles.entry(vehicle_id).or_insert_with(|| summary.clone());
        }
    }

    usage
}

/// Sum `measure` per vehicle over the whole record set
pub fn totals_by_vehicle(records: &[Reservation], measure: UsageMeasure) -> (BTreeMap<Uuid, Decimal>, usize) {
    let mut totals: BTreeMap<Uuid, Decimal> = BTreeMap::new();
    let mut unassigned = 0;

    for record in records {
        match record.vehicle_id {
            Some(id) => *totals.entry(id).or_default() += measure.of(record),
            None => unassigned += 1,
        }
    }

    (totals, unassigned)
}

/// Revenue and timing sums over a set of reservations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerTotals {
    pub reservations: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub actual_charged_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub profit_difference: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub abs_profit_difference: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub actual_duration: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub time_difference: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub abs_time_difference: Decimal,
}

impl LedgerTotals {
    pub fn add(&mut self, record: &Reservation) {
        let metrics = &record.metrics;
        let profit = metrics.profit_difference.unwrap_or_default();
        let time = metrics.time_difference.unwrap_or_default();

        self.reservations += 1;
        self.actual_charged_amount += metrics.actual_charged_amount.unwrap_or_default();
        self.profit_difference += profit;
        self.abs_profit_difference += profit.abs();
        self.actual_duration += metrics.actual_duration.unwrap_or_default();
        self.time_difference += time;
        self.abs_time_difference += time.abs();
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Reservation>) -> Self {
        let mut totals = Self::default();
        for record in records {
            totals.add(record);
        }
        totals
    }
}

/// Ledger totals per vehicle; records without a vehicle are left out
pub fn ledger_by_vehicle(records: &[Reservation]) -> BTreeMap<Uuid, LedgerTotals> {
    let mut ledgers: BTreeMap<Uuid, LedgerTotals> = BTreeMap::new();
    for record in records {
        if let Some(id) = record.vehicle_id {
            ledgers.entry(id).or_default().add(record);
        }
    }
    ledgers
}

/// Reservations of one vehicle type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeGroup {
    pub reservations: u64,
    pub total_charged: Decimal,
    pub reservation_ids: Vec<Uuid>,
}

/// Group by the joined vehicle type; records without a joined vehicle are counted apart
pub fn group_by_vehicle_type(records: &[Reservation]) -> (BTreeMap<String, TypeGroup>, usize) {
    let mut groups: BTreeMap<String, TypeGroup> = BTreeMap::new();
    let mut unassigned = 0;

    for record in records {
        let Some(vehicle) = &record.vehicle else {
            unassigned += 1;
            continue;
        };
        let group = groups.entry(vehicle.vehicle_type.clone()).or_default();
        group.reservations += 1;
        group.total_charged += record.metrics.actual_charged_amount.unwrap_or_default();
        group.reservation_ids.push(record.id);
    }

    for group in groups.values_mut() {
        group.reservation_ids.sort();
    }

    (groups, unassigned)
}

/// Count per status, every status present
pub fn count_by_status(records: &[Reservation]) -> BTreeMap<ReservationStatus, u64> {
    let mut counts: BTreeMap<ReservationStatus, u64> =
        ReservationStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for record in records {
        *counts.entry(record.status).or_default() += 1;
    }
    counts
}
