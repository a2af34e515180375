//! Report service
//!
//! Runs the metrics pipeline against the reservation store: build the grid, query the store
//! once, aggregate, fill, format. Every report is scoped to one agency, and any time
//! reference such as "now" or "today" is passed in by the caller.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use fleetdesk_core::{
    config::DEFAULT_MAX_RANGE_DAYS,
    models::{Reservation, ReservationFilter, ReservationStatus, Vehicle, VehicleFilter},
    traits::{ReservationRepository, VehicleRepository},
    AppError, AppResult,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::metrics::{
    count_by_source, count_by_status, fill_gaps, fill_groups, group_by_vehicle_type,
    labeled_series, ledger_by_vehicle, line_chart, pie_chart,
    calendar::local_midnight, sum_by_vehicle, totals_by_vehicle, CalendarGrid, DateRange,
    LabeledSeries, LedgerTotals, PieSlice, SourceCounts, TimeSeries, UsageMeasure,
};

/// Booked hours of one vehicle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleHours {
    pub vehicle_id: Uuid,
    pub vehicle_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub hours: Decimal,
}

/// Booked hours across the fleet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageTotal {
    #[serde(with = "rust_decimal::serde::float")]
    pub hours: Decimal,
}

/// Filters for ledger reports
#[derive(Debug, Clone, Default)]
pub struct LedgerQuery {
    pub range: Option<DateRange>,
    pub vehicle_type: Option<String>,
    pub serial_number: Option<String>,
}

/// Ledger row; the vehicle fields are empty on the fleet-wide row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleLedger {
    pub vehicle_id: Option<Uuid>,
    pub vehicle_name: Option<String>,
    pub serial_number: Option<String>,
    #[serde(flatten)]
    pub totals: LedgerTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopVehicle {
    pub vehicle_id: Uuid,
    pub vehicle_name: String,
    pub vehicle_type: String,
    pub serial_number: String,
    pub reservations: u64,
    /// Sum of charged amounts
    #[serde(with = "rust_decimal::serde::float")]
    pub total_profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleTypeMonth {
    pub vehicle_type: String,
    pub reservations: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_charged: Decimal,
    pub reservation_ids: Vec<Uuid>,
}

/// Month-to-date revenue and usage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthToDate {
    pub reservations: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_charged: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_hours: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: ReservationStatus,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerBase {
    pub finalized: u64,
}

/// Report service
pub struct ReportService<R: ReservationRepository, V: VehicleRepository> {
    reservations: Arc<R>,
    vehicles: Arc<V>,
    tz: Tz,
    max_range_days: i64,
}

impl<R: ReservationRepository, V: VehicleRepository> ReportService<R, V> {
    pub fn new(reservations: Arc<R>, vehicles: Arc<V>, tz: Tz) -> Self {
        Self {
            reservations,
            vehicles,
            tz,
            max_range_days: DEFAULT_MAX_RANGE_DAYS,
        }
    }

    /// Cap the number of days a day-bucketed report may span
    pub fn with_max_range_days(mut self, max_range_days: i64) -> Self {
        self.max_range_days = max_range_days;
        self
    }

    fn day_grid(&self, range: &DateRange) -> AppResult<CalendarGrid> {
        range.ensure_at_most(self.max_range_days)?;
        CalendarGrid::days(range)
    }

    /// Reporting timezone
    pub fn tz(&self) -> Tz {
        self.tz
    }

    async fn fetch(&self, filter: &ReservationFilter) -> AppResult<Vec<Reservation>> {
        let records = self.reservations.query(filter).await?;
        debug!("Store returned {} reservations", records.len());
        Ok(records)
    }

    async fn fetch_range(&self, agency_id: Uuid, range: &DateRange) -> AppResult<Vec<Reservation>> {
        let (from, to) = range.query_bounds();
        self.fetch(&ReservationFilter::for_agency(agency_id).between(from, to))
            .await
    }

    /// The agency's fleet, or the single requested vehicle
    async fn fleet(&self, agency_id: Uuid, vehicle_id: Option<Uuid>) -> AppResult<Vec<Vehicle>> {
        let vehicles = self
            .vehicles
            .list(&VehicleFilter::for_agency(agency_id).with_id(vehicle_id))
            .await?;

        match vehicle_id {
            Some(id) if vehicles.is_empty() => Err(AppError::VehicleNotFound(id.to_string())),
            _ => Ok(vehicles),
        }
    }

    fn source_counts(
        &self,
        agency_id: Uuid,
        grid: &CalendarGrid,
        records: &[Reservation],
    ) -> AppResult<Vec<(crate::metrics::BucketKey, SourceCounts)>> {
        let tally = count_by_source(grid, records);
        if tally.unrecognized > 0 {
            warn!(
                agency_id = %agency_id,
                dropped = tally.unrecognized,
                "Reservations without a recognized source left out of channel counts"
            );
        }
        fill_gaps(grid, &tally.buckets)
    }

    /// Daily reservation counts per channel
    #[instrument(skip(self))]
    pub async fn line_chart(&self, agency_id: Uuid, range: &DateRange) -> AppResult<Vec<TimeSeries>> {
        let grid = self.day_grid(range)?;
        let records = self.fetch_range(agency_id, range).await?;
        let filled = self.source_counts(agency_id, &grid, &records)?;
        line_chart(&grid, &filled)
    }

    /// Reservation totals per channel
    #[instrument(skip(self))]
    pub async fn pie_chart(&self, agency_id: Uuid, range: &DateRange) -> AppResult<Vec<PieSlice>> {
        let grid = self.day_grid(range)?;
        let records = self.fetch_range(agency_id, range).await?;
        let filled = self.source_counts(agency_id, &grid, &records)?;
        Ok(pie_chart(&filled))
    }

    /// Booked hours per vehicle and month of `year`
    #[instrument(skip(self))]
    pub async fn year_usage(
        &self,
        agency_id: Uuid,
        year: i32,
        vehicle_id: Option<Uuid>,
    ) -> AppResult<Vec<LabeledSeries>> {
        let range = DateRange::year(year, self.tz)?;
        let grid = CalendarGrid::months(self.tz);
        self.usage_series(agency_id, &range, &grid, vehicle_id).await
    }

    /// Booked hours per vehicle and day of the range
    #[instrument(skip(self))]
    pub async fn date_range_usage(
        &self,
        agency_id: Uuid,
        range: &DateRange,
        vehicle_id: Option<Uuid>,
    ) -> AppResult<Vec<LabeledSeries>> {
        let grid = self.day_grid(range)?;
        self.usage_series(agency_id, range, &grid, vehicle_id).await
    }

    /// Booked hours per vehicle and day of week over the range
    #[instrument(skip(self))]
    pub async fn weekday_usage(
        &self,
        agency_id: Uuid,
        range: &DateRange,
        vehicle_id: Option<Uuid>,
    ) -> AppResult<Vec<LabeledSeries>> {
        let grid = CalendarGrid::weekdays(self.tz);
        self.usage_series(agency_id, range, &grid, vehicle_id).await
    }

    async fn usage_series(
        &self,
        agency_id: Uuid,
        range: &DateRange,
        grid: &CalendarGrid,
        vehicle_id: Option<Uuid>,
    ) -> AppResult<Vec<LabeledSeries>> {
        let fleet = self.fleet(agency_id, vehicle_id).await?;

        let (from, to) = range.query_bounds();
        let filter = ReservationFilter::for_agency(agency_id)
            .between(from, to)
            .with_vehicle(vehicle_id);
        let records = self.fetch(&filter).await?;

        let usage = sum_by_vehicle(grid, &records, UsageMeasure::ExpectedDuration);
        if usage.unassigned > 0 {
            warn!(
                agency_id = %agency_id,
                dropped = usage.unassigned,
                "Reservations without a vehicle left out of usage series"
            );
        }

        let mut names: HashMap<Uuid, String> = usage
            .vehicles
            .iter()
            .map(|(id, v)| (*id, v.name.clone()))
            .collect();
        names.extend(fleet.iter().map(|v| (v.id, v.name.clone())));

        let filled = fill_groups(grid, &usage.by_vehicle, fleet.iter().map(|v| v.id))?;

        let mut series = filled
            .into_iter()
            .map(|(id, values)| {
                let name = names.get(&id).cloned().unwrap_or_else(|| id.to_string());
                labeled_series(grid, name, &values).map(|s| (id, s))
            })
            .collect::<AppResult<Vec<_>>>()?;
        series.sort_by(|(a_id, a), (b_id, b)| a.key.cmp(&b.key).then(a_id.cmp(b_id)));

        Ok(series.into_iter().map(|(_, s)| s).collect())
    }

    /// Fleet ranked by booked hours
    #[instrument(skip(self))]
    pub async fn most_used_vehicles(&self, agency_id: Uuid, range: &DateRange) -> AppResult<Vec<VehicleHours>> {
        let fleet = self.fleet(agency_id, None).await?;
        let records = self.fetch_range(agency_id, range).await?;
        let (totals, _) = totals_by_vehicle(&records, UsageMeasure::ExpectedDuration);

        let mut ranked: Vec<VehicleHours> = fleet
            .iter()
            .map(|v| VehicleHours {
                vehicle_id: v.id,
                vehicle_name: v.name.clone(),
                hours: totals.get(&v.id).copied().unwrap_or_default(),
            })
            .collect();

        // vehicles that left the fleet but still carry usage in the range
        for record in &records {
            let (Some(id), Some(summary)) = (record.vehicle_id, &record.vehicle) else {
                continue;
            };
            if !ranked.iter().any(|r| r.vehicle_id == id) {
                ranked.push(VehicleHours {
                    vehicle_id: id,
                    vehicle_name: summary.name.clone(),
                    hours: totals.get(&id).copied().unwrap_or_default(),
                });
            }
        }

        ranked.sort_by(|a, b| {
            b.hours
                .cmp(&a.hours)
                .then_with(|| a.vehicle_name.cmp(&b.vehicle_name))
        });
        Ok(ranked)
    }

    /// Total booked hours over the range
    #[instrument(skip(self))]
    pub async fn total_usage(&self, agency_id: Uuid, range: &DateRange) -> AppResult<UsageTotal> {
        let records = self.fetch_range(agency_id, range).await?;
        let hours = records
            .iter()
            .map(|r| UsageMeasure::ExpectedDuration.of(r))
            .sum();
        Ok(UsageTotal { hours })
    }

    fn ledger_filter(agency_id: Uuid, query: &LedgerQuery) -> ReservationFilter {
        let mut filter = ReservationFilter::for_agency(agency_id)
            .with_vehicle_type(query.vehicle_type.clone())
            .with_serial_number(query.serial_number.clone());
        if let Some(range) = &query.range {
            let (from, to) = range.query_bounds();
            filter = filter.between(from, to);
        }
        filter
    }

    /// Revenue and timing sums, per vehicle when a serial number is given
    #[instrument(skip(self))]
    pub async fn vehicle_metrics(&self, agency_id: Uuid, query: &LedgerQuery) -> AppResult<Vec<VehicleLedger>> {
        let records = self.fetch(&Self::ledger_filter(agency_id, query)).await?;

        if query.serial_number.is_none() {
            return Ok(vec![VehicleLedger {
                vehicle_id: None,
                vehicle_name: None,
                serial_number: None,
                totals: LedgerTotals::from_records(&records),
            }]);
        }

        let summaries: HashMap<Uuid, _> = records
            .iter()
            .filter_map(|r| Some((r.vehicle_id?, r.vehicle.as_ref()?)))
            .collect();

        Ok(ledger_by_vehicle(&records)
            .into_iter()
            .map(|(id, totals)| {
                let summary = summaries.get(&id);
                VehicleLedger {
                    vehicle_id: Some(id),
                    vehicle_name: summary.map(|v| v.name.clone()),
                    serial_number: summary.map(|v| v.serial_number.clone()),
                    totals,
                }
            })
            .collect())
    }

    /// Vehicles ranked by charged amount
    #[instrument(skip(self))]
    pub async fn top_vehicles(&self, agency_id: Uuid, query: &LedgerQuery) -> AppResult<Vec<TopVehicle>> {
        let records = self.fetch(&Self::ledger_filter(agency_id, query)).await?;

        let mut by_vehicle: BTreeMap<Uuid, TopVehicle> = BTreeMap::new();
        for record in &records {
            let (Some(id), Some(summary)) = (record.vehicle_id, &record.vehicle) else {
                continue;
            };
            let entry = by_vehicle.entry(id).or_insert_with(|| TopVehicle {
                vehicle_id: id,
                vehicle_name: summary.name.clone(),
                vehicle_type: summary.vehicle_type.clone(),
                serial_number: summary.serial_number.clone(),
                reservations: 0,
                total_profit: Decimal::ZERO,
            });
            entry.reservations += 1;
            entry.total_profit += UsageMeasure::ActualChargedAmount.of(record);
        }

        let mut ranked: Vec<TopVehicle> = by_vehicle.into_values().collect();
        ranked.sort_by(|a, b| {
            b.total_profit
                .cmp(&a.total_profit)
                .then_with(|| a.vehicle_name.cmp(&b.vehicle_name))
        });
        Ok(ranked)
    }

    /// Previous calendar month grouped by vehicle type
    #[instrument(skip(self))]
    pub async fn last_month_by_type(
        &self,
        agency_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<VehicleTypeMonth>> {
        let today = now.with_timezone(&self.tz).date_naive();
        let last_month = today
            .with_day(1)
            .and_then(|first| first.pred_opt())
            .ok_or_else(|| AppError::InvalidRange(format!("no month before {}", today)))?;
        let range = DateRange::month_of(last_month, self.tz)?;

        let records = self.fetch_range(agency_id, &range).await?;
        let (groups, unassigned) = group_by_vehicle_type(&records);
        if unassigned > 0 {
            warn!(
                agency_id = %agency_id,
                dropped = unassigned,
                "Reservations without a vehicle left out of type breakdown"
            );
        }

        Ok(groups
            .into_iter()
            .map(|(vehicle_type, group)| VehicleTypeMonth {
                vehicle_type,
                reservations: group.reservations,
                total_charged: group.total_charged,
                reservation_ids: group.reservation_ids,
            })
            .collect())
    }

    /// Charged amount and actual hours from the first of the month up to `now`
    #[instrument(skip(self))]
    pub async fn current_month_summary(&self, agency_id: Uuid, now: DateTime<Utc>) -> AppResult<MonthToDate> {
        let today = now.with_timezone(&self.tz).date_naive();
        let first = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
        let filter = ReservationFilter::for_agency(agency_id).between(local_midnight(first, self.tz), now);
        let records = self.fetch(&filter).await?;

        Ok(MonthToDate {
            reservations: records.len() as u64,
            total_charged: records
                .iter()
                .map(|r| UsageMeasure::ActualChargedAmount.of(r))
                .sum(),
            total_hours: records.iter().map(|r| UsageMeasure::ActualDuration.of(r)).sum(),
        })
    }

    /// Reservations per status on one day
    #[instrument(skip(self))]
    pub async fn status_counts(&self, agency_id: Uuid, day: NaiveDate) -> AppResult<Vec<StatusCount>> {
        let range = DateRange::single_day(day, self.tz);
        let records = self.fetch_range(agency_id, &range).await?;

        Ok(count_by_status(&records)
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect())
    }

    /// Number of finalized reservations
    #[instrument(skip(self))]
    pub async fn customer_base(&self, agency_id: Uuid, range: Option<&DateRange>) -> AppResult<CustomerBase> {
        let mut filter =
            ReservationFilter::for_agency(agency_id).with_status(Some(ReservationStatus::Finalized));
        if let Some(range) = range {
            let (from, to) = range.query_bounds();
            filter = filter.between(from, to);
        }
        let records = self.fetch(&filter).await?;
        Ok(CustomerBase {
            finalized: records.len() as u64,
        })
    }
}
