//! Benchmarks for the report pipeline
//!
//! Run with: cargo bench --package fleetdesk-services
//!
//! These measure grid construction, aggregation, gap filling and formatting over in-memory
//! records (no store access).

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::America::New_York;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fleetdesk_core::models::{NewReservation, Reservation, ReservationSource, VehicleSummary};
use fleetdesk_services::metrics::{
    count_by_source, fill_gaps, fill_groups, labeled_series, line_chart, sum_by_vehicle,
    CalendarGrid, DateRange, UsageMeasure,
};
use rust_decimal::Decimal;
use uuid::Uuid;

fn fleet(size: usize) -> Vec<VehicleSummary> {
    (0..size)
        .map(|i| VehicleSummary {
            id: Uuid::new_v4(),
            name: format!("Vehicle {}", i),
            vehicle_type: if i % 2 == 0 { "boat" } else { "jet ski" }.to_string(),
            serial_number: format!("SN-{:04}", i),
        })
        .collect()
}

/// Records spread over 2024, one every few hours
fn create_records(count: usize, vehicles: &[VehicleSummary]) -> Vec<Reservation> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let vehicle = &vehicles[i % vehicles.len()];
            let source = match i % 5 {
                0 => None,
                1 | 2 => Some(ReservationSource::Helm),
                _ => Some(ReservationSource::Consumer),
            };
            let mut r = Reservation::from_new(
                Uuid::nil(),
                NewReservation {
                    vehicle_id: Some(vehicle.id),
                    reservation_date: start + Duration::hours((i as i64 * 7) % 8700),
                    reservation_end_date: None,
                    source,
                    expected_duration: Decimal::from(1 + (i % 6) as i64),
                    fee: Decimal::from(150),
                    guests: Vec::new(),
                },
                start,
            );
            r.vehicle = Some(vehicle.clone());
            r
        })
        .collect()
}

fn year_range() -> DateRange {
    DateRange::from_dates(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        New_York,
    )
    .unwrap()
}

fn bench_grid_construction(c: &mut Criterion) {
    let range = year_range();

    c.bench_function("day_grid_full_year", |b| {
        b.iter(|| CalendarGrid::days(black_box(&range)).unwrap());
    });
}

fn bench_line_chart(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_chart_pipeline");
    let grid = CalendarGrid::days(&year_range()).unwrap();
    let vehicles = fleet(20);

    for size in [1_000, 10_000, 100_000].iter() {
        let records = create_records(*size, &vehicles);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let tally = count_by_source(&grid, black_box(&records));
                let filled = fill_gaps(&grid, &tally.buckets).unwrap();
                line_chart(&grid, &filled).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_usage_series(c: &mut Criterion) {
    let mut group = c.benchmark_group("usage_series_pipeline");
    let grid = CalendarGrid::months(New_York);

    for vehicles in [5, 50].iter() {
        let fleet = fleet(*vehicles);
        let records = create_records(10_000, &fleet);

        group.bench_with_input(BenchmarkId::new("vehicles", vehicles), vehicles, |b, _| {
            b.iter(|| {
                let usage = sum_by_vehicle(&grid, black_box(&records), UsageMeasure::ExpectedDuration);
                let filled = fill_groups(&grid, &usage.by_vehicle, fleet.iter().map(|v| v.id)).unwrap();
                filled
                    .values()
                    .map(|values| labeled_series(&grid, "v", values).unwrap())
                    .collect::<Vec<_>>()
            });
        });
    }

    group.finish();
}

fn bench_json_serialization(c: &mut Criterion) {
    let grid = CalendarGrid::days(&year_range()).unwrap();
    let records = create_records(10_000, &fleet(10));
    let tally = count_by_source(&grid, &records);
    let filled = fill_gaps(&grid, &tally.buckets).unwrap();
    let series = line_chart(&grid, &filled).unwrap();

    c.bench_function("line_chart_json", |b| {
        b.iter(|| serde_json::to_string(black_box(&series)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_grid_construction,
    bench_line_chart,
    bench_usage_series,
    bench_json_serialization,
);

criterion_main!(benches);
