//! Report service tests against the in-memory store

mod common;

use chrono::NaiveDate;
use chrono_tz::{America::New_York, UTC};
use common::*;
use fleetdesk_core::models::{ReservationSource, ReservationStatus};
use fleetdesk_core::AppError;
use fleetdesk_services::metrics::DateRange;
use fleetdesk_services::{LedgerQuery, ReportService};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

type Service = ReportService<MemoryStore, MemoryStore>;

fn service(store: &Arc<MemoryStore>) -> Service {
    ReportService::new(store.clone(), store.clone(), UTC)
}

fn range(from: &str, to: &str) -> DateRange {
    DateRange::parse(from, to, UTC).unwrap()
}

fn ms(d: u32) -> i64 {
    at(2024, 1, d, 0).timestamp_millis()
}

fn finalized(charged: Decimal, profit: Decimal, hours: Decimal, drift: Decimal) -> impl FnOnce(&mut fleetdesk_core::models::Reservation) {
    move |r| {
        r.status = ReservationStatus::Finalized;
        r.metrics.actual_charged_amount = Some(charged);
        r.metrics.profit_difference = Some(profit);
        r.metrics.actual_duration = Some(hours);
        r.metrics.time_difference = Some(drift);
    }
}

#[tokio::test]
async fn test_line_chart_single_helm_reservation() {
    let store = MemoryStore::new();
    store.seed(AGENCY, new_reservation(at(2024, 1, 2, 12), Some(ReservationSource::Helm), None, 2));

    let series = assert_ok!(
        service(&store)
            .line_chart(AGENCY, &range("2024-01-01", "2024-01-03"))
            .await
    );

    assert_eq!(series.len(), 2);
    assert_eq!(series[0].key, "Helm");
    assert_eq!(series[0].values, vec![(ms(1), 0), (ms(2), 1), (ms(3), 0)]);
    assert_eq!(series[1].key, "Consumer");
    assert_eq!(series[1].values, vec![(ms(1), 0), (ms(2), 0), (ms(3), 0)]);
}

#[tokio::test]
async fn test_pie_chart_totals_ignore_unknown_source() {
    let store = MemoryStore::new();
    for (day, source) in [
        (1, Some(ReservationSource::Helm)),
        (2, Some(ReservationSource::Helm)),
        (2, Some(ReservationSource::Consumer)),
        (3, None),
    ] {
        store.seed(AGENCY, new_reservation(at(2024, 1, day, 9), source, None, 1));
    }

    let slices = assert_ok!(
        service(&store)
            .pie_chart(AGENCY, &range("2024-01-01", "2024-01-03"))
            .await
    );

    let json = serde_json::to_value(&slices).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{"key": "Helm", "y": 2}, {"key": "Consumer", "y": 1}])
    );
}

#[tokio::test]
async fn test_pie_total_equals_line_sum() {
    let store = MemoryStore::new();
    let sources = [ReservationSource::Helm, ReservationSource::Consumer];
    for i in 0..40u32 {
        let day = 1 + i % 10;
        // last hour of the day exercises the inclusive upper bound
        let hour = if i % 7 == 0 { 23 } else { 8 + i % 10 };
        store.seed(
            AGENCY,
            new_reservation(at(2024, 1, day, hour), Some(sources[(i % 3 == 0) as usize]), None, 1),
        );
    }
    // outside the range
    store.seed(AGENCY, new_reservation(at(2024, 1, 11, 0), Some(ReservationSource::Helm), None, 1));

    let svc = service(&store);
    let range = range("2024-01-01", "2024-01-10");
    let lines = assert_ok!(svc.line_chart(AGENCY, &range).await);
    let pie = assert_ok!(svc.pie_chart(AGENCY, &range).await);

    for (line, slice) in lines.iter().zip(&pie) {
        assert_eq!(line.key, slice.key);
        assert_eq!(line.values.len(), 10);
        assert_eq!(line.values.iter().map(|(_, c)| c).sum::<u64>(), slice.y);
    }
    assert_eq!(pie.iter().map(|s| s.y).sum::<u64>(), 40);
}

#[tokio::test]
async fn test_reports_are_scoped_to_agency() {
    let store = MemoryStore::new();
    store.seed(OTHER_AGENCY, new_reservation(at(2024, 1, 2, 9), Some(ReservationSource::Helm), None, 1));

    let pie = assert_ok!(
        service(&store)
            .pie_chart(AGENCY, &range("2024-01-01", "2024-01-03"))
            .await
    );

    assert!(pie.iter().all(|s| s.y == 0));
}

#[tokio::test]
async fn test_line_chart_buckets_in_reporting_timezone() {
    let store = MemoryStore::new();
    // 22:00 on Jan 1 in New York
    store.seed(AGENCY, new_reservation(at(2024, 1, 2, 3), Some(ReservationSource::Consumer), None, 1));

    let svc = ReportService::new(store.clone(), store.clone(), New_York);
    let range = DateRange::parse("2024-01-01", "2024-01-03", New_York).unwrap();
    let series = assert_ok!(svc.line_chart(AGENCY, &range).await);

    let consumer: Vec<u64> = series[1].values.iter().map(|(_, c)| *c).collect();
    assert_eq!(consumer, vec![1, 0, 0]);
    assert_eq!(series[1].values[0].0, ms(1));
}

#[tokio::test]
async fn test_inverted_range_rejected() {
    let err = assert_err!(DateRange::parse("2024-01-05", "2024-01-01", UTC));
    assert!(matches!(err, AppError::InvalidRange(_)));
}

#[tokio::test]
async fn test_day_reports_reject_long_ranges_before_querying() {
    let store = MemoryStore::new();
    store.fail_reads(true);
    let svc = service(&store).with_max_range_days(31);
    let long = range("2024-01-01", "2024-02-01");

    let err = assert_err!(svc.line_chart(AGENCY, &long).await);
    assert!(matches!(err, AppError::InvalidRange(_)));
    let err = assert_err!(svc.pie_chart(AGENCY, &long).await);
    assert!(matches!(err, AppError::InvalidRange(_)));
    let err = assert_err!(svc.date_range_usage(AGENCY, &long, None).await);
    assert!(matches!(err, AppError::InvalidRange(_)));

    let whole_history = range("1970-01-01", "9999-12-31");
    let err = assert_err!(service(&store).line_chart(AGENCY, &whole_history).await);
    assert!(matches!(err, AppError::InvalidRange(_)));
}

#[tokio::test]
async fn test_store_failure_propagates() {
    let store = MemoryStore::new();
    store.fail_reads(true);

    let err = assert_err!(
        service(&store)
            .line_chart(AGENCY, &range("2024-01-01", "2024-01-03"))
            .await
    );

    assert!(matches!(err, AppError::Database(_)));
}

#[tokio::test]
async fn test_year_usage_march_only() {
    let store = MemoryStore::new();
    let skiff = store.add_vehicle(vehicle(AGENCY, "Skiff", "boat"));
    store.add_vehicle(vehicle(AGENCY, "Barge", "boat"));
    store.seed(AGENCY, new_reservation(at(2024, 3, 14, 10), None, Some(&skiff), 2));

    let usage = assert_ok!(service(&store).year_usage(AGENCY, 2024, None).await);

    assert_eq!(usage.len(), 2);
    let (barge, skiff_series) = (&usage[0], &usage[1]);
    assert_eq!(barge.key, "Barge");
    assert_eq!(barge.values.len(), 12);
    assert!(barge.values.iter().all(|p| p.value.is_zero()));

    assert_eq!(skiff_series.key, "Skiff");
    assert_eq!(skiff_series.values.len(), 12);
    assert_eq!(skiff_series.values[2].label, "Mar");
    assert_eq!(skiff_series.values[2].value, dec!(2));
    assert_eq!(
        skiff_series.values.iter().map(|p| p.value).sum::<Decimal>(),
        dec!(2)
    );
    let labels: Vec<&str> = skiff_series.values.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels.first(), Some(&"Jan"));
    assert_eq!(labels.last(), Some(&"Dec"));
}

#[tokio::test]
async fn test_year_usage_single_vehicle() {
    let store = MemoryStore::new();
    let skiff = store.add_vehicle(vehicle(AGENCY, "Skiff", "boat"));
    let barge = store.add_vehicle(vehicle(AGENCY, "Barge", "boat"));
    store.seed(AGENCY, new_reservation(at(2024, 5, 1, 10), None, Some(&barge), 4));

    let usage = assert_ok!(service(&store).year_usage(AGENCY, 2024, Some(skiff.id)).await);

    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].key, "Skiff");
    assert!(usage[0].values.iter().all(|p| p.value.is_zero()));
}

#[tokio::test]
async fn test_usage_rejects_foreign_vehicle() {
    let store = MemoryStore::new();
    let foreign = store.add_vehicle(vehicle(OTHER_AGENCY, "Yacht", "boat"));

    let err = assert_err!(service(&store).year_usage(AGENCY, 2024, Some(foreign.id)).await);

    assert!(matches!(err, AppError::VehicleNotFound(_)));
}

#[tokio::test]
async fn test_date_range_usage_labels() {
    let store = MemoryStore::new();
    let skiff = store.add_vehicle(vehicle(AGENCY, "Skiff", "boat"));
    store.seed(AGENCY, new_reservation(at(2024, 1, 30, 10), None, Some(&skiff), 3));
    store.seed(AGENCY, new_reservation(at(2024, 1, 30, 15), None, Some(&skiff), 1));

    let usage = assert_ok!(
        service(&store)
            .date_range_usage(AGENCY, &range("2024-01-30", "2024-02-01"), None)
            .await
    );

    assert_eq!(usage.len(), 1);
    let json = serde_json::to_value(&usage[0]).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "key": "Skiff",
            "values": [
                {"label": "1-30-2024", "value": 4.0},
                {"label": "1-31-2024", "value": 0.0},
                {"label": "2-1-2024", "value": 0.0}
            ]
        })
    );
}

#[tokio::test]
async fn test_weekday_usage() {
    let store = MemoryStore::new();
    let skiff = store.add_vehicle(vehicle(AGENCY, "Skiff", "boat"));
    // Mondays
    store.seed(AGENCY, new_reservation(at(2024, 1, 1, 10), None, Some(&skiff), 3));
    store.seed(AGENCY, new_reservation(at(2024, 1, 8, 10), None, Some(&skiff), 2));

    let usage = assert_ok!(
        service(&store)
            .weekday_usage(AGENCY, &range("2024-01-01", "2024-01-31"), None)
            .await
    );

    let values = &usage[0].values;
    assert_eq!(values.len(), 7);
    assert_eq!(values[0].label, "Sun");
    assert_eq!(values[1].label, "Mon");
    assert_eq!(values[1].value, dec!(5));
}

#[tokio::test]
async fn test_usage_is_idempotent() {
    let store = MemoryStore::new();
    let skiff = store.add_vehicle(vehicle(AGENCY, "Skiff", "boat"));
    let barge = store.add_vehicle(vehicle(AGENCY, "Barge", "boat"));
    for day in 1..=20 {
        let v = if day % 2 == 0 { &skiff } else { &barge };
        store.seed(AGENCY, new_reservation(at(2024, 2, day, 10), None, Some(v), day as i64 % 4 + 1));
    }

    let svc = service(&store);
    let first = serde_json::to_string(&svc.year_usage(AGENCY, 2024, None).await.unwrap()).unwrap();
    let second = serde_json::to_string(&svc.year_usage(AGENCY, 2024, None).await.unwrap()).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_most_used_vehicles_includes_idle_fleet() {
    let store = MemoryStore::new();
    let alpha = store.add_vehicle(vehicle(AGENCY, "Alpha", "boat"));
    store.add_vehicle(vehicle(AGENCY, "Bravo", "boat"));
    let charlie = store.add_vehicle(vehicle(AGENCY, "Charlie", "jet ski"));
    store.seed(AGENCY, new_reservation(at(2024, 1, 2, 10), None, Some(&charlie), 5));
    store.seed(AGENCY, new_reservation(at(2024, 1, 3, 10), None, Some(&alpha), 2));
    store.seed(AGENCY, new_reservation(at(2024, 1, 4, 10), None, Some(&alpha), 3));

    let ranked = assert_ok!(
        service(&store)
            .most_used_vehicles(AGENCY, &range("2024-01-01", "2024-01-31"))
            .await
    );

    let names: Vec<(&str, Decimal)> = ranked
        .iter()
        .map(|v| (v.vehicle_name.as_str(), v.hours))
        .collect();
    assert_eq!(
        names,
        vec![("Alpha", dec!(5)), ("Charlie", dec!(5)), ("Bravo", dec!(0))]
    );
}

#[tokio::test]
async fn test_total_usage() {
    let store = MemoryStore::new();
    store.seed(AGENCY, new_reservation(at(2024, 1, 2, 10), None, None, 5));
    store.seed(AGENCY, new_reservation(at(2024, 1, 3, 10), None, None, 3));
    store.seed(AGENCY, new_reservation(at(2024, 2, 3, 10), None, None, 7));

    let total = assert_ok!(
        service(&store)
            .total_usage(AGENCY, &range("2024-01-01", "2024-01-31"))
            .await
    );

    assert_eq!(total.hours, dec!(8));
}

#[tokio::test]
async fn test_vehicle_metrics_fleet_wide_and_per_serial() {
    let store = MemoryStore::new();
    let skiff = store.add_vehicle(vehicle(AGENCY, "Skiff", "boat"));
    let barge = store.add_vehicle(vehicle(AGENCY, "Barge", "boat"));
    store.seed_with(
        AGENCY,
        new_reservation(at(2024, 1, 2, 10), None, Some(&skiff), 2),
        finalized(dec!(120), dec!(20), dec!(2.5), dec!(0.5)),
    );
    store.seed_with(
        AGENCY,
        new_reservation(at(2024, 1, 3, 10), None, Some(&skiff), 2),
        finalized(dec!(80), dec!(-20), dec!(1.5), dec!(-0.5)),
    );
    store.seed_with(
        AGENCY,
        new_reservation(at(2024, 1, 4, 10), None, Some(&barge), 1),
        finalized(dec!(50), dec!(-50), dec!(1), dec!(0)),
    );

    let svc = service(&store);

    let fleet = assert_ok!(svc.vehicle_metrics(AGENCY, &LedgerQuery::default()).await);
    assert_eq!(fleet.len(), 1);
    assert_eq!(fleet[0].vehicle_id, None);
    assert_eq!(fleet[0].totals.reservations, 3);
    assert_eq!(fleet[0].totals.actual_charged_amount, dec!(250));
    assert_eq!(fleet[0].totals.profit_difference, dec!(-50));
    assert_eq!(fleet[0].totals.abs_profit_difference, dec!(90));

    let query = LedgerQuery {
        serial_number: Some(skiff.serial_number.clone()),
        ..Default::default()
    };
    let rows = assert_ok!(svc.vehicle_metrics(AGENCY, &query).await);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].vehicle_id, Some(skiff.id));
    assert_eq!(rows[0].vehicle_name.as_deref(), Some("Skiff"));
    assert_eq!(rows[0].totals.reservations, 2);
    assert_eq!(rows[0].totals.profit_difference, dec!(0));
    assert_eq!(rows[0].totals.abs_profit_difference, dec!(40));
    assert_eq!(rows[0].totals.actual_duration, dec!(4));
    assert_eq!(rows[0].totals.abs_time_difference, dec!(1));

    let json = serde_json::to_value(&rows[0]).unwrap();
    assert_eq!(json["actual_charged_amount"], serde_json::json!(200.0));
    assert_eq!(json["serial_number"], serde_json::json!("SN-SKIFF"));
}

#[tokio::test]
async fn test_top_vehicles_by_profit() {
    let store = MemoryStore::new();
    let skiff = store.add_vehicle(vehicle(AGENCY, "Skiff", "boat"));
    let jet = store.add_vehicle(vehicle(AGENCY, "Jet", "jet ski"));
    store.seed_with(
        AGENCY,
        new_reservation(at(2024, 1, 2, 10), None, Some(&skiff), 2),
        finalized(dec!(100), dec!(0), dec!(2), dec!(0)),
    );
    store.seed_with(
        AGENCY,
        new_reservation(at(2024, 1, 3, 10), None, Some(&jet), 2),
        finalized(dec!(90), dec!(0), dec!(2), dec!(0)),
    );
    store.seed_with(
        AGENCY,
        new_reservation(at(2024, 1, 4, 10), None, Some(&jet), 2),
        finalized(dec!(60), dec!(0), dec!(2), dec!(0)),
    );

    let svc = service(&store);
    let ranked = assert_ok!(svc.top_vehicles(AGENCY, &LedgerQuery::default()).await);

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].vehicle_name, "Jet");
    assert_eq!(ranked[0].reservations, 2);
    assert_eq!(ranked[0].total_profit, dec!(150));
    assert_eq!(ranked[1].vehicle_name, "Skiff");

    let boats = LedgerQuery {
        vehicle_type: Some("boat".to_string()),
        ..Default::default()
    };
    let ranked = assert_ok!(svc.top_vehicles(AGENCY, &boats).await);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].vehicle_id, skiff.id);
}

#[tokio::test]
async fn test_last_month_by_type() {
    let store = MemoryStore::new();
    let skiff = store.add_vehicle(vehicle(AGENCY, "Skiff", "boat"));
    let jet = store.add_vehicle(vehicle(AGENCY, "Jet", "jet ski"));
    let in_feb = store.seed_with(
        AGENCY,
        new_reservation(at(2024, 2, 29, 20), None, Some(&skiff), 2),
        finalized(dec!(100), dec!(0), dec!(2), dec!(0)),
    );
    store.seed_with(
        AGENCY,
        new_reservation(at(2024, 2, 1, 0), None, Some(&jet), 1),
        finalized(dec!(40), dec!(0), dec!(1), dec!(0)),
    );
    // current month
    store.seed(AGENCY, new_reservation(at(2024, 3, 1, 0), None, Some(&skiff), 1));

    let groups = assert_ok!(
        service(&store)
            .last_month_by_type(AGENCY, at(2024, 3, 10, 12))
            .await
    );

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].vehicle_type, "boat");
    assert_eq!(groups[0].reservations, 1);
    assert_eq!(groups[0].total_charged, dec!(100));
    assert_eq!(groups[0].reservation_ids, vec![in_feb.id]);
    assert_eq!(groups[1].vehicle_type, "jet ski");
    assert_eq!(groups[1].total_charged, dec!(40));
}

#[tokio::test]
async fn test_current_month_summary_stops_at_now() {
    let store = MemoryStore::new();
    store.seed_with(
        AGENCY,
        new_reservation(at(2024, 3, 1, 0), None, None, 2),
        finalized(dec!(100), dec!(0), dec!(2.5), dec!(0)),
    );
    store.seed_with(
        AGENCY,
        new_reservation(at(2024, 3, 9, 8), None, None, 2),
        finalized(dec!(50), dec!(0), dec!(1), dec!(0)),
    );
    // after now
    store.seed_with(
        AGENCY,
        new_reservation(at(2024, 3, 20, 8), None, None, 2),
        finalized(dec!(999), dec!(0), dec!(9), dec!(0)),
    );
    // previous month
    store.seed_with(
        AGENCY,
        new_reservation(at(2024, 2, 29, 23), None, None, 2),
        finalized(dec!(999), dec!(0), dec!(9), dec!(0)),
    );

    let summary = assert_ok!(
        service(&store)
            .current_month_summary(AGENCY, at(2024, 3, 10, 12))
            .await
    );

    assert_eq!(summary.reservations, 2);
    assert_eq!(summary.total_charged, dec!(150));
    assert_eq!(summary.total_hours, dec!(3.5));
}

#[tokio::test]
async fn test_status_counts_cover_every_status() {
    let store = MemoryStore::new();
    store.seed(AGENCY, new_reservation(at(2024, 1, 2, 9), None, None, 1));
    store.seed(AGENCY, new_reservation(at(2024, 1, 2, 15), None, None, 1));
    store.seed_with(AGENCY, new_reservation(at(2024, 1, 2, 18), None, None, 1), |r| {
        r.status = ReservationStatus::CheckedOut
    });
    store.seed(AGENCY, new_reservation(at(2024, 1, 3, 9), None, None, 1));

    let counts = assert_ok!(
        service(&store)
            .status_counts(AGENCY, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .await
    );

    assert_eq!(counts.len(), ReservationStatus::ALL.len());
    let count_of = |status: ReservationStatus| counts.iter().find(|c| c.status == status).unwrap().count;
    assert_eq!(count_of(ReservationStatus::Pending), 2);
    assert_eq!(count_of(ReservationStatus::CheckedOut), 1);
    assert_eq!(count_of(ReservationStatus::Cancelled), 0);
}

#[tokio::test]
async fn test_customer_base_counts_finalized() {
    let store = MemoryStore::new();
    for day in 1..=3 {
        store.seed_with(
            AGENCY,
            new_reservation(at(2024, 1, day, 9), None, None, 1),
            finalized(dec!(10), dec!(0), dec!(1), dec!(0)),
        );
    }
    store.seed(AGENCY, new_reservation(at(2024, 1, 2, 9), None, None, 1));

    let svc = service(&store);
    let all = assert_ok!(svc.customer_base(AGENCY, None).await);
    let window = range("2024-01-02", "2024-01-03");
    let ranged = assert_ok!(svc.customer_base(AGENCY, Some(&window)).await);

    assert_eq!(all.finalized, 3);
    assert_eq!(ranged.finalized, 2);
}
