//! Report output shapes
//!
//! Chart-ready structures built from gap-filled series. They serialize to exactly what the
//! dashboard charts consume.

use fleetdesk_core::models::ReservationSource;
use fleetdesk_core::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::Serialize;

use super::aggregate::SourceCounts;
use super::calendar::{BucketKey, CalendarGrid};

/// Named series of `[timestampMs, count]` points
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSeries {
    pub key: String,
    pub values: Vec<(i64, u64)>,
}

/// Named total
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PieSlice {
    pub key: String,
    pub y: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledPoint {
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
}

/// Named series of `{label, value}` points
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledSeries {
    pub key: String,
    pub values: Vec<LabeledPoint>,
}

fn ensure_in_grid(grid: &CalendarGrid, bucket: &BucketKey) -> AppResult<()> {
    if grid.contains(bucket) {
        Ok(())
    } else {
        Err(AppError::GridMismatch(bucket.to_string()))
    }
}

fn sorted<V: Clone>(filled: &[(BucketKey, V)]) -> Vec<(BucketKey, V)> {
    let mut entries = filled.to_vec();
    entries.sort_by_key(|(bucket, _)| *bucket);
    entries
}

/// One series per channel, stamped at each day's UTC midnight
pub fn line_chart(grid: &CalendarGrid, filled: &[(BucketKey, SourceCounts)]) -> AppResult<Vec<TimeSeries>> {
    let mut points = Vec::with_capacity(filled.len());
    for (bucket, counts) in sorted(filled) {
        ensure_in_grid(grid, &bucket)?;
        let ts = bucket
            .timestamp_ms()
            .ok_or_else(|| AppError::GridMismatch(format!("{} is not a day bucket", bucket)))?;
        points.push((ts, counts));
    }

    Ok(ReservationSource::ALL
        .iter()
        .map(|source| TimeSeries {
            key: source.to_string(),
            values: points.iter().map(|(ts, c)| (*ts, c.get(*source))).collect(),
        })
        .collect())
}

/// Channel totals over the whole range
pub fn pie_chart(filled: &[(BucketKey, SourceCounts)]) -> Vec<PieSlice> {
    ReservationSource::ALL
        .iter()
        .map(|source| PieSlice {
            key: source.to_string(),
            y: filled.iter().map(|(_, c)| c.get(*source)).sum(),
        })
        .collect()
}

/// Labeled series for one group, in grid order
pub fn labeled_series(
    grid: &CalendarGrid,
    key: impl Into<String>,
    filled: &[(BucketKey, Decimal)],
) -> AppResult<LabeledSeries> {
    let mut values = Vec::with_capacity(filled.len());
    for (bucket, value) in sorted(filled) {
        ensure_in_grid(grid, &bucket)?;
        values.push(LabeledPoint {
            label: bucket.label(),
            value,
        });
    }

    Ok(LabeledSeries {
        key: key.into(),
        values,
    })
}
