//! Date-bucketed report computation
//!
//! A report flows through four pure stages:
//!
//! 1. [`calendar`] builds the canonical bucket grid for the requested range
//! 2. [`aggregate`] folds store records into sparse per-bucket accumulations
//! 3. [`gap_fill`] reconciles those with the grid, one group at a time
//! 4. [`series`] reshapes the filled data into chart output
//!
//! None of the stages read the clock or hold state between calls.

pub mod aggregate;
pub mod calendar;
pub mod gap_fill;
pub mod series;

pub use aggregate::{
    count_by_source, count_by_status, group_by_vehicle_type, ledger_by_vehicle, sum_by_vehicle,
    totals_by_vehicle, LedgerTotals, SourceCounts, SourceTally, TypeGroup, UsageMeasure,
    VehicleUsage,
};
pub use calendar::{parse_bound, BucketKey, CalendarGrid, DateRange, Granularity};
pub use gap_fill::{fill_gaps, fill_groups, FilledSeries};
pub use series::{labeled_series, line_chart, pie_chart, LabeledPoint, LabeledSeries, PieSlice, TimeSeries};
