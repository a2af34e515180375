//! Gap filling
//!
//! Reconciles sparse aggregation output with the full calendar grid. Every series that leaves
//! here has exactly one entry per grid bucket, in grid order.

use fleetdesk_core::{AppError, AppResult};
use std::collections::BTreeMap;

use super::calendar::{BucketKey, CalendarGrid};

/// One value per grid bucket, in grid order
pub type FilledSeries<V> = Vec<(BucketKey, V)>;

/// Fill every bucket missing from `sparse` with `V::default()`
///
/// Entries already present are kept as they are. A key outside the grid is an aggregation
/// defect and fails with [`AppError::GridMismatch`].
pub fn fill_gaps<V: Clone + Default>(
    grid: &CalendarGrid,
    sparse: &BTreeMap<BucketKey, V>,
) -> AppResult<FilledSeries<V>> {
    if let Some(stray) = sparse.keys().find(|key| !grid.contains(key)) {
        return Err(AppError::GridMismatch(stray.to_string()));
    }

    Ok(grid
        .buckets()
        .iter()
        .map(|bucket| (*bucket, sparse.get(bucket).cloned().unwrap_or_default()))
        .collect())
}

/// Fill each group independently
///
/// The output holds every group in `expected` plus any extra group found in `sparse`, each
/// spanning the full grid.
pub fn fill_groups<G, V>(
    grid: &CalendarGrid,
    sparse: &BTreeMap<G, BTreeMap<BucketKey, V>>,
    expected: impl IntoIterator<Item = G>,
) -> AppResult<BTreeMap<G, FilledSeries<V>>>
where
    G: Ord + Clone,
    V: Clone + Default,
{
    let empty = BTreeMap::new();
    let mut groups: Vec<G> = expected.into_iter().collect();
    groups.extend(sparse.keys().cloned());

    let mut filled = BTreeMap::new();
    for group in groups {
        if filled.contains_key(&group) {
            continue;
        }
        let series = fill_gaps(grid, sparse.get(&group).unwrap_or(&empty))?;
        filled.insert(group, series);
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::calendar::DateRange;
    use chrono::NaiveDate;
    use chrono_tz::UTC;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;

    fn day(d: u32) -> BucketKey {
        BucketKey::Day(NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
    }

    fn grid(days: u32) -> CalendarGrid {
        let range = DateRange::from_dates(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, days).unwrap(),
            UTC,
        )
        .unwrap();
        CalendarGrid::days(&range).unwrap()
    }

    #[test]
    fn test_missing_buckets_become_zero() {
        let sparse = BTreeMap::from([(day(2), 7u64)]);
        let filled = fill_gaps(&grid(3), &sparse).unwrap();

        assert_eq!(filled, vec![(day(1), 0), (day(2), 7), (day(3), 0)]);
    }

    #[test]
    fn test_output_bucket_set_equals_grid() {
        for days in 1..=31 {
            let grid = grid(days);
            let sparse: BTreeMap<BucketKey, u64> = (1..=days)
                .filter(|d| d % 3 == 0)
                .map(|d| (day(d), d as u64))
                .collect();

            let filled = fill_gaps(&grid, &sparse).unwrap();
            let keys: BTreeSet<BucketKey> = filled.iter().map(|(k, _)| *k).collect();
            let expected: BTreeSet<BucketKey> = grid.buckets().iter().copied().collect();

            assert_eq!(filled.len(), grid.len());
            assert_eq!(keys, expected);
        }
    }

    #[test]
    fn test_existing_zero_entries_are_preserved() {
        let sparse = BTreeMap::from([(day(1), dec!(0.00)), (day(2), dec!(1.5))]);
        let filled = fill_gaps(&grid(2), &sparse).unwrap();

        // the stored scale of an explicit zero survives untouched
        assert_eq!(filled[0].1.scale(), 2);
        assert_eq!(filled[1].1, dec!(1.5));
    }

    #[test]
    fn test_bucket_outside_grid_is_a_mismatch() {
        let sparse = BTreeMap::from([(day(5), 1u64)]);
        let err = fill_gaps(&grid(3), &sparse).unwrap_err();

        assert!(matches!(err, AppError::GridMismatch(_)));
    }

    #[test]
    fn test_groups_filled_independently() {
        let sparse: BTreeMap<&str, BTreeMap<BucketKey, Decimal>> = BTreeMap::from([
            ("skiff", BTreeMap::from([(day(1), dec!(2))])),
            ("retired", BTreeMap::from([(day(3), dec!(1))])),
        ]);

        let filled = fill_groups(&grid(3), &sparse, ["skiff", "pontoon"]).unwrap();

        assert_eq!(filled.len(), 3);
        for series in filled.values() {
            assert_eq!(series.len(), 3);
        }
        assert!(filled["pontoon"].iter().all(|(_, v)| v.is_zero()));
        assert_eq!(filled["skiff"][0].1, dec!(2));
        assert_eq!(filled["retired"][2].1, dec!(1));
    }

    #[test]
    fn test_group_mismatch_propagates() {
        let sparse = BTreeMap::from([("skiff", BTreeMap::from([(BucketKey::Month(2), 1u64)]))]);
        assert!(fill_groups(&grid(3), &sparse, ["skiff"]).is_err());
    }
}
