//! Calendar grids
//!
//! A grid is the canonical, ordered list of buckets a report spans. Day grids are cut in the
//! reporting timezone, so one bucket is one local calendar day even across DST changes.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use fleetdesk_core::{AppError, AppResult};
use std::fmt;
use std::ops::RangeInclusive;

/// Month labels, January first
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Weekday labels, Sunday first
pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Calendar years a range bound may fall in
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 1970..=9999;

/// Identity of one calendar bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketKey {
    /// Local calendar date
    Day(NaiveDate),
    /// Month ordinal, 1 = January
    Month(u32),
    /// Day of week, 0 = Sunday
    Weekday(u32),
}

impl BucketKey {
    /// Display label: `M-D-YYYY`, `Jan`..`Dec` or `Sun`..`Sat`
    pub fn label(&self) -> String {
        match self {
            BucketKey::Day(date) => format!("{}-{}-{}", date.month(), date.day(), date.year()),
            BucketKey::Month(m) => month_label(*m).unwrap_or("?").to_string(),
            BucketKey::Weekday(d) => WEEKDAY_LABELS
                .get(*d as usize)
                .copied()
                .unwrap_or("?")
                .to_string(),
        }
    }

    /// UTC midnight of a day bucket in epoch milliseconds
    pub fn timestamp_ms(&self) -> Option<i64> {
        match self {
            BucketKey::Day(date) => Some(date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()),
            _ => None,
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::Day(date) => write!(f, "{}", date),
            other => f.write_str(&other.label()),
        }
    }
}

pub fn month_label(month: u32) -> Option<&'static str> {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_LABELS.get(i as usize).copied())
}

/// Bucket size of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Month,
    Weekday,
}

/// First instant of a local calendar date
///
/// Where local midnight does not exist the first instant of the day after the gap is used.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

fn ensure_supported(date: NaiveDate) -> AppResult<NaiveDate> {
    if SUPPORTED_YEARS.contains(&date.year()) {
        Ok(date)
    } else {
        Err(AppError::InvalidRange(format!(
            "{} is outside years {}..={}",
            date,
            SUPPORTED_YEARS.start(),
            SUPPORTED_YEARS.end()
        )))
    }
}

/// Parse a range bound
///
/// Accepts an RFC 3339 instant, a `YYYY-MM-DD` date or an `M-D-YYYY` date. Dates resolve to
/// local midnight in `tz`. The local date must fall within [`SUPPORTED_YEARS`].
pub fn parse_bound(raw: &str, tz: Tz) -> AppResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        let instant = instant.with_timezone(&Utc);
        ensure_supported(instant.with_timezone(&tz).date_naive())?;
        return Ok(instant);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m-%d-%Y"))
        .map_err(|_| AppError::InvalidRange(format!("cannot parse '{}' as a date", raw)))?;
    Ok(local_midnight(ensure_supported(date)?, tz))
}

/// Inclusive span of local calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tz: Tz,
}

impl DateRange {
    /// Range from two instants, each normalized to local midnight
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, tz: Tz) -> AppResult<Self> {
        if end < start {
            return Err(AppError::InvalidRange(format!(
                "end {} is before start {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        let first = ensure_supported(start.with_timezone(&tz).date_naive())?;
        let last = ensure_supported(end.with_timezone(&tz).date_naive())?;
        Ok(Self {
            start: local_midnight(first, tz),
            end: local_midnight(last, tz),
            tz,
        })
    }

    pub fn from_dates(start: NaiveDate, end: NaiveDate, tz: Tz) -> AppResult<Self> {
        Self::new(local_midnight(start, tz), local_midnight(end, tz), tz)
    }

    /// Parse both bounds with [`parse_bound`]
    pub fn parse(start: &str, end: &str, tz: Tz) -> AppResult<Self> {
        Self::new(parse_bound(start, tz)?, parse_bound(end, tz)?, tz)
    }

    pub fn single_day(date: NaiveDate, tz: Tz) -> Self {
        let midnight = local_midnight(date, tz);
        Self {
            start: midnight,
            end: midnight,
            tz,
        }
    }

    /// January 1st through December 31st
    pub fn year(year: i32, tz: Tz) -> AppResult<Self> {
        let first = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| AppError::InvalidRange(format!("year {} out of range", year)))?;
        let last = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| AppError::InvalidRange(format!("year {} out of range", year)))?;
        Self::from_dates(first, last, tz)
    }

    /// The whole calendar month containing `date`
    pub fn month_of(date: NaiveDate, tz: Tz) -> AppResult<Self> {
        let first = date.with_day(1).unwrap_or(date);
        let last = first
            .checked_add_months(chrono::Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| AppError::InvalidRange(format!("month of {} out of range", date)))?;
        Self::from_dates(first, last, tz)
    }

    /// Local midnight of the first day
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Local midnight of the last day
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.with_timezone(&self.tz).date_naive()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.with_timezone(&self.tz).date_naive()
    }

    /// Number of calendar days covered
    pub fn days(&self) -> i64 {
        (self.end_date() - self.start_date()).num_days() + 1
    }

    /// Reject ranges spanning more than `max_days` calendar days
    pub fn ensure_at_most(&self, max_days: i64) -> AppResult<()> {
        if self.days() > max_days {
            return Err(AppError::InvalidRange(format!(
                "{} to {} spans {} days, at most {} allowed",
                self.start_date(),
                self.end_date(),
                self.days(),
                max_days
            )));
        }
        Ok(())
    }

    /// Inclusive store bounds: first instant of the first day to last instant of the last day
    pub fn query_bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let after = self
            .end_date()
            .succ_opt()
            .map(|next| local_midnight(next, self.tz))
            .or_else(|| self.end.checked_add_signed(Duration::days(1)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let last = after
            .checked_sub_signed(Duration::microseconds(1))
            .unwrap_or(after);
        (self.start, last)
    }
}

/// Day-by-day instants from `start` to `end`
///
/// Steps one local calendar day at a time. The first element is `start`, and the last is
/// forced to `end` itself.
pub fn day_instants(start: DateTime<Utc>, end: DateTime<Utc>, tz: Tz) -> AppResult<Vec<DateTime<Utc>>> {
    if end < start {
        return Err(AppError::InvalidRange(format!(
            "end {} is before start {}",
            end.to_rfc3339(),
            start.to_rfc3339()
        )));
    }

    let first = start.with_timezone(&tz).date_naive();
    let last = end.with_timezone(&tz).date_naive();
    let span = (last - first).num_days() as u64;

    let mut instants = Vec::with_capacity(span as usize + 1);
    instants.push(start);
    for offset in 1..span {
        let date = first
            .checked_add_days(Days::new(offset))
            .ok_or_else(|| AppError::InvalidRange(format!("{} + {} days overflows", first, offset)))?;
        instants.push(local_midnight(date, tz));
    }
    if span > 0 {
        instants.push(end);
    }
    Ok(instants)
}

/// Ordered set of buckets a report spans
#[derive(Debug, Clone)]
pub struct CalendarGrid {
    granularity: Granularity,
    tz: Tz,
    buckets: Vec<BucketKey>,
}

impl CalendarGrid {
    /// One bucket per local day of the range
    pub fn days(range: &DateRange) -> AppResult<Self> {
        let tz = range.tz();
        let buckets = day_instants(range.start(), range.end(), tz)?
            .into_iter()
            .map(|instant| BucketKey::Day(instant.with_timezone(&tz).date_naive()))
            .collect();

        Ok(Self {
            granularity: Granularity::Day,
            tz,
            buckets,
        })
    }

    /// Twelve month buckets, independent of how much of the year has elapsed
    pub fn months(tz: Tz) -> Self {
        Self {
            granularity: Granularity::Month,
            tz,
            buckets: (1..=12).map(BucketKey::Month).collect(),
        }
    }

    /// Seven weekday buckets, Sunday first
    pub fn weekdays(tz: Tz) -> Self {
        Self {
            granularity: Granularity::Weekday,
            tz,
            buckets: (0..7).map(BucketKey::Weekday).collect(),
        }
    }

    /// Bucket an instant falls into, in this grid's bucket space
    ///
    /// The result is not guaranteed to be part of the grid; see [`CalendarGrid::contains`].
    pub fn bucket_of(&self, instant: DateTime<Utc>) -> BucketKey {
        let local = instant.with_timezone(&self.tz);
        match self.granularity {
            Granularity::Day => BucketKey::Day(local.date_naive()),
            Granularity::Month => BucketKey::Month(local.month()),
            Granularity::Weekday => BucketKey::Weekday(local.weekday().num_days_from_sunday()),
        }
    }

    pub fn contains(&self, key: &BucketKey) -> bool {
        self.buckets.binary_search(key).is_ok()
    }

    pub fn buckets(&self) -> &[BucketKey] {
        &self.buckets
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
