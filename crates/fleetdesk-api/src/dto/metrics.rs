//! Report query parameters

use super::common::{parse_day, OptionalRange};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use fleetdesk_core::AppResult;
use fleetdesk_services::metrics::DateRange;
use fleetdesk_services::LedgerQuery;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Required day range, optionally narrowed to one vehicle
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RangeQuery {
    #[validate(length(min = 1, message = "start_date is required"))]
    pub start_date: String,

    #[validate(length(min = 1, message = "end_date is required"))]
    pub end_date: String,

    pub vehicle_id: Option<Uuid>,
}

impl RangeQuery {
    pub fn to_range(&self, tz: Tz) -> AppResult<DateRange> {
        DateRange::parse(&self.start_date, &self.end_date, tz)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct YearQuery {
    #[validate(range(min = 1970, max = 9999))]
    pub year: i32,

    pub vehicle_id: Option<Uuid>,
}

/// Filters for the revenue ledger reports
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LedgerParams {
    #[serde(flatten)]
    pub range: OptionalRange,

    #[validate(length(min = 1, max = 100))]
    pub vehicle_type: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub serial_number: Option<String>,
}

impl LedgerParams {
    pub fn to_query(&self, tz: Tz) -> AppResult<LedgerQuery> {
        Ok(LedgerQuery {
            range: self.range.to_range(tz)?,
            vehicle_type: self.vehicle_type.clone(),
            serial_number: self.serial_number.clone(),
        })
    }
}

/// Day for the status breakdown; today in the reporting zone when absent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DayQuery {
    pub date: Option<String>,
}

impl DayQuery {
    pub fn day(&self, tz: Tz, now: DateTime<Utc>) -> AppResult<NaiveDate> {
        match self.date.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse_day(raw, tz),
            _ => Ok(now.with_timezone(&tz).date_naive()),
        }
    }
}
