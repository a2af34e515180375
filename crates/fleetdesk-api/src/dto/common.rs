//! Common DTOs used across the API

use chrono::NaiveDate;
use chrono_tz::Tz;
use fleetdesk_core::traits::Pagination;
use fleetdesk_core::AppResult;
use fleetdesk_services::metrics::{parse_bound, DateRange};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: Some(message.into()),
        }
    }
}

/// Pagination query parameters
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaginationParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page", deserialize_with = "deserialize_number_from_string")]
    #[validate(range(min = 1, max = 100_000))]
    pub page: i64,

    #[serde(default = "default_per_page", deserialize_with = "deserialize_number_from_string")]
    #[validate(range(min = 1, max = 200))]
    pub per_page: i64,
}

/// Accept `?page=2` as well as a JSON number
fn deserialize_number_from_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct I64OrStringVisitor;

    impl<'de> Visitor<'de> for I64OrStringVisitor {
        type Value = i64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an integer or a string containing an integer")
        }

        fn visit_i64<E>(self, value: i64) -> Result<i64, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<i64, E>
        where
            E: de::Error,
        {
            i64::try_from(value).map_err(de::Error::custom)
        }

        fn visit_str<E>(self, value: &str) -> Result<i64, E>
        where
            E: de::Error,
        {
            value.trim().parse::<i64>().map_err(de::Error::custom)
        }
    }

    deserializer.deserialize_any(I64OrStringVisitor)
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    25
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl From<&PaginationParams> for Pagination {
    fn from(params: &PaginationParams) -> Self {
        Pagination::new(params.page, params.per_page)
    }
}

/// Optional `start_date`/`end_date` pair; both or neither must be given
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptionalRange {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl OptionalRange {
    pub fn to_range(&self, tz: Tz) -> AppResult<Option<DateRange>> {
        match (self.start_date.as_deref(), self.end_date.as_deref()) {
            (Some(start), Some(end)) => DateRange::parse(start, end, tz).map(Some),
            (None, None) => Ok(None),
            _ => Err(fleetdesk_core::AppError::InvalidRange(
                "start_date and end_date must be given together".to_string(),
            )),
        }
    }
}

/// Local calendar day of a `YYYY-MM-DD` date or an RFC 3339 instant
pub fn parse_day(raw: &str, tz: Tz) -> AppResult<NaiveDate> {
    Ok(parse_bound(raw, tz)?.with_timezone(&tz).date_naive())
}
