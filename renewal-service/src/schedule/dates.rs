//! Host date parsing and formatting.
//!
//! The host stores dates as `YYYY-MM-DD HH:MM:SS` strings in UTC and uses
//! `"0"` or an empty string for "no date".

use super::ScheduleError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Storage format of host dates.
pub const MYSQL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a host date. Accepts the storage format, RFC 3339, and bare dates.
pub fn parse_host_date(value: &str) -> Result<DateTime<Utc>, ScheduleError> {
    let trimmed = value.trim();

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, MYSQL_FORMAT) {
        return Ok(naive.and_utc());
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ScheduleError::MalformedDate {
            value: value.to_string(),
        })
}

/// Like [`parse_host_date`], mapping the host's empty markers to `None`.
pub fn parse_optional_host_date(value: &str) -> Result<Option<DateTime<Utc>>, ScheduleError> {
    match value.trim() {
        "" | "0" => Ok(None),
        other => parse_host_date(other).map(Some),
    }
}

pub fn format_mysql(date: DateTime<Utc>) -> String {
    date.format(MYSQL_FORMAT).to_string()
}

pub fn from_timestamp(timestamp: i64) -> Result<DateTime<Utc>, ScheduleError> {
    DateTime::from_timestamp(timestamp, 0).ok_or_else(|| ScheduleError::MalformedDate {
        value: timestamp.to_string(),
    })
}
