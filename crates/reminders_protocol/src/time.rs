//! Date conversions between epoch milliseconds and `YYYY-MM-DD`.
//!
//! All conversions are in UTC.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{ProtocolError, ProtocolResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Formats a millisecond timestamp as a UTC date. Zero means "unset".
pub fn timestamp_to_date(millis: i64) -> Option<String> {
    if millis == 0 {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis(millis).map(|t| t.format(DATE_FORMAT).to_string())
}

/// Parses a `YYYY-MM-DD` date into UTC midnight in epoch milliseconds.
pub fn date_to_timestamp(date: &str) -> ProtocolResult<i64> {
    let day = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|_| ProtocolError::invalid_date(date))?;
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ProtocolError::invalid_date(date))?;
    Ok(midnight.and_utc().timestamp_millis())
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
