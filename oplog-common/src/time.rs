//! Timestamp and record date utilities

use chrono::{DateTime, NaiveDate, Utc};

/// Date formats accepted in the `date` record field
const RECORD_DATE_FORMATS: [&str; 3] = ["%Y/%m/%d", "%Y-%m-%d", "%Y.%m.%d"];

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a record date such as `2024/03/01`
///
/// Accepts `/`, `-` or `.` separators; month and day may be one digit.
/// Returns `None` for empty or unparseable input.
pub fn parse_record_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    RECORD_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Sort key for batch persistence: records without a usable date sort last
pub fn record_date_sort_key(value: Option<&str>) -> NaiveDate {
    value
        .and_then(parse_record_date)
        .unwrap_or_else(undated_sentinel)
}

/// Date assigned to undated records (9999-12-31)
fn undated_sentinel() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}
