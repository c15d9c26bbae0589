//! Civil date helpers.
//!
//! Every event in the system is whole-day: a start date and an exclusive end
//! date, with no time-of-day and no timezone. This module converts between
//! [`CalendarDate`] and the iCalendar wire forms.

use std::sync::LazyLock;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

/// A calendar date without time-of-day or timezone.
///
/// Serializes as an ISO-8601 date (`YYYY-MM-DD`).
pub type CalendarDate = NaiveDate;

static DATE_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{8}$").expect("Invalid date regex"));

static DATE_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{8}T\d{6}Z?$").expect("Invalid date-time regex"));

static ANY_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{8}").expect("Invalid fallback date regex"));

/// Returns the day after `date`.
///
/// Saturates at the last representable date.
pub fn next_day(date: CalendarDate) -> CalendarDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

/// Returns an end date that is strictly after `start`.
///
/// A missing end, or one that is not after `start`, becomes `start + 1 day`.
pub fn exclusive_end(start: CalendarDate, end: Option<CalendarDate>) -> CalendarDate {
    match end {
        Some(end) if end > start => end,
        _ => next_day(start),
    }
}

/// Parses an iCalendar date or date-time value into a civil date.
///
/// Accepted forms:
/// - `20250210` (date)
/// - `20250210T143000Z` (UTC date-time)
/// - `20250210T143000` (floating date-time, read as UTC)
///
/// Time-of-day is discarded. Anything else falls back to the first run of
/// eight digits in the value; `None` if no valid date can be found.
pub fn parse_wire_date(value: &str) -> Option<CalendarDate> {
    let value = value.trim();

    if DATE_ONLY.is_match(value)
        && let Ok(date) = NaiveDate::parse_from_str(value, "%Y%m%d")
    {
        return Some(date);
    }

    if DATE_TIME.is_match(value)
        && let Ok(dt) = NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y%m%dT%H%M%S")
    {
        return Some(dt.date());
    }

    let digits = ANY_DATE.find(value)?;
    NaiveDate::parse_from_str(digits.as_str(), "%Y%m%d").ok()
}

/// Formats a date as an iCalendar `DATE` value (`YYYYMMDD`).
pub fn format_wire_date(date: CalendarDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Formats a UTC timestamp as an iCalendar `DATE-TIME` value (`YYYYMMDDTHHMMSSZ`).
pub fn format_wire_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> CalendarDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_date_only() {
        assert_eq!(parse_wire_date("20260110"), Some(date(2026, 1, 10)));
    }

    #[test]
    fn parses_utc_date_time() {
        assert_eq!(parse_wire_date("20260110T235959Z"), Some(date(2026, 1, 10)));
    }

    #[test]
    fn parses_floating_date_time_as_utc() {
        assert_eq!(parse_wire_date("20260110T120000"), Some(date(2026, 1, 10)));
    }

    #[test]
    fn falls_back_to_embedded_digits() {
        assert_eq!(parse_wire_date("TZ-20260301-x"), Some(date(2026, 3, 1)));
        assert_eq!(parse_wire_date("20260110T2500"), Some(date(2026, 1, 10)));
    }

    #[test]
    fn rejects_values_without_a_date() {
        assert_eq!(parse_wire_date(""), None);
        assert_eq!(parse_wire_date("tomorrow"), None);
        assert_eq!(parse_wire_date("20261340"), None);
    }

    #[test]
    fn exclusive_end_bumps_non_increasing_ends() {
        let start = date(2026, 2, 28);
        assert_eq!(exclusive_end(start, None), date(2026, 3, 1));
        assert_eq!(exclusive_end(start, Some(start)), date(2026, 3, 1));
        assert_eq!(exclusive_end(start, Some(date(2026, 2, 1))), date(2026, 3, 1));
        assert_eq!(exclusive_end(start, Some(date(2026, 3, 4))), date(2026, 3, 4));
    }

    #[test]
    fn wire_formatting() {
        assert_eq!(format_wire_date(date(2026, 1, 5)), "20260105");
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 7, 8, 9).unwrap();
        assert_eq!(format_wire_timestamp(at), "20260105T070809Z");
    }
}
