//! Calendar-day parsing and arithmetic
//!
//! Every date in the system is a `NaiveDate`: a calendar day with no time of
//! day and no timezone. Stored ISO strings are read as local calendar days,
//! never through UTC, so a reference launched on `2024-03-01` is on March 1st
//! for every viewer.

use chrono::{Datelike, Days, Local, NaiveDate};

/// A calendar day, anchored to local midnight
pub type CalendarDate = NaiveDate;

/// Day zero of spreadsheet serial dates. Using Dec 30 rather than Dec 31
/// absorbs the phantom 1900-02-29 that spreadsheets still count.
const SPREADSHEET_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Parse a stored date string into a calendar day.
///
/// Accepts `YYYY-MM-DD`, optionally followed by a time part (`T10:00:00Z`,
/// ` 10:00`), which is discarded. Also accepts spreadsheet serial numbers.
/// Returns `None` for anything else.
pub fn parse_calendar_date(input: &str) -> Option<CalendarDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let date_part = trimmed
        .split(|c: char| c == 'T' || c == ' ')
        .next()
        .unwrap_or(trimmed);

    if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        return Some(date);
    }

    trimmed
        .parse::<f64>()
        .ok()
        .and_then(from_spreadsheet_serial)
}

/// Parse an optional stored date; `None` and blank strings both yield `None`
pub fn parse_optional_date(input: Option<&str>) -> Option<CalendarDate> {
    input.and_then(parse_calendar_date)
}

/// Convert a spreadsheet serial number (days since 1899-12-30) to a calendar day.
///
/// The fractional part is a time of day and is dropped.
pub fn from_spreadsheet_serial(serial: f64) -> Option<CalendarDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let (year, month, day) = SPREADSHEET_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(year, month, day)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

/// The current local calendar day.
///
/// Not cached: call it per evaluation so derived statuses advance with the clock.
pub fn today() -> CalendarDate {
    Local::now().date_naive()
}

/// Whole calendar days from `from` to `to` (negative when `to` is earlier)
pub fn days_between(from: CalendarDate, to: CalendarDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

/// Add a signed number of days, saturating at the calendar bounds
pub fn add_days(date: CalendarDate, days: i64) -> CalendarDate {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

/// Short Spanish-locale label, e.g. `5/1/2024`
pub fn format_short_es(date: CalendarDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

/// ISO `YYYY-MM-DD` rendering used for storage and calendar bucketing
pub fn format_iso(date: CalendarDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
