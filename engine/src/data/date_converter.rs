//! Business-date normalization for spreadsheet imports and form input.
//!
//! Spreadsheet serial dates count days from a day zero of 1899-12-31 and treat
//! 1900 as a leap year, so every serial above 59 (the fictitious 1900-02-29)
//! is one day ahead of the calendar. Serials are only recognised inside
//! `(1, 100000)`; other numbers are read as millisecond Unix timestamps.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use shared::models::{CellValue, DateConversionResult};

const SERIAL_LOWER_BOUND: f64 = 1.0;
const SERIAL_UPPER_BOUND: f64 = 100_000.0;
/// Serial of the phantom 1900-02-29 minus one: the last serial that needs no correction.
const LAST_SERIAL_BEFORE_PHANTOM_LEAP_DAY: f64 = 59.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

pub const BUSINESS_YEARS_BACK: i32 = 100;
pub const BUSINESS_YEARS_AHEAD: i32 = 1;

pub const INVALID_DATE_WARNING: &str = "Invalid date format";
pub const FUTURE_DATE_WARNING: &str = "GRN date is in the future";
pub const STALE_DATE_WARNING: &str = "GRN date is more than one year old";

// Tried in order; the first format that parses the whole string wins.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d %b %Y",
    "%d-%b-%Y",
    "%b %d, %Y",
];

fn excel_day_zero() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 31).map(|d| d.and_time(NaiveTime::MIN))
}

fn in_serial_range(n: f64) -> bool {
    n > SERIAL_LOWER_BOUND && n < SERIAL_UPPER_BOUND
}

pub fn is_excel_serial_date(value: &CellValue) -> bool {
    value.as_number().is_some_and(in_serial_range)
}

/// Converts a spreadsheet serial to a date-time, keeping the fractional part
/// as time of day. Serials above 59 lose the phantom 1900-02-29.
pub fn convert_excel_serial_date(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let adjusted = if serial > LAST_SERIAL_BEFORE_PHANTOM_LEAP_DAY {
        serial - 1.0
    } else {
        serial
    };
    let offset = chrono::Duration::try_milliseconds((adjusted * MILLIS_PER_DAY).round() as i64)?;
    excel_day_zero()?.checked_add_signed(offset)
}

fn convert_timestamp_millis(millis: f64) -> Option<NaiveDateTime> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.trunc() as i64).map(|dt| dt.naive_utc())
}

fn parse_date_text(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

pub fn convert_to_date(value: &CellValue) -> Option<NaiveDateTime> {
    match value {
        CellValue::Empty => None,
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Number(n) if in_serial_range(*n) => convert_excel_serial_date(*n),
        CellValue::Number(n) => convert_timestamp_millis(*n),
        CellValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                parse_date_text(trimmed)
            }
        }
        CellValue::Bool(_) | CellValue::Other => None,
    }
}

/// `YYYY-MM-DD`, the only date shape downstream storage accepts.
pub fn to_iso_date_string(value: &CellValue) -> Option<String> {
    convert_to_date(value).map(|dt| format_iso_date(dt.date()))
}

pub fn format_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Inclusive plausibility window around `today`: Jan 1 a century back to Dec 31 next year.
pub fn business_date_range(today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let earliest = NaiveDate::from_ymd_opt(today.year() - BUSINESS_YEARS_BACK, 1, 1)?;
    let latest = NaiveDate::from_ymd_opt(today.year() + BUSINESS_YEARS_AHEAD, 12, 31)?;
    Some((earliest, latest))
}

pub fn is_valid_business_date_on(date: NaiveDate, today: NaiveDate) -> bool {
    business_date_range(today).is_some_and(|(earliest, latest)| date >= earliest && date <= latest)
}

pub fn is_valid_business_date(date: NaiveDate) -> bool {
    is_valid_business_date_on(date, Utc::now().date_naive())
}

/// Normalizes a GRN date. Only unconvertible input is invalid; implausible,
/// future and stale dates come back valid with warnings attached.
pub fn convert_and_validate_grn_date(value: &CellValue) -> DateConversionResult {
    convert_and_validate_grn_date_at(value, Utc::now().naive_utc())
}

pub fn convert_and_validate_grn_date_at(value: &CellValue, now: NaiveDateTime) -> DateConversionResult {
    let Some(converted) = convert_to_date(value) else {
        return DateConversionResult::invalid(INVALID_DATE_WARNING);
    };

    let date = converted.date();
    let today = now.date();
    let mut warnings = Vec::new();

    if !is_valid_business_date_on(date, today) {
        let range = business_date_range(today)
            .map(|(earliest, latest)| format!(" ({} to {})", format_iso_date(earliest), format_iso_date(latest)))
            .unwrap_or_default();
        warnings.push(format!(
            "GRN date {} is outside the expected business range{}",
            format_iso_date(date),
            range
        ));
    }
    if converted > now {
        warnings.push(FUTURE_DATE_WARNING.to_string());
    }
    // Calendar comparison: a GRN dated exactly one year ago is not stale yet.
    if today
        .checked_sub_months(Months::new(12))
        .is_some_and(|year_ago| date < year_ago)
    {
        warnings.push(STALE_DATE_WARNING.to_string());
    }

    if !warnings.is_empty() {
        tracing::debug!(date = %format_iso_date(date), ?warnings, "GRN date accepted with warnings");
    }
    DateConversionResult::valid(format_iso_date(date), warnings)
}
