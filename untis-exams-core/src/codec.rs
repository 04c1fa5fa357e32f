//! WebUntis compact integer date/time encoding.
//!
//! Dates travel as `YYYYMMDD` integers and times of day as `HHMM` integers
//! (leading zeros implicit, so `5` is `00:05`). Ranges are not validated at the
//! wire level; an integer that does not form a real date or time is reported
//! when it is converted into a chrono value.

use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

use crate::{Error, Result};

/// Splits an encoded date into `(year, month, day)` without validating it.
pub const fn split_date(value: i64) -> (i64, i64, i64) {
    (value / 10_000, (value / 100) % 100, value % 100)
}

/// Splits an encoded time into `(hour, minute)` without validating it.
pub const fn split_time(value: i64) -> (i64, i64) {
    (value / 100, value % 100)
}

pub fn date_from_int(value: i64) -> Option<NaiveDate> {
    let (year, month, day) = split_date(value);
    NaiveDate::from_ymd_opt(
        i32::try_from(year).ok()?,
        u32::try_from(month).ok()?,
        u32::try_from(day).ok()?,
    )
}

pub fn time_from_int(value: i64) -> Option<NaiveTime> {
    let (hour, minute) = split_time(value);
    NaiveTime::from_hms_opt(u32::try_from(hour).ok()?, u32::try_from(minute).ok()?, 0)
}

/// Decodes the JSON value of a date field, naming `field` on failure.
pub fn decode_date(field: &str, value: &Value) -> Result<NaiveDate> {
    let raw = integer(field, value)?;
    date_from_int(raw)
        .ok_or_else(|| Error::wire(field, format!("{raw} is not a valid YYYYMMDD date")))
}

/// Decodes the JSON value of a time-of-day field, naming `field` on failure.
pub fn decode_time(field: &str, value: &Value) -> Result<NaiveTime> {
    let raw = integer(field, value)?;
    time_from_int(raw)
        .ok_or_else(|| Error::wire(field, format!("{raw} is not a valid HHMM time")))
}

fn integer(field: &str, value: &Value) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| Error::wire(field, format!("expected an integer, got {value}")))
}

/// `YYYYMMDD` form used in the exam query string.
pub fn query_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Locale-invariant short form for logs. Never sent back to the service.
pub fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn encode_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}
