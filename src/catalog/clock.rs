//! Clock-string conversion
//!
//! Clients that only know wall-clock times send values like `"02:30:00 PM"`.
//! These are anchored to the current UTC calendar day with a zero sub-second
//! fraction. Full RFC 3339 timestamps are accepted as-is.

use crate::error::{LedgerError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Convert a 12-hour clock string (`HH:MM:SS AM|PM`) to an instant on `date`.
pub fn clock_to_instant(input: &str, date: NaiveDate) -> Result<DateTime<Utc>> {
    let invalid = || LedgerError::validation(format!("invalid clock time: {:?}", input));

    let mut parts = input.split_whitespace();
    let (Some(clock), Some(meridiem), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };

    let fields: Vec<&str> = clock.split(':').collect();
    if fields.len() != 3 {
        return Err(invalid());
    }
    let parse = |s: &str| s.parse::<u32>().map_err(|_| invalid());
    let (hour, minute, second) = (parse(fields[0])?, parse(fields[1])?, parse(fields[2])?);
    if !(1..=12).contains(&hour) {
        return Err(invalid());
    }

    let hour = match meridiem.to_ascii_uppercase().as_str() {
        "PM" if hour != 12 => hour + 12,
        "PM" => hour,
        "AM" if hour == 12 => 0,
        "AM" => hour,
        _ => return Err(invalid()),
    };

    let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(invalid)?;
    Ok(date.and_time(time).and_utc())
}

/// Accept either an RFC 3339 timestamp or a clock string anchored to `now`'s date.
pub fn parse_time_input(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }
    clock_to_instant(trimmed, now.date_naive())
}
