//! ISO-8601 timestamp → hour of day.
//!
//! The hour is the wall-clock hour as written; an explicit offset is honoured
//! for parsing but not converted to UTC, matching how the training data was
//! bucketed.

use crate::error::ScoringError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y%m%dT%H%M%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
];

fn invalid(input: &str, reason: &str) -> ScoringError {
    ScoringError::InvalidTimestamp {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand reduced forms chrono has no format for: an hour-only clock `HH`
/// becomes `HH:00`, an hour-only offset `±HH` becomes `±HH:00`, and a decimal
/// comma becomes a point.
fn expand_reduced(s: &str) -> String {
    let s = s.replace(',', ".");
    let Some(sep) = s.find(['T', 't', ' ']) else {
        return s;
    };
    let (date, rest) = s.split_at(sep);
    if !date.contains('-') {
        return s;
    }
    let (sep, time) = rest.split_at(1);
    let (clock, offset) = match time.find(['+', '-']) {
        Some(i) => time.split_at(i),
        None => (time, ""),
    };
    let two_digits = |t: &str| t.len() == 2 && t.bytes().all(|b| b.is_ascii_digit());
    let clock_pad = if two_digits(clock) { ":00" } else { "" };
    let offset_pad = if offset.len() == 3 && two_digits(&offset[1..]) { ":00" } else { "" };
    format!("{date}{sep}{clock}{clock_pad}{offset}{offset_pad}")
}

/// Parse `input` and return its hour in `[0, 23]`.
pub fn hour_of_day(input: &str) -> Result<u32, ScoringError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid(input, "empty timestamp"));
    }

    // Trailing Z is shorthand for +00:00
    let normalized = match trimmed.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{}+00:00", rest),
        None => trimmed.to_string(),
    };
    let normalized = expand_reduced(&normalized);

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(dt.hour());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Ok(dt.hour());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Ok(dt.hour());
        }
    }

    if NaiveDate::parse_from_str(&normalized, "%Y-%m-%d").is_ok() {
        return Err(invalid(input, "date has no time-of-day component"));
    }
    Err(invalid(input, "expected ISO-8601 date and time, e.g. 2025-09-19T15:22:03"))
}
