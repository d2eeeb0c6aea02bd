//! Date, clock and duration parsing for roster files.

use chrono::{NaiveDate, NaiveTime};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"];
const CLOCK_FORMATS: [&str; 4] = ["%H:%M:%S", "%H:%M", "%I:%M %p", "%I:%M:%S %p"];
const MINUTES_PER_DAY: i32 = 24 * 60;

/// Longest net office time a roster cell may state.
const MAX_DURATION_HOURS: i32 = 24;

/// Parses a roster date in any of the accepted layouts.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Parses a wall-clock time such as `09:15`, `09:15:30` or `9:15 PM`.
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        return None;
    }
    CLOCK_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

/// Parses a duration written as `H:MM` or `H:MM:SS` into whole minutes.
///
/// Durations over 24 hours are rejected.
pub fn parse_duration_minutes(raw: &str) -> Option<i32> {
    let mut parts = raw.trim().split(':');
    let hours: i32 = parts.next()?.trim().parse().ok()?;
    let minutes: i32 = parts.next()?.trim().parse().ok()?;
    let seconds: i32 = match parts.next() {
        Some(s) => s.trim().parse().ok()?,
        None => 0,
    };
    if parts.next().is_some()
        || !(0..=MAX_DURATION_HOURS).contains(&hours)
        || !(0..60).contains(&minutes)
        || !(0..60).contains(&seconds)
    {
        return None;
    }
    let total = hours.checked_mul(60)?.checked_add(minutes)?;
    (total <= MAX_DURATION_HOURS * 60).then_some(total)
}

/// Minutes between first punch-in and last punch-out.
///
/// A punch-out earlier than the punch-in is a night shift crossing midnight.
pub fn office_minutes(first_in: NaiveTime, last_out: NaiveTime) -> i32 {
    let diff = i32::try_from((last_out - first_in).num_minutes()).unwrap_or(0);
    if diff < 0 {
        diff + MINUTES_PER_DAY
    } else {
        diff
    }
}

/// Formats minutes as `HH:MM`.
pub fn format_minutes(minutes: i32) -> String {
    let minutes = minutes.max(0);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Parses the present/absent flag of a roster file cell.
///
/// Spreadsheets exported by different desks spell it differently, so the
/// common variants are all accepted.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "present" | "p" | "✅" => Some(true),
        "false" | "0" | "no" | "n" | "absent" | "a" | "❌" => Some(false),
        _ => None,
    }
}

/// Parses a `True`/`False` wire flag, ignoring case.
pub fn parse_wire_flag(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Wire form of a present/absent flag.
pub const fn flag_str(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}
