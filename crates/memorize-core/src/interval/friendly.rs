//! Human-friendly descriptions of due dates.

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

const FALLBACK_TIMEZONE: Tz = Tz::GMT;

/// A due date described relative to "now".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendlyDate {
    /// Absolute date in the user's timezone, e.g. `October 17th 2026, 3:04 pm PDT`.
    pub label: String,
    /// Whole days until the timestamp (negative if in the past).
    pub days_in_future: i64,
    /// Whole hours until the timestamp (negative if in the past).
    pub hours_in_future: i64,
    /// `8 days`, `1 day`, `5 hours`, `3 days ago`...
    pub relative: String,
}

/// Parse an IANA timezone name, falling back to GMT when unset or unknown.
pub fn resolve_timezone(timezone: Option<&str>) -> Tz {
    match timezone.map(str::trim).filter(|tz| !tz.is_empty()) {
        Some(name) => name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(timezone = name, "unknown timezone, falling back to GMT");
            FALLBACK_TIMEZONE
        }),
        None => FALLBACK_TIMEZONE,
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// Describe `timestamp` for a user in `timezone`.
///
/// Days and hours are whole units truncated toward zero. The relative
/// phrase uses days once the distance reaches one day, hours below that.
pub fn friendly_date(
    timestamp: DateTime<Utc>,
    timezone: Option<&str>,
    now: DateTime<Utc>,
) -> FriendlyDate {
    let tz = resolve_timezone(timezone);
    let local = timestamp.with_timezone(&tz);
    let label = format!(
        "{} {}{} {}",
        local.format("%B"),
        local.day(),
        ordinal_suffix(local.day()),
        local.format("%Y, %-I:%M %P %Z"),
    );

    let secs = (timestamp - now).num_seconds();
    let days_in_future = secs / 86_400;
    let hours_in_future = secs / 3_600;

    let magnitude = if days_in_future != 0 {
        plural(days_in_future.abs(), "day")
    } else {
        plural(hours_in_future.abs(), "hour")
    };
    let relative = if secs < 0 && hours_in_future != 0 {
        format!("{magnitude} ago")
    } else {
        magnitude
    };

    FriendlyDate {
        label,
        days_in_future,
        hours_in_future,
        relative,
    }
}
