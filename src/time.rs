//! Time window handling
//!
//! The `TimeWindow` is the `{from, to}` pair every time-relative macro resolves
//! against. It is supplied per query by the caller and never mutated.

use crate::macros::parse_duration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The active time range of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window
    pub from: DateTime<Utc>,
    /// End of the window
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a new time window
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Create a time window, returning None if `from` is after `to`
    pub fn try_new(from: DateTime<Utc>, to: DateTime<Utc>) -> Option<Self> {
        if from <= to {
            Some(Self { from, to })
        } else {
            None
        }
    }

    /// Window ending now and spanning the given duration
    pub fn last(duration: chrono::Duration) -> Self {
        let to = Utc::now();
        Self {
            from: to - duration,
            to,
        }
    }

    /// Start of the window as an RFC3339 timestamp with nanosecond precision
    pub fn from_rfc3339_nano(&self) -> String {
        format_rfc3339_nano(&self.from)
    }

    /// End of the window as an RFC3339 timestamp with nanosecond precision
    pub fn to_rfc3339_nano(&self) -> String {
        format_rfc3339_nano(&self.to)
    }

    /// Start of the window in Unix epoch seconds
    pub fn from_epoch_secs(&self) -> i64 {
        self.from.timestamp()
    }

    /// End of the window in Unix epoch seconds
    pub fn to_epoch_secs(&self) -> i64 {
        self.to.timestamp()
    }
}

/// Format an instant as RFC3339 with nanosecond precision.
///
/// Trailing zeros of the fractional part are dropped, and the fraction is
/// omitted entirely for whole seconds:
///
/// ```text
/// 2021-01-01T12:00:00Z
/// 2021-01-01T12:00:00.5Z
/// 2021-01-01T12:00:00.000000001Z
/// ```
pub fn format_rfc3339_nano(instant: &DateTime<Utc>) -> String {
    let base = instant.format("%Y-%m-%dT%H:%M:%S");
    let nanos = instant.timestamp_subsec_nanos() % 1_000_000_000;

    if nanos == 0 {
        return format!("{}Z", base);
    }

    let fraction = format!("{:09}", nanos);
    format!("{}.{}Z", base, fraction.trim_end_matches('0'))
}

/// Parse a command-line instant relative to `now`.
///
/// Accepts `now`, `now-<duration>` (e.g. `now-6h`), RFC3339 timestamps and
/// Unix epoch seconds.
pub fn parse_instant(input: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if input.eq_ignore_ascii_case("now") {
        return Some(now);
    }

    if let Some(offset) = input.strip_prefix("now-") {
        let duration = parse_duration(offset).ok()?;
        let duration = chrono::Duration::from_std(duration).ok()?;
        return now.checked_sub_signed(duration);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    input
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_whole_seconds() {
        let dt = Utc.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(format_rfc3339_nano(&dt), "2021-01-01T12:00:00Z");
    }

    #[test]
    fn test_format_trims_fraction() {
        let dt = Utc.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap()
            + chrono::Duration::milliseconds(500);
        assert_eq!(format_rfc3339_nano(&dt), "2021-01-01T12:00:00.5Z");

        let dt = Utc.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(1);
        assert_eq!(format_rfc3339_nano(&dt), "2021-01-01T12:00:00.000000001Z");
    }

    #[test]
    fn test_window_epoch_bounds() {
        let window = TimeWindow::new(
            Utc.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2021, 1, 25, 12, 0, 0).unwrap(),
        );
        assert_eq!(window.from_epoch_secs(), 1609502400);
        assert_eq!(window.to_epoch_secs(), 1611576000);
    }

    #[test]
    fn test_try_new_rejects_inverted_window() {
        let now = Utc::now();
        assert!(TimeWindow::try_new(now, now - chrono::Duration::hours(1)).is_none());
        assert!(TimeWindow::try_new(now, now).is_some());
    }

    #[test]
    fn test_parse_instant() {
        let now = Utc.with_ymd_and_hms(2021, 1, 25, 12, 0, 0).unwrap();

        assert_eq!(parse_instant("now", now), Some(now));
        assert_eq!(
            parse_instant("now-6h", now),
            Some(Utc.with_ymd_and_hms(2021, 1, 25, 6, 0, 0).unwrap())
        );
        assert_eq!(
            parse_instant("2021-01-01T12:00:00Z", now),
            Some(Utc.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(
            parse_instant("1609502400", now),
            Some(Utc.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(parse_instant("yesterday-ish", now), None);
    }
}
