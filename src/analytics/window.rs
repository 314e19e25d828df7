// Period tags -> concrete [start, end] windows. Month and year are fixed 30/365-day offsets.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use super::AnalyticsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Hour,
    Day,
    Week,
    Month,
    Year,
    Custom,
}

impl Period {
    /// Unrecognized tags resolve to `Day`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "hour" => Period::Hour,
            "day" => Period::Day,
            "week" => Period::Week,
            "month" => Period::Month,
            "year" => Period::Year,
            "custom" => Period::Custom,
            _ => Period::Day,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Hour => "hour",
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
            Period::Custom => "custom",
        }
    }

    /// Fixed lookback for the relative periods; None for `Custom`.
    pub fn lookback(&self) -> Option<Duration> {
        match self {
            Period::Hour => Some(Duration::hours(1)),
            Period::Day => Some(Duration::days(1)),
            Period::Week => Some(Duration::days(7)),
            Period::Month => Some(Duration::days(30)),
            Period::Year => Some(Duration::days(365)),
            Period::Custom => None,
        }
    }
}

/// Closed interval of instants; both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window of `lookback` ending at `now`.
    pub fn ending_at(now: DateTime<Utc>, lookback: Duration) -> Self {
        Self::new(now - lookback, now)
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Equal-length window ending where this one starts.
    pub fn preceding(&self) -> Self {
        Self::new(self.start - self.duration(), self.start)
    }
}

/// Resolve a period tag into a window ending at `now`. `start`/`end` are only read for `custom`.
pub fn resolve(
    tag: &str,
    start: Option<&str>,
    end: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Window, AnalyticsError> {
    let period = Period::from_tag(tag);
    match period.lookback() {
        Some(lookback) => Ok(Window::ending_at(now, lookback)),
        None => {
            let (Some(start), Some(end)) = (start, end) else {
                return Err(AnalyticsError::MissingBounds);
            };
            Ok(Window::new(parse_instant(start)?, parse_instant(end)?))
        }
    }
}

/// Parse an ISO-8601 instant. Offsets are honored; naive date-times and bare dates are UTC.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>, AnalyticsError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AnalyticsError::InvalidDate {
            value: s.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn week_is_exactly_seven_days() {
        let w = resolve("week", None, None, now()).unwrap();
        assert_eq!(w.end, now());
        assert_eq!(w.end - w.start, Duration::days(7));
    }

    #[test]
    fn month_and_year_are_fixed_offsets() {
        let m = resolve("month", None, None, now()).unwrap();
        assert_eq!(m.duration(), Duration::days(30));
        let y = resolve("year", None, None, now()).unwrap();
        assert_eq!(y.duration(), Duration::days(365));
        let h = resolve("hour", None, None, now()).unwrap();
        assert_eq!(h.duration(), Duration::hours(1));
    }

    #[test]
    fn unknown_tag_falls_back_to_day() {
        let w = resolve("fortnight", None, None, now()).unwrap();
        assert_eq!(w, resolve("day", None, None, now()).unwrap());
        assert_eq!(w.duration(), Duration::days(1));
    }

    #[test]
    fn custom_parses_bounds_verbatim() {
        let w = resolve("custom", Some("2024-01-01"), Some("2024-01-02"), now()).unwrap();
        assert_eq!(w.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(w.end, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());

        // start after end is accepted as given
        let inverted = resolve("custom", Some("2024-02-01"), Some("2024-01-01"), now()).unwrap();
        assert!(inverted.start > inverted.end);
    }

    #[test]
    fn custom_accepts_time_and_offset_forms() {
        let a = parse_instant("2024-01-01T10:30:00").unwrap();
        assert_eq!(a, Utc.with_ymd_and_hms(2024, 1, 1, 10, 30, 0).unwrap());
        let b = parse_instant("2024-01-01T10:30:00+02:00").unwrap();
        assert_eq!(b, Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap());
        let c = parse_instant("2024-01-01 10:30").unwrap();
        assert_eq!(c, a);
        assert!(parse_instant("2024-01-01T10:30:00.250Z").is_ok());
    }

    #[test]
    fn custom_rejects_non_iso_strings() {
        let err = resolve("custom", Some("01/02/2024"), Some("2024-01-02"), now()).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidDate { ref value } if value == "01/02/2024"));
        let err = resolve("custom", Some("2024-01-01"), Some("tomorrow"), now()).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidDate { .. }));
    }

    #[test]
    fn custom_without_bounds_is_rejected() {
        let err = resolve("custom", Some("2024-01-01"), None, now()).unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingBounds));
    }

    #[test]
    fn bounds_are_inclusive() {
        let w = resolve("day", None, None, now()).unwrap();
        assert!(w.contains(w.start));
        assert!(w.contains(w.end));
        assert!(!w.contains(w.end + Duration::milliseconds(1)));
    }

    #[test]
    fn preceding_window_has_equal_length() {
        let w = resolve("week", None, None, now()).unwrap();
        let p = w.preceding();
        assert_eq!(p.end, w.start);
        assert_eq!(p.duration(), w.duration());
    }
}
