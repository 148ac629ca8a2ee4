//! DC-09 timestamp handling
//!
//! Frames may carry a `_HH:MM:SS,MM-DD-YYYY` suffix giving the panel's
//! UTC wall clock at send time. The receiver tolerates a bounded skew:
//! frames older than `allowed_past` or further than `allowed_future` in
//! the future are NAKed so the panel resends with a fresh clock.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Wire format of the timestamp suffix
const WIRE_FORMAT: &str = "%H:%M:%S,%m-%d-%Y";

/// Skew window applied to reported timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkewWindow {
    /// Maximum age of an acceptable frame
    pub allowed_past: Duration,
    /// Maximum clock lead of an acceptable frame
    pub allowed_future: Duration,
}

impl Default for SkewWindow {
    fn default() -> Self {
        Self {
            allowed_past: Duration::seconds(20),
            allowed_future: Duration::seconds(40),
        }
    }
}

impl SkewWindow {
    pub fn from_seconds(allowed_past: i64, allowed_future: i64) -> Self {
        Self {
            allowed_past: Duration::seconds(allowed_past),
            allowed_future: Duration::seconds(allowed_future),
        }
    }

    /// Check a reported timestamp against `now`.
    pub fn contains(&self, reported: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let age = now - reported;
        age <= self.allowed_past && -age <= self.allowed_future
    }
}

/// Parse the timestamp suffix as UTC. Returns `None` for malformed input.
pub fn parse_wire(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, WIRE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Render a timestamp the way it appears on the wire.
pub fn to_wire(ts: DateTime<Utc>) -> String {
    ts.format(WIRE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire() {
        let ts = parse_wire("14:12:04,09-25-2019").unwrap();
        assert_eq!(to_wire(ts), "14:12:04,09-25-2019");
        assert!(parse_wire("25:99:99,13-40-2019").is_none());
        assert!(parse_wire("garbage").is_none());
    }

    #[test]
    fn test_skew_window_defaults() {
        let window = SkewWindow::default();
        let now = Utc::now();

        assert!(window.contains(now, now));
        assert!(window.contains(now - Duration::seconds(19), now));
        assert!(!window.contains(now - Duration::seconds(21), now));
        assert!(window.contains(now + Duration::seconds(39), now));
        assert!(!window.contains(now + Duration::seconds(41), now));
    }

    #[test]
    fn test_skew_window_custom() {
        let window = SkewWindow::from_seconds(5, 5);
        let now = Utc::now();
        assert!(!window.contains(now - Duration::seconds(6), now));
        assert!(!window.contains(now + Duration::seconds(6), now));
        assert!(window.contains(now - Duration::seconds(4), now));
    }

    #[test]
    fn test_ten_minutes_old_is_rejected() {
        let window = SkewWindow::default();
        let now = Utc::now();
        assert!(!window.contains(now - Duration::minutes(10), now));
    }
}
