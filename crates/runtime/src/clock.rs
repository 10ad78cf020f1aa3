//! Time sources for interval timestamps

use chrono::{Duration, Local, NaiveDateTime};
use std::fmt::Write;
use std::sync::Mutex;
use tracing::warn;

/// Fallback when the configured format cannot render
const FALLBACK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Supplies "now" for interval timestamps
pub trait TimeSource: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Manually driven time, for tests and replays
#[derive(Debug)]
pub struct ManualTimeSource {
    now: Mutex<NaiveDateTime>,
}

impl ManualTimeSource {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, time: NaiveDateTime) {
        if let Ok(mut now) = self.now.lock() {
            *now = time;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Render a timestamp, falling back to ISO-8601 for unusable formats
pub fn format_timestamp(time: NaiveDateTime, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", time.format(format)).is_err() {
        warn!("Invalid timestamp format '{}', using {}", format, FALLBACK_FORMAT);
        out.clear();
        // FALLBACK_FORMAT is always renderable
        let _ = write!(out, "{}", time.format(FALLBACK_FORMAT));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, FALLBACK_FORMAT).unwrap()
    }

    #[test]
    fn test_format_timestamp() {
        let t = at("2024-03-01T09:30:00");
        assert_eq!(format_timestamp(t, "%Y-%m-%dT%H:%M:%S"), "2024-03-01T09:30:00");
        assert_eq!(format_timestamp(t, "%Y-%m-%d %H:%M"), "2024-03-01 09:30");
    }

    #[test]
    fn test_invalid_format_falls_back() {
        let t = at("2024-03-01T09:30:00");
        assert_eq!(format_timestamp(t, "%Q"), "2024-03-01T09:30:00");
    }

    #[test]
    fn test_manual_time_source() {
        let source = ManualTimeSource::new(at("2024-03-01T09:00:00"));
        source.advance(Duration::minutes(45));
        assert_eq!(source.now(), at("2024-03-01T09:45:00"));
        source.set(at("2024-03-02T00:00:00"));
        assert_eq!(source.now(), at("2024-03-02T00:00:00"));
    }
}
