//! Nanosecond timestamp helpers.

use chrono::{DateTime, Utc};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Convert a trace timestamp (ns since epoch) into a UTC datetime
pub fn ns_to_datetime(timestamp: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(timestamp / NANOS_PER_SEC).ok()?;
    let nanos = (timestamp % NANOS_PER_SEC) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
}

/// Format a trace timestamp as RFC 3339, falling back to the raw value
pub fn format_timestamp(timestamp: u64) -> String {
    ns_to_datetime(timestamp)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Convert nanoseconds to milliseconds
pub fn ns_to_ms(duration: u64) -> f64 {
    duration as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ns_to_datetime() {
        let dt = ns_to_datetime(1_500_000_000).unwrap();
        assert_eq!(dt.timestamp(), 1);
        assert_eq!(dt.timestamp_subsec_nanos(), 500_000_000);
    }

    #[test]
    fn test_format_timestamp_epoch() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_ns_to_ms() {
        assert_eq!(ns_to_ms(2_500_000), 2.5);
    }
}
