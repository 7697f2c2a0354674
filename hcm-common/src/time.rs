//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Render a timestamp as `dd/mm/yyyy` for listings
pub fn format_display_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%d/%m/%Y").to_string()
}

/// Milliseconds since the Unix epoch, used to prefix stored asset names
pub fn unix_millis(timestamp: &DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_display_date_is_zero_padded() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 7, 23, 59, 0).unwrap();
        assert_eq!(format_display_date(&ts), "07/03/2025");
    }

    #[test]
    fn test_unix_millis() {
        let ts = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 1).unwrap();
        assert_eq!(unix_millis(&ts), 1000);
    }
}
