//! Timestamp formatting for API responses.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Convert a stored timestamp to RFC 3339 in UTC.
///
/// The database writes `YYYY-MM-DD HH:MM:SS` in UTC. Values already in
/// RFC 3339 are normalized to UTC; anything unparseable is returned as is.
pub fn to_rfc3339(datetime_str: &str) -> String {
    if let Ok(naive) = NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%d %H:%M:%S") {
        return naive.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(datetime_str) {
        return dt
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true);
    }

    datetime_str.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_format() {
        assert_eq!(to_rfc3339("2024-01-15 10:30:00"), "2024-01-15T10:30:00Z");
    }

    #[test]
    fn test_rfc3339_with_offset() {
        assert_eq!(
            to_rfc3339("2024-01-15T19:30:00+09:00"),
            "2024-01-15T10:30:00Z"
        );
    }

    #[test]
    fn test_unparseable_passthrough() {
        assert_eq!(to_rfc3339("yesterday"), "yesterday");
    }
}
