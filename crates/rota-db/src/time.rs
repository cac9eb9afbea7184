use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Timestamps are stored as fixed-width RFC 3339 millisecond strings in UTC
/// ("2026-08-08T09:30:00.000Z") so range filters can compare lexically.
pub fn fmt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a stored timestamp. Falls back to SQLite's bare
/// "YYYY-MM-DD HH:MM:SS" form (used by the users.created_at default) treated
/// as UTC.
pub fn parse(s: &str) -> Option<DateTime<Utc>> {
    s.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}
