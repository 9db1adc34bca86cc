use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;

/// Canonical storage format for timestamps: RFC 3339 UTC with millisecond
/// precision (`2026-08-30T12:34:56.789Z`). One uniform width means SQL string
/// comparison matches chronological order.
pub fn format_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_utc_string() -> String {
    format_utc(Utc::now())
}

/// Parse a stored timestamp back out of the database. A corrupt value is
/// logged and replaced with the epoch rather than failing the whole response.
pub fn parse_stored(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>().unwrap_or_else(|e| {
        warn!("Corrupt stored timestamp '{}': {}", raw, e);
        DateTime::default()
    })
}
