use chrono::{DateTime, SecondsFormat, Utc};

/// Normalise an RFC 3339 timestamp to UTC `YYYY-MM-DDTHH:MM:SSZ`.
/// Returns `None` for unparseable input.
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| {
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        })
}
