use chrono::{DateTime, NaiveDateTime, Utc};

/// Parses an RFC 3339 timestamp into naive UTC. Inputs without an offset
/// (`2030-01-01T10:00:00`) are taken as UTC.
pub fn parse(s: &str) -> Result<NaiveDateTime, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).naive_utc());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|_| format!("invalid timestamp: {s}"))
}

pub fn parse_opt(s: Option<&str>) -> Result<Option<NaiveDateTime>, String> {
    s.map(parse).transpose()
}

pub fn format(ts: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc).to_rfc3339()
}
