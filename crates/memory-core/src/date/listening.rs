use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

/// ISO 8601 forms with an explicit offset that RFC 3339 rejects: minutes-only
/// times and offsets without a colon.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse the `ts` field of a streaming-history record.
///
/// Exports normally write `2024-03-05T18:22:41Z`. Older or hand-edited files
/// carry an explicit offset, fractional seconds, a space instead of `T`, or no
/// zone at all; offset-less values are taken as UTC. Returns `None` when
/// nothing matches, in which case the record cannot be bucketed.
pub fn parse_stream_timestamp(ts: &str) -> Option<DateTime<FixedOffset>> {
    let ts = ts.trim();

    // 1. Strict export format (UTC)
    if let Ok(naive) = NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%SZ") {
        return Some(naive.and_utc().fixed_offset());
    }

    // 2. Lenient RFC 3339 with explicit offset
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt);
    }

    // 3. Other ISO 8601 shapes
    let ts = normalize_iso(ts);
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&ts, format) {
            return Some(dt);
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&ts, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(&ts, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset());
    }

    None
}

/// `T` for a space date/time separator, `+00:00` for a trailing `Z`.
fn normalize_iso(ts: &str) -> String {
    let mut out = match (ts.get(..10), ts.get(10..11), ts.get(11..)) {
        (Some(date), Some(" "), Some(time)) => format!("{}T{}", date, time),
        _ => ts.to_string(),
    };
    if out.ends_with('Z') {
        out.pop();
        out.push_str("+00:00");
    }
    out
}
