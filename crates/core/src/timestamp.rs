//! Submission timestamps.
//!
//! Timestamps cross service boundaries as ISO-8601 strings and are persisted
//! as integer microseconds since the Unix epoch, so ordering comparisons are
//! exact regardless of the database engine. Values produced by the services
//! are always truncated to microsecond precision, which makes the
//! string form round-trip losslessly.

use crate::{Error, Result};
use time::format_description::FormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

const LOCAL_WITH_FRACTION: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
const LOCAL_WHOLE_SECONDS: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Current UTC time truncated to microseconds.
pub fn now() -> OffsetDateTime {
    truncate_to_micros(OffsetDateTime::now_utc())
}

/// Drop sub-microsecond precision.
pub fn truncate_to_micros(ts: OffsetDateTime) -> OffsetDateTime {
    let nanos = ts.nanosecond();
    ts.replace_nanosecond(nanos - nanos % 1_000)
        .unwrap_or(ts)
}

/// Microseconds since the Unix epoch, rounding down.
pub fn to_unix_micros(ts: OffsetDateTime) -> i64 {
    ts.unix_timestamp_nanos().div_euclid(1_000) as i64
}

/// Smallest microsecond value `c` such that `t < ts` iff `t < c` for every
/// microsecond-precision `t`. Used to turn a cutoff into a strict bound.
pub fn cutoff_micros(ts: OffsetDateTime) -> i64 {
    let nanos = ts.unix_timestamp_nanos();
    let micros = nanos.div_euclid(1_000) + i128::from(nanos.rem_euclid(1_000) > 0);
    micros as i64
}

/// Convert stored microseconds back to a UTC timestamp.
pub fn from_unix_micros(micros: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
        .map_err(|e| Error::InvalidTimestamp(format!("{micros}us out of range: {e}")))
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 (with offset) and local date-times without an offset
/// (`2024-05-01T12:00:00`, optional fraction, `T` or space separator), which
/// are interpreted as UTC.
pub fn parse(s: &str) -> Result<OffsetDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::InvalidTimestamp("empty timestamp".to_string()));
    }
    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(ts.to_offset(time::UtcOffset::UTC));
    }

    let normalized = match s.as_bytes().get(10) {
        Some(b' ') => format!("{}T{}", &s[..10], &s[11..]),
        _ => s.to_string(),
    };
    PrimitiveDateTime::parse(&normalized, LOCAL_WITH_FRACTION)
        .or_else(|_| PrimitiveDateTime::parse(&normalized, LOCAL_WHOLE_SECONDS))
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| Error::InvalidTimestamp(format!("{s:?}: {e}")))
}

/// Format as RFC 3339 in UTC.
pub fn format(ts: OffsetDateTime) -> String {
    ts.to_offset(time::UtcOffset::UTC)
        .format(&Rfc3339)
        .unwrap_or_else(|_| ts.unix_timestamp().to_string())
}

/// Serde adapter for ISO-8601 timestamp fields.
pub mod iso8601 {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(ts: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<OffsetDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse(&s).map_err(serde::de::Error::custom)
    }
}
