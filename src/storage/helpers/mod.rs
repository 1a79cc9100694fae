//! Shared storage helper functions.
//!
//! Timestamp encoding and row decoding used across storage backends.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::interfaces::ledger_store::Result;

/// Encode a timestamp as fixed-width RFC3339 (UTC, microseconds).
///
/// The fixed width keeps lexicographic order equal to chronological order,
/// which the window queries rely on.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode an RFC3339 timestamp into UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

/// Decode an optional RFC3339 column.
pub fn parse_optional_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_timestamp).transpose()
}

/// Clamp a caller-provided limit into SQL `LIMIT` range.
pub fn sql_limit(limit: usize) -> u64 {
    u64::try_from(limit).unwrap_or(u64::MAX).min(i64::MAX as u64)
}
