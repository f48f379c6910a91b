//! Timestamp formats used by the webdrops API and the staging layout.
//!
//! The wire format has minute precision (`YYYYMMDDHHmm`) while run dates and
//! directory names have hour precision (`YYYYMMDDHH`). The two are never
//! interchangeable.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::error::{Result, WebdropsError};

/// Minute-precision format used in query strings and timelines.
pub const WIRE_FORMAT: &str = "%Y%m%d%H%M";

/// Hour-precision format used for run dates and directory names.
pub const HOUR_FORMAT: &str = "%Y%m%d%H";

/// Format an instant for the wire.
pub fn format_wire(instant: &DateTime<Utc>) -> String {
    instant.format(WIRE_FORMAT).to_string()
}

/// Parse a wire timestamp such as `202306011230`.
pub fn parse_wire(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, WIRE_FORMAT)
        .map(|ndt| Utc.from_utc_datetime(&ndt))
        .map_err(|e| WebdropsError::decode(format!("timestamp '{}'", s), e))
}

/// Format an instant at hour precision.
pub fn format_hour(instant: &DateTime<Utc>) -> String {
    instant.format(HOUR_FORMAT).to_string()
}

/// Parse an hour-precision date such as `2023060112`.
pub fn parse_hour(s: &str) -> Result<DateTime<Utc>> {
    // chrono needs a minute field to build a NaiveDateTime
    if s.len() != 10 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WebdropsError::decode(
            format!("date '{}'", s),
            "expected YYYYMMDDHH",
        ));
    }
    parse_wire(&format!("{}00", s))
}
