//! Windows FILETIME conversion and the line timestamp format.

use jiff::tz::TimeZone;
use jiff::Timestamp;

use crate::error::{HistoryError, Result};

/// Seconds between 1601-01-01 and 1970-01-01 (UTC).
pub const UNIX_EPOCH_SECONDS: i64 = 11_644_473_600;

/// FILETIME resolution is 100ns.
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Date and time prefix of every report line.
///
/// `%I` is the 12-hour hour field with no AM/PM marker. Existing consumers of
/// the report depend on this exact shape.
pub const LINE_TIME_FORMAT: &str = "%Y/%m/%d %I:%M:%S";

/// Convert a FILETIME (100ns ticks since 1601-01-01 UTC) to a timestamp.
///
/// `offset` is only used to locate the value in error messages.
pub fn filetime_to_timestamp(ticks: u64, offset: usize) -> Result<Timestamp> {
    // u64::MAX / TICKS_PER_SECOND fits an i64; the sub-second part fits an i32
    let seconds = (ticks / TICKS_PER_SECOND) as i64 - UNIX_EPOCH_SECONDS;
    let nanos = ((ticks % TICKS_PER_SECOND) * 100) as i32;
    Timestamp::new(seconds, nanos).map_err(|_| HistoryError::TimestampOutOfRange { ticks, offset })
}

/// Render a timestamp the way report lines show it, in the given zone.
pub fn format_line_time(timestamp: Timestamp, tz: &TimeZone) -> String {
    timestamp
        .to_zoned(tz.clone())
        .strftime(LINE_TIME_FORMAT)
        .to_string()
}
