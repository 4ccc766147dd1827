use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::trace;

use crate::{AppError, AppResult};

const CIVIL_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month padding:zero]-[day padding:zero] [hour padding:zero]:[minute padding:zero]:[second padding:zero]"
);

/// Offset of a `±HHMM` timezone label in seconds.
#[tracing::instrument(level = "trace")]
pub fn tz_offset_secs(tz: &str) -> AppResult<i64> {
    let invalid = || AppError::Integrity(format!("bad timezone offset {tz:?}"));
    let (sign, digits) = match tz.as_bytes().first() {
        Some(b'+') => (1, &tz[1..]),
        Some(b'-') => (-1, &tz[1..]),
        _ => return Err(invalid()),
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i64 = digits[..2].parse()?;
    let minutes: i64 = digits[2..].parse()?;
    Ok(sign * (hours * 60 + minutes) * 60)
}

/// Render a commit timestamp as the wall-clock time of its own timezone,
/// e.g. `2001-09-08 20:46:40 -0500`.
#[tracing::instrument(level = "trace")]
pub fn format_local_date(timestamp: i64, tz: &str) -> AppResult<String> {
    let local = timestamp
        .checked_add(tz_offset_secs(tz)?)
        .ok_or_else(|| AppError::Integrity(format!("timestamp {timestamp} out of range")))?;
    let shifted = OffsetDateTime::from_unix_timestamp(local)?;
    let civil = shifted.format(CIVIL_FORMAT)?;
    trace!("Formatted timestamp {} at {} as {}", timestamp, tz, civil);
    Ok(format!("{civil} {tz}"))
}
