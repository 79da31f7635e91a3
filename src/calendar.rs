//! Timezone-independent conversion from a broken-down civil time to
//! seconds since the Unix epoch.
//!
//! The original C implementation of this routine binary-searches the
//! epoch-seconds axis using the host's `gmtime()` as an oracle, purely to
//! sidestep `mktime()`'s dependence on thread-local timezone/DST state.
//! `chrono`'s `NaiveDate`/`NaiveDateTime` types carry no such state to begin
//! with, so the same contract — treat the input as UTC regardless of the
//! host's timezone, accept already-normalised fields, reject anything that
//! isn't a real calendar instant — is met directly without the search.

use chrono::{NaiveDate, TimeZone, Utc};
use thiserror::Error;

/// A broken-down civil time, always interpreted as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

/// Error produced by [`utc_time`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CalendarError {
    /// The fields do not describe a valid calendar instant.
    #[error("civil time {0:?} is not a valid calendar instant")]
    OutOfRange(CivilTime),
}

/// Convert a civil time to seconds since the Unix epoch, treating the
/// input as UTC regardless of the host's timezone or daylight setting.
pub fn utc_time(civil: CivilTime) -> Result<i64, CalendarError> {
    let date = NaiveDate::from_ymd_opt(civil.year, civil.month, civil.day)
        .ok_or(CalendarError::OutOfRange(civil))?;
    let naive = date
        .and_hms_opt(civil.hour, civil.minute, civil.second)
        .ok_or(CalendarError::OutOfRange(civil))?;
    Ok(Utc.from_utc_datetime(&naive).timestamp())
}
