//! Punch state machine.
//!
//! Pure transitions over a single monthly log. Multiple in/out cycles per
//! day are allowed (breaks), provided every earlier interval of the day is
//! closed before a new clock-in starts.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::models::{LogInterval, MonthlyLog, PunchMode, ShiftWindow};

/// Punch state violations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PunchError {
    #[error("You are already tracking today")]
    AlreadyTracking,

    #[error("You first need to start tracking")]
    NoOpenPunch,
}

/// Expected next punch given the latest in/out timestamps of a log.
///
/// Timestamps are compared rather than trusting field presence alone, so
/// an out-of-order write still yields a sensible mode.
pub fn current_mode(last_in: Option<DateTime<Utc>>, last_out: Option<DateTime<Utc>>) -> PunchMode {
    match (last_in, last_out) {
        (None, _) => PunchMode::Start,
        (Some(_), None) => PunchMode::Stop,
        (Some(last_in), Some(last_out)) => {
            if last_out > last_in {
                PunchMode::Start
            } else {
                PunchMode::Stop
            }
        }
    }
}

/// Record a clock-in on the log for the given date.
///
/// Rejects when the day still has an open interval. Lateness is measured
/// against the scheduled shift start for that date, when one exists.
pub fn apply_clock_in(
    log: &mut MonthlyLog,
    date: NaiveDate,
    timestamp: DateTime<Utc>,
    shift: Option<&ShiftWindow>,
) -> Result<LogInterval, PunchError> {
    if !log.day_fully_closed(date) {
        return Err(PunchError::AlreadyTracking);
    }

    let mut interval = LogInterval::open(timestamp);
    if let Some(shift) = shift {
        let shift_start = date.and_time(shift.start).and_utc();
        if timestamp > shift_start {
            interval.late_punched = true;
            interval.late_minutes = timestamp.signed_duration_since(shift_start).num_minutes();
        }
    }

    log.append_interval(date, interval.clone());
    Ok(interval)
}

/// Record a clock-out on the log for the given date.
///
/// Closes the earliest still-open interval of the day.
pub fn apply_clock_out(
    log: &mut MonthlyLog,
    date: NaiveDate,
    timestamp: DateTime<Utc>,
) -> Result<LogInterval, PunchError> {
    let interval = log
        .first_open_interval_mut(date)
        .ok_or(PunchError::NoOpenPunch)?;
    interval.clock_out = Some(timestamp);
    let closed = interval.clone();
    log.last_out = Some(timestamp);
    Ok(closed)
}
