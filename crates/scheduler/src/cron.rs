//! Cron normalization and the due-check evaluator.
//!
//! The evaluator is a pure function of (schedule, instant, lookback): no
//! clock reads, no I/O, safe to call concurrently and redundantly.

use std::str::FromStr;

use chrono::{DateTime, Duration, Timelike, Utc};
use cron::Schedule;

/// Malformed schedule expression. Recoverable: callers treat it as
/// "not due" and log, rather than aborting sibling evaluations.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expr}': {reason}")]
    Invalid { expr: String, reason: String },
}

/// Normalize a 5-field cron expression to 6-field by prepending "0" seconds.
///
/// The `cron` crate requires 6 fields: `sec min hour day-of-month month
/// day-of-week`. Subscriptions use standard 5-field cron.
pub(crate) fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Parse a subscription schedule into a [`Schedule`].
///
/// Accepts 5-field expressions (normalized) and 6-field expressions
/// (passed through). Anything else is [`ScheduleError::Invalid`].
pub fn parse_schedule(expr: &str) -> Result<Schedule, ScheduleError> {
    let field_count = expr.trim().split_whitespace().count();
    if field_count != 5 && field_count != 6 {
        return Err(ScheduleError::Invalid {
            expr: expr.to_string(),
            reason: format!("expected 5 cron fields, got {}", field_count),
        });
    }
    Schedule::from_str(&normalize_cron(expr)).map_err(|e| ScheduleError::Invalid {
        expr: expr.to_string(),
        reason: e.to_string(),
    })
}

/// Check whether a schedule is due at `now`.
///
/// Due means: the schedule matches `now` at minute resolution, or its most
/// recent occurrence falls within the trailing `lookback` window. The window
/// is what lets an hourly poll catch a schedule whose matching minute fell
/// between two ticks.
pub fn is_due(schedule: &Schedule, now: DateTime<Utc>, lookback: Duration) -> bool {
    if schedule.includes(minute_floor(now)) {
        return true;
    }

    // Most recent occurrence: first tick strictly after `now - lookback`.
    let window_start = now - lookback;
    match schedule.after(&window_start).next() {
        Some(tick) => tick <= now,
        None => false,
    }
}

/// Truncate an instant to minute resolution (seconds and finer zeroed),
/// matching the seconds field that normalization prepends.
fn minute_floor(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}
