//! Alarm matching and dispatch.
//!
//! Decides, for a single time reading, which alarms are due and runs their
//! actions. Deduplication keeps an alarm from firing twice inside the window
//! it matched:
//! - fixed-hour alarms are keyed on `(day of year, minute)`
//! - wildcard-hour alarms are keyed on `(day of year, hour, minute)`
//! - interval alarms fire on their anchor, then on elapsed epoch seconds
//!
//! Missed windows are never backfilled.

use tracing::{debug, warn};

use crate::{Alarm, AlarmStore, SchedulerError, TimeReading, WILDCARD};

fn field_matches(field: u8, current: u8) -> bool {
    field == WILDCARD || field == current
}

/// Whether `alarm` should fire for `reading`.
pub fn is_due(alarm: &Alarm, reading: &TimeReading) -> bool {
    if !alarm.enabled || !alarm.day_mask.contains(reading.weekday) {
        return false;
    }

    let anchor_matches =
        field_matches(alarm.hour, reading.hour) && field_matches(alarm.minute, reading.minute);

    if alarm.is_interval() {
        return match alarm.dedup.last_execution {
            None => anchor_matches,
            Some(last) => {
                let interval_secs = i64::from(alarm.interval_minutes) * 60;
                reading.epoch.saturating_sub(last) >= interval_secs
            }
        };
    }

    if !anchor_matches {
        return false;
    }

    let dedup = &alarm.dedup;
    let same_slot = dedup.last_day_of_year == Some(reading.day_of_year)
        && dedup.last_minute == Some(reading.minute);
    let already_fired = if alarm.has_wildcard_hour() {
        same_slot && dedup.last_hour == Some(reading.hour)
    } else {
        // The hour is fixed, so (day, minute) cannot recur within a day.
        same_slot
    };

    !already_fired
}

/// Fire every due alarm in store order.
///
/// Returns the number of alarms that fired. The first failing action aborts
/// the pass: its alarm keeps its previous dedup state and later alarms are
/// not evaluated.
pub fn check(store: &mut AlarmStore, reading: &TimeReading) -> Result<usize, SchedulerError> {
    let mut fired = 0;

    for (index, alarm) in store.iter_mut().enumerate() {
        if !is_due(alarm, reading) {
            continue;
        }

        match alarm.action.as_mut() {
            Some(action) => {
                action
                    .invoke(alarm.parameter)
                    .map_err(|source| SchedulerError::Action { index, source })?;
                debug!(
                    index,
                    web_id = ?alarm.web_id,
                    kind = action.kind(),
                    parameter = alarm.parameter,
                    "alarm fired"
                );
            }
            None => {
                warn!(
                    index,
                    web_id = ?alarm.web_id,
                    type_tag = %alarm.type_tag,
                    "alarm due but no action is bound"
                );
            }
        }

        alarm.dedup.record(reading);
        fired += 1;
    }

    Ok(fired)
}
