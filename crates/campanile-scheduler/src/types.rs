//! Scheduler types.

use std::fmt;

use chrono::{DateTime, Datelike, TimeZone, Timelike};

use crate::error::ActionError;

/// Maximum number of alarms (system + customizable) held at once.
pub const MAX_ALARMS: usize = 16;

/// Hour/minute value that matches any clock value.
pub const WILDCARD: u8 = 255;

/// Type tag given to alarms created through the system API.
pub const SYSTEM_TYPE_TAG: &str = "SYSTEM";

const NAME_MAX_CHARS: usize = 49;
const DESCRIPTION_MAX_CHARS: usize = 99;
const TYPE_TAG_MAX_CHARS: usize = 19;

/// Set of weekdays an alarm is eligible on (bit 0 = Sunday .. bit 6 = Saturday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayMask(u8);

impl DayMask {
    pub const SUNDAY: Self = Self(1 << 0);
    pub const MONDAY: Self = Self(1 << 1);
    pub const TUESDAY: Self = Self(1 << 2);
    pub const WEDNESDAY: Self = Self(1 << 3);
    pub const THURSDAY: Self = Self(1 << 4);
    pub const FRIDAY: Self = Self(1 << 5);
    pub const SATURDAY: Self = Self(1 << 6);
    pub const ALL: Self = Self(0x7F);

    /// Build a mask from raw bits. Bit 7 is discarded and an empty mask
    /// becomes [`DayMask::ALL`].
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x7F {
            0 => Self::ALL,
            bits => Self(bits),
        }
    }

    /// Mask with the single bit for `weekday` (0 = Sunday). Out-of-range
    /// weekdays yield an empty mask that matches nothing.
    pub fn from_weekday(weekday: u8) -> Self {
        if weekday <= 6 { Self(1 << weekday) } else { Self(0) }
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_all(self) -> bool {
        self.0 == Self::ALL.0
    }

    /// Whether the mask includes `weekday` (0 = Sunday).
    pub fn contains(self, weekday: u8) -> bool {
        self.0 & Self::from_weekday(weekday).0 != 0
    }

    /// Lowest weekday present in the mask.
    pub fn first_weekday(self) -> Option<u8> {
        (0..7u8).find(|d| self.contains(*d))
    }
}

impl Default for DayMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl std::ops::BitOr for DayMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Stable external identifier of a customizable alarm. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WebId(u32);

impl WebId {
    /// Returns `None` unless `raw` is a positive value that fits in `u32`.
    pub fn new(raw: i64) -> Option<Self> {
        u32::try_from(raw).ok().filter(|v| *v > 0).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The id following this one.
    pub(crate) fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub(crate) const FIRST: Self = Self(1);
}

impl fmt::Display for WebId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Broken-down local time consumed by the matching engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeReading {
    /// Hour of day (0-23).
    pub hour: u8,
    /// Minute of hour (0-59).
    pub minute: u8,
    /// Day of week (0 = Sunday .. 6 = Saturday).
    pub weekday: u8,
    /// Zero-based day of the year.
    pub day_of_year: u16,
    /// Seconds since the Unix epoch.
    pub epoch: i64,
}

impl TimeReading {
    /// Break a timestamp down in its own time zone.
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self {
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            weekday: dt.weekday().num_days_from_sunday() as u8,
            day_of_year: dt.ordinal0() as u16,
            epoch: dt.timestamp(),
        }
    }
}

/// Per-alarm markers that keep an alarm from firing twice in one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupState {
    pub last_day_of_year: Option<u16>,
    pub last_hour: Option<u8>,
    pub last_minute: Option<u8>,
    /// Epoch of the last trigger; `None` until the alarm first fires.
    pub last_execution: Option<i64>,
}

impl DedupState {
    pub fn record(&mut self, reading: &TimeReading) {
        self.last_day_of_year = Some(reading.day_of_year);
        self.last_hour = Some(reading.hour);
        self.last_minute = Some(reading.minute);
        self.last_execution = Some(reading.epoch);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Result returned by alarm callbacks.
pub type ActionResult = Result<(), ActionError>;

/// What an alarm does when it fires.
pub enum Action {
    /// A closure, typically capturing the state it acts on.
    Bound(Box<dyn FnMut(u16) -> ActionResult>),
    /// A free function receiving the alarm's parameter.
    WithParameter(fn(u16) -> ActionResult),
    /// A free function taking no arguments.
    NoParameter(fn() -> ActionResult),
}

impl Action {
    pub fn bound(f: impl FnMut(u16) -> ActionResult + 'static) -> Self {
        Self::Bound(Box::new(f))
    }

    pub fn invoke(&mut self, parameter: u16) -> ActionResult {
        match self {
            Self::Bound(f) => f(parameter),
            Self::WithParameter(f) => f(parameter),
            Self::NoParameter(f) => f(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bound(_) => "bound",
            Self::WithParameter(_) => "function",
            Self::NoParameter(_) => "function (no parameter)",
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Action").field(&self.kind()).finish()
    }
}

/// A scheduled alarm.
#[derive(Debug)]
pub struct Alarm {
    pub enabled: bool,
    pub day_mask: DayMask,
    /// Hour (0-23) or [`WILDCARD`].
    pub hour: u8,
    /// Minute (0-59) or [`WILDCARD`].
    pub minute: u8,
    /// Repeat interval in minutes; 0 for fixed/wildcard alarms.
    pub interval_minutes: u16,
    pub dedup: DedupState,
    /// `None` only for customizable alarms loaded without a matching binder.
    pub action: Option<Action>,
    pub parameter: u16,
    pub name: String,
    pub description: String,
    pub type_tag: String,
    /// Editable through the registry and persisted.
    pub is_customizable: bool,
    /// External identifier; assigned to every alarm created as customizable.
    pub web_id: Option<WebId>,
}

impl Alarm {
    /// Create a system alarm.
    pub fn system(
        day_mask: DayMask,
        hour: u8,
        minute: u8,
        interval_minutes: u16,
        action: Action,
        parameter: u16,
        enabled: bool,
    ) -> Self {
        Self {
            enabled,
            day_mask: DayMask::from_bits(day_mask.bits()),
            hour,
            minute,
            interval_minutes,
            dedup: DedupState::default(),
            action: Some(action),
            parameter,
            name: String::new(),
            description: String::new(),
            type_tag: SYSTEM_TYPE_TAG.to_string(),
            is_customizable: false,
            web_id: None,
        }
    }

    /// Create a customizable alarm from its editable fields.
    pub(crate) fn customizable(spec: &CustomizableAlarm, action: Option<Action>, web_id: WebId) -> Self {
        let mut alarm = Self {
            enabled: spec.enabled,
            day_mask: DayMask::ALL,
            hour: 0,
            minute: 0,
            interval_minutes: 0,
            dedup: DedupState::default(),
            action: None,
            parameter: 0,
            name: String::new(),
            description: String::new(),
            type_tag: String::new(),
            is_customizable: true,
            web_id: Some(web_id),
        };
        alarm.apply(spec, action);
        alarm
    }

    /// Overwrite the editable fields and reset dedup state.
    pub(crate) fn apply(&mut self, spec: &CustomizableAlarm, action: Option<Action>) {
        self.enabled = spec.enabled;
        self.day_mask = DayMask::from_bits(spec.day_mask.bits());
        self.hour = spec.hour;
        self.minute = spec.minute;
        self.parameter = spec.parameter;
        self.action = action;
        self.name = truncate(&spec.name, NAME_MAX_CHARS);
        self.description = truncate(&spec.description, DESCRIPTION_MAX_CHARS);
        self.type_tag = truncate(&spec.type_tag, TYPE_TAG_MAX_CHARS);
        self.dedup.reset();
    }

    /// The editable fields as currently stored.
    pub fn spec(&self) -> CustomizableAlarm {
        CustomizableAlarm {
            name: self.name.clone(),
            description: self.description.clone(),
            day_mask: self.day_mask,
            hour: self.hour,
            minute: self.minute,
            type_tag: self.type_tag.clone(),
            parameter: self.parameter,
            enabled: self.enabled,
        }
    }

    pub fn is_interval(&self) -> bool {
        self.interval_minutes > 0
    }

    pub fn has_wildcard_hour(&self) -> bool {
        self.hour == WILDCARD
    }
}

/// Editable fields of a customizable alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomizableAlarm {
    pub name: String,
    pub description: String,
    pub day_mask: DayMask,
    pub hour: u8,
    pub minute: u8,
    /// Free-form classification used by callers to pick an action.
    pub type_tag: String,
    pub parameter: u16,
    pub enabled: bool,
}

impl CustomizableAlarm {
    /// An enabled, every-day alarm with an empty description.
    pub fn new(name: impl Into<String>, hour: u8, minute: u8, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            day_mask: DayMask::ALL,
            hour,
            minute,
            type_tag: type_tag.into(),
            parameter: 0,
            enabled: true,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn days(mut self, day_mask: DayMask) -> Self {
        self.day_mask = day_mask;
        self
    }

    pub fn parameter(mut self, parameter: u16) -> Self {
        self.parameter = parameter;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_day_mask_zero_means_every_day() {
        assert_eq!(DayMask::from_bits(0), DayMask::ALL);
        assert!(DayMask::from_bits(0).is_all());
        assert_eq!(DayMask::from_bits(0x80), DayMask::ALL);
    }

    #[test]
    fn test_day_mask_contains() {
        let mask = DayMask::MONDAY | DayMask::FRIDAY;
        assert!(mask.contains(1));
        assert!(mask.contains(5));
        assert!(!mask.contains(0));
        assert!(!mask.contains(7));
        assert_eq!(mask.first_weekday(), Some(1));
    }

    #[test]
    fn test_web_id_must_be_positive() {
        assert!(WebId::new(0).is_none());
        assert!(WebId::new(-1).is_none());
        assert!(WebId::new(i64::from(u32::MAX) + 1).is_none());
        assert_eq!(WebId::new(7).map(WebId::get), Some(7));
    }

    #[test]
    fn test_time_reading_from_datetime() {
        // 2024-03-04 is a Monday.
        let dt = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(8, 30, 15)
            .unwrap()
            .and_utc();
        let reading = TimeReading::from_datetime(&dt);

        assert_eq!(reading.hour, 8);
        assert_eq!(reading.minute, 30);
        assert_eq!(reading.weekday, 1);
        // Jan (31) + Feb (29, leap year) + 3 days.
        assert_eq!(reading.day_of_year, 63);
        assert_eq!(reading.epoch, dt.timestamp());
    }

    #[test]
    fn test_dedup_record_and_reset() {
        let reading = TimeReading::from_datetime(&Utc::now());
        let mut dedup = DedupState::default();

        dedup.record(&reading);
        assert_eq!(dedup.last_execution, Some(reading.epoch));
        assert_eq!(dedup.last_minute, Some(reading.minute));

        dedup.reset();
        assert_eq!(dedup, DedupState::default());
    }

    #[test]
    fn test_customizable_fields_truncated() {
        let spec = CustomizableAlarm::new("n".repeat(80), 8, 0, "t".repeat(40))
            .description("d".repeat(200));
        let alarm = Alarm::customizable(&spec, None, WebId::FIRST);

        assert_eq!(alarm.name.chars().count(), 49);
        assert_eq!(alarm.description.chars().count(), 99);
        assert_eq!(alarm.type_tag.chars().count(), 19);
        assert!(alarm.is_customizable);
    }

    #[test]
    fn test_system_alarm_defaults() {
        let alarm = Alarm::system(
            DayMask::from_bits(0),
            WILDCARD,
            0,
            15,
            Action::NoParameter(|| Ok(())),
            0,
            true,
        );

        assert_eq!(alarm.type_tag, SYSTEM_TYPE_TAG);
        assert!(alarm.day_mask.is_all());
        assert!(alarm.is_interval());
        assert!(alarm.has_wildcard_hour());
        assert!(!alarm.is_customizable);
    }
}
