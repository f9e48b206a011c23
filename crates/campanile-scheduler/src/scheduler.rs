//! Alarm scheduler implementation.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::codec::{DOCUMENT_PATH, DOCUMENT_VERSION};
use crate::{
    Action, ActionResult, Alarm, AlarmStore, Clock, DayMask, DocumentStore, SchedulerError,
    SystemClock, TimeReading, WebId, engine,
};

/// Resolves a customizable alarm's type tag to the action it should run.
///
/// Used when alarms are loaded from the document, since callbacks
/// cannot be persisted.
pub type ActionBinder = Box<dyn Fn(&str) -> Option<Action>>;

/// Alarm counts and clock status for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsDocument {
    pub module: String,
    pub version: String,
    pub timestamp: i64,
    pub total_alarms: usize,
    pub system: usize,
    pub customizable: usize,
    pub enabled: usize,
    pub disabled: usize,
    pub free_space: usize,
    pub max_alarms: usize,
    pub next_web_id: u32,
    pub json_file: String,
    pub file_exists: bool,
    pub current_time: CurrentTime,
}

/// Clock snapshot embedded in [`StatisticsDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentTime {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minute: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekday: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yearday: Option<u16>,
}

impl From<Option<TimeReading>> for CurrentTime {
    fn from(reading: Option<TimeReading>) -> Self {
        Self {
            valid: reading.is_some(),
            hour: reading.map(|r| r.hour),
            minute: reading.map(|r| r.minute),
            weekday: reading.map(|r| r.weekday),
            yearday: reading.map(|r| r.day_of_year),
        }
    }
}

/// The alarm scheduler.
///
/// Single-threaded: `check` and every registry call run inline on the
/// caller's thread, and document writes block until complete.
pub struct Scheduler {
    pub(crate) alarms: AlarmStore,
    pub(crate) documents: Box<dyn DocumentStore>,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) binder: Option<ActionBinder>,
    pub(crate) document_path: String,
    /// Advanced past every id seen on load. Allocation itself scans the
    /// live set.
    pub(crate) next_web_id: WebId,
}

impl Scheduler {
    /// Create a scheduler persisting to `documents`, reading the system clock.
    pub fn new(documents: impl DocumentStore + 'static) -> Self {
        Self {
            alarms: AlarmStore::new(),
            documents: Box::new(documents),
            clock: Box::new(SystemClock::new()),
            binder: None,
            document_path: DOCUMENT_PATH.to_string(),
            next_web_id: WebId::FIRST,
        }
    }

    /// Replace the time source used by [`tick`](Self::tick).
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Set the resolver used to re-attach actions to loaded alarms.
    pub fn with_binder(mut self, binder: impl Fn(&str) -> Option<Action> + 'static) -> Self {
        self.binder = Some(Box::new(binder));
        self
    }

    /// Override the logical path of the customizable alarm document.
    pub fn with_document_path(mut self, path: impl Into<String>) -> Self {
        self.document_path = path.into();
        self
    }

    pub fn document_path(&self) -> &str {
        &self.document_path
    }

    /// Start from an empty store and load the persisted customizable alarms.
    pub fn begin(&mut self) -> crate::LoadReport {
        self.clear();
        let report = self.load_customizables();
        info!(count = self.alarms.len(), "scheduler initialized");
        report
    }

    /// Add a system alarm and return its index.
    #[allow(clippy::too_many_arguments)]
    pub fn add_system(
        &mut self,
        day_mask: DayMask,
        hour: u8,
        minute: u8,
        interval_minutes: u16,
        action: Action,
        parameter: u16,
        enabled: bool,
    ) -> Result<usize, SchedulerError> {
        let kind = action.kind();
        let alarm = Alarm::system(day_mask, hour, minute, interval_minutes, action, parameter, enabled);
        let index = self.alarms.push(alarm)?;
        debug!(
            index,
            kind,
            days = format_args!("{:#04x}", day_mask.bits()),
            hour,
            minute,
            interval_minutes,
            parameter,
            "added system alarm"
        );
        Ok(index)
    }

    /// Add a system alarm calling `f(parameter)`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_system_with_parameter(
        &mut self,
        day_mask: DayMask,
        hour: u8,
        minute: u8,
        interval_minutes: u16,
        f: fn(u16) -> ActionResult,
        parameter: u16,
        enabled: bool,
    ) -> Result<usize, SchedulerError> {
        self.add_system(
            day_mask,
            hour,
            minute,
            interval_minutes,
            Action::WithParameter(f),
            parameter,
            enabled,
        )
    }

    /// Add a system alarm calling `f()`. Its parameter is always 0.
    pub fn add_system_no_parameter(
        &mut self,
        day_mask: DayMask,
        hour: u8,
        minute: u8,
        interval_minutes: u16,
        f: fn() -> ActionResult,
        enabled: bool,
    ) -> Result<usize, SchedulerError> {
        self.add_system(
            day_mask,
            hour,
            minute,
            interval_minutes,
            Action::NoParameter(f),
            0,
            enabled,
        )
    }

    /// Enable the alarm at `index`. Dedup state is left as is.
    pub fn enable(&mut self, index: usize) -> bool {
        self.set_enabled(index, true)
    }

    /// Disable the alarm at `index`.
    pub fn disable(&mut self, index: usize) -> bool {
        self.set_enabled(index, false)
    }

    fn set_enabled(&mut self, index: usize, enabled: bool) -> bool {
        match self.alarms.get_mut(index) {
            Some(alarm) => {
                alarm.enabled = enabled;
                debug!(index, enabled, "alarm toggled");
                true
            }
            None => false,
        }
    }

    /// Remove every alarm, system ones included.
    pub fn clear(&mut self) {
        self.alarms.clear();
        self.next_web_id = WebId::FIRST;
        debug!("all alarms cleared");
    }

    pub fn count(&self) -> usize {
        self.alarms.len()
    }

    pub fn get(&self, index: usize) -> Option<&Alarm> {
        self.alarms.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Alarm> {
        self.alarms.get_mut(index)
    }

    pub fn alarms(&self) -> &AlarmStore {
        &self.alarms
    }

    /// Forget when every alarm last fired.
    pub fn reset_cache(&mut self) {
        for alarm in self.alarms.iter_mut() {
            alarm.dedup.reset();
        }
        debug!(count = self.alarms.len(), "alarm caches reset");
    }

    /// Fire every alarm due at `reading`. Returns how many fired.
    ///
    /// An action error is returned immediately; alarms after the failing
    /// one are not evaluated on this call.
    pub fn check(&mut self, reading: &TimeReading) -> Result<usize, SchedulerError> {
        engine::check(&mut self.alarms, reading)
    }

    /// Read the clock and [`check`](Self::check). Does nothing while the
    /// clock is unavailable.
    pub fn tick(&mut self) -> Result<usize, SchedulerError> {
        match self.clock.now() {
            Some(reading) => self.check(&reading),
            None => Ok(0),
        }
    }

    /// Seconds since the epoch according to the clock, or 0 when unset.
    pub(crate) fn timestamp(&self) -> i64 {
        self.clock.now().map(|r| r.epoch).unwrap_or_default()
    }

    /// Alarm counts, capacity and clock status.
    pub fn statistics_document(&self) -> StatisticsDocument {
        let total = self.alarms.len();
        let customizable = self.alarms.iter().filter(|a| a.is_customizable).count();
        let enabled = self.alarms.iter().filter(|a| a.enabled).count();
        let reading = self.clock.now();

        StatisticsDocument {
            module: "AlarmScheduler".to_string(),
            version: DOCUMENT_VERSION.to_string(),
            timestamp: reading.map(|r| r.epoch).unwrap_or_default(),
            total_alarms: total,
            system: total - customizable,
            customizable,
            enabled,
            disabled: total - enabled,
            free_space: self.alarms.capacity().saturating_sub(total),
            max_alarms: self.alarms.capacity(),
            next_web_id: self.next_web_id.get(),
            json_file: self.document_path.clone(),
            file_exists: self.documents.exists(&self.document_path),
            current_time: reading.into(),
        }
    }

    /// Human-readable dump of every alarm.
    pub fn alarm_listing(&self) -> String {
        self.listing().to_string()
    }

    /// [`Display`](fmt::Display) view of [`alarm_listing`](Self::alarm_listing).
    pub fn listing(&self) -> AlarmListing<'_> {
        AlarmListing(self)
    }
}

/// Formats every alarm slot of a [`Scheduler`].
pub struct AlarmListing<'a>(&'a Scheduler);

impl fmt::Display for AlarmListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheduler = self.0;
        let alarms = &scheduler.alarms;
        writeln!(f, "Total registered alarms: {}/{}", alarms.len(), alarms.capacity())?;
        writeln!(f, "Next web id: {}", scheduler.next_web_id)?;

        if alarms.is_empty() {
            return writeln!(f, "No alarms registered");
        }

        for (index, alarm) in alarms.iter().enumerate() {
            let web_id = alarm.web_id.map_or_else(|| "-".to_string(), |id| id.to_string());
            writeln!(f)?;
            writeln!(f, "[{index}] web id {web_id}")?;
            writeln!(f, "  name: '{}'", alarm.name)?;
            writeln!(f, "  description: '{}'", alarm.description)?;
            writeln!(f, "  type: '{}'", alarm.type_tag)?;
            writeln!(f, "  customizable: {}", yes_no(alarm.is_customizable))?;
            writeln!(f, "  hour: {}", field_text(alarm.hour))?;
            writeln!(f, "  minute: {}", field_text(alarm.minute))?;
            writeln!(f, "  interval (min): {}", alarm.interval_minutes)?;
            writeln!(f, "  day mask: {:#04x}", alarm.day_mask.bits())?;
            writeln!(f, "  enabled: {}", yes_no(alarm.enabled))?;
            writeln!(f, "  parameter: {}", alarm.parameter)?;
            writeln!(f, "  has action: {}", yes_no(alarm.action.is_some()))?;
        }
        Ok(())
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn field_text(value: u8) -> String {
    if value == crate::WILDCARD {
        "*".to_string()
    } else {
        value.to_string()
    }
}
