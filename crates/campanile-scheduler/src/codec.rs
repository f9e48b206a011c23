//! JSON document format for customizable alarms.
//!
//! The persisted document only carries customizable alarms:
//!
//! ```json
//! { "version": "1.0", "timestamp": 0, "total": 1,
//!   "alarms": [ { "id": 1, "name": "Morning Bell", "description": "",
//!                 "day": 0, "hour": 8, "minute": 0, "action": "BELL",
//!                 "parameter": 10, "enabled": true } ] }
//! ```
//!
//! `day` is 0 for every day or 1..=7 for a single weekday (1 = Sunday).
//! Masks with several (but not all) days keep only their first weekday.

use serde::{Deserialize, Serialize};

use crate::{Alarm, AlarmStore, CustomizableAlarm, DayMask, SchedulerError, WebId};

/// Schema version written into every document.
pub const DOCUMENT_VERSION: &str = "1.0";

/// Logical path of the customizable alarm document.
pub const DOCUMENT_PATH: &str = "/customizable_alarms.json";

/// The customizable alarm set, as persisted or exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomizablesDocument {
    pub version: String,
    pub timestamp: i64,
    pub total: usize,
    pub alarms: Vec<DocumentEntry>,
}

impl CustomizablesDocument {
    pub fn to_json(&self) -> Result<String, SchedulerError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, SchedulerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One customizable alarm in a [`CustomizablesDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEntry {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub day: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_name: Option<String>,
    pub hour: u8,
    pub minute: u8,
    /// The alarm's type tag.
    pub action: String,
    pub parameter: u16,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_index: Option<usize>,
}

/// A validated document entry ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DecodedEntry {
    pub web_id: WebId,
    pub spec: CustomizableAlarm,
}

/// Entry as found on disk: every field optional, integers unbounded so
/// out-of-range values are caught by validation rather than by serde.
/// Absent and `null` fields both take their default.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEntry {
    id: Option<i64>,
    name: Option<String>,
    description: Option<String>,
    day: Option<i64>,
    hour: Option<i64>,
    minute: Option<i64>,
    action: Option<String>,
    parameter: Option<i64>,
    enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    alarms: Option<Vec<serde_json::Value>>,
}

/// Encode a day mask as the document's `day` field.
pub fn encode_day(mask: DayMask) -> u8 {
    if mask.is_all() {
        return 0;
    }
    mask.first_weekday().map(|d| d + 1).unwrap_or(0)
}

/// Decode a document `day` field. `None` for values above 7.
pub fn decode_day(day: u8) -> Option<DayMask> {
    match day {
        0 => Some(DayMask::ALL),
        1..=7 => Some(DayMask::from_weekday(day - 1)),
        _ => None,
    }
}

/// Display name for a document `day` value.
pub fn day_name(day: u8) -> &'static str {
    match day {
        0 => "Every day",
        1 => "Sunday",
        2 => "Monday",
        3 => "Tuesday",
        4 => "Wednesday",
        5 => "Thursday",
        6 => "Friday",
        7 => "Saturday",
        _ => "Invalid day",
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SchedulerError {
    SchedulerError::InvalidField {
        field,
        reason: reason.into(),
    }
}

/// Field rules shared by [`Scheduler::add_customizable`](crate::Scheduler::add_customizable)
/// and the loader, so everything that can be saved can be loaded back.
pub(crate) fn validate(spec: &CustomizableAlarm) -> Result<(), SchedulerError> {
    if spec.name.is_empty() {
        return Err(invalid("name", "must not be empty"));
    }
    if spec.hour > 23 {
        return Err(invalid("hour", format!("{} is not in 0..=23", spec.hour)));
    }
    if spec.minute > 59 {
        return Err(invalid("minute", format!("{} is not in 0..=59", spec.minute)));
    }
    Ok(())
}

fn entry_for(alarm: &Alarm, index: usize, detailed: bool) -> Option<DocumentEntry> {
    if !alarm.is_customizable {
        return None;
    }
    let web_id = alarm.web_id?;
    let day = encode_day(alarm.day_mask);
    Some(DocumentEntry {
        id: i64::from(web_id.get()),
        name: alarm.name.clone(),
        description: alarm.description.clone(),
        day,
        day_name: detailed.then(|| day_name(day).to_string()),
        hour: alarm.hour,
        minute: alarm.minute,
        action: alarm.type_tag.clone(),
        parameter: alarm.parameter,
        enabled: alarm.enabled,
        time_text: detailed.then(|| format!("{:02}:{:02}", alarm.hour, alarm.minute)),
        array_index: detailed.then_some(index),
    })
}

/// Build the document for the customizable subset of `store`.
///
/// `detailed` adds the display-only fields (`dayName`, `timeText`,
/// `arrayIndex`) that the persisted form leaves out.
pub fn encode(store: &AlarmStore, timestamp: i64, detailed: bool) -> CustomizablesDocument {
    let alarms: Vec<DocumentEntry> = store
        .iter()
        .enumerate()
        .filter_map(|(index, alarm)| entry_for(alarm, index, detailed))
        .collect();

    CustomizablesDocument {
        version: DOCUMENT_VERSION.to_string(),
        timestamp,
        total: alarms.len(),
        alarms,
    }
}

fn decode_entry(value: serde_json::Value) -> Result<DecodedEntry, SchedulerError> {
    let raw: RawEntry =
        serde_json::from_value(value).map_err(|e| invalid("entry", e.to_string()))?;

    let id = raw.id.unwrap_or(-1);
    let web_id = WebId::new(id).ok_or_else(|| invalid("id", format!("{id} is not positive")))?;
    let raw_hour = raw.hour.unwrap_or(0);
    let hour = u8::try_from(raw_hour).map_err(|_| invalid("hour", format!("{raw_hour} is not in 0..=23")))?;
    let raw_minute = raw.minute.unwrap_or(0);
    let minute =
        u8::try_from(raw_minute).map_err(|_| invalid("minute", format!("{raw_minute} is not in 0..=59")))?;
    let raw_day = raw.day.unwrap_or(0);
    let day_mask = u8::try_from(raw_day)
        .ok()
        .and_then(decode_day)
        .ok_or_else(|| invalid("day", format!("{raw_day} is not in 0..=7")))?;
    let raw_parameter = raw.parameter.unwrap_or(0);
    let parameter = u16::try_from(raw_parameter)
        .map_err(|_| invalid("parameter", format!("{raw_parameter} does not fit in u16")))?;

    let spec = CustomizableAlarm {
        name: raw.name.unwrap_or_default(),
        description: raw.description.unwrap_or_default(),
        day_mask,
        hour,
        minute,
        type_tag: raw.action.unwrap_or_else(|| crate::SYSTEM_TYPE_TAG.to_string()),
        parameter,
        enabled: raw.enabled.unwrap_or(true),
    };
    validate(&spec)?;

    Ok(DecodedEntry { web_id, spec })
}

/// Parse a persisted document.
///
/// Fails only when the document as a whole is unusable. Individual entries
/// that don't validate come back as errors in the list.
pub(crate) fn decode(bytes: &[u8]) -> Result<Vec<Result<DecodedEntry, SchedulerError>>, SchedulerError> {
    let doc: RawDocument =
        serde_json::from_slice(bytes).map_err(|e| SchedulerError::DocumentCorrupt(e.to_string()))?;
    Ok(doc.alarms.unwrap_or_default().into_iter().map(decode_entry).collect())
}
