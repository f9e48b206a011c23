//! Admin commands for inspecting and editing customizable alarms.

use std::path::Path;

use clap::Args;
use miette::Result;
use tracing::info;

use campanile_scheduler::{CustomizableAlarm, WebId, codec};

use crate::daemon::{bind_action, open_scheduler};

/// Editable fields shared by `add` and `modify`.
#[derive(Debug, Args)]
pub struct AlarmArgs {
    /// Alarm name
    #[arg(long)]
    pub name: String,

    /// Hour of day (0-23)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=23))]
    pub hour: u8,

    /// Minute of hour (0-59)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=59))]
    pub minute: u8,

    /// Day: 0 for every day, 1-7 for Sunday-Saturday
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=7))]
    pub day: u8,

    /// Alarm type (BELL, CHIME or LOG)
    #[arg(long = "type", default_value = "BELL")]
    pub type_tag: String,

    /// Value passed to the alarm's action
    #[arg(long, default_value = "0")]
    pub parameter: u16,

    /// Free-form description
    #[arg(long, default_value = "")]
    pub description: String,

    /// Create the alarm disabled
    #[arg(long)]
    pub disabled: bool,
}

impl AlarmArgs {
    fn to_spec(&self) -> Result<CustomizableAlarm> {
        let days = codec::decode_day(self.day)
            .ok_or_else(|| miette::miette!("day must be between 0 and 7, got {}", self.day))?;
        Ok(CustomizableAlarm::new(&self.name, self.hour, self.minute, &self.type_tag)
            .description(&self.description)
            .days(days)
            .parameter(self.parameter)
            .enabled(!self.disabled))
    }
}

fn web_id(raw: u32) -> Result<WebId> {
    WebId::new(i64::from(raw)).ok_or_else(|| miette::miette!("alarm id must be positive"))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| miette::miette!("{}", e))?;
    println!("{json}");
    Ok(())
}

/// Print the customizable alarms, and every alarm slot when `verbose`.
pub fn list(data_dir: &Path, verbose: bool) -> Result<()> {
    let scheduler = open_scheduler(data_dir);
    print_json(&scheduler.customizables_document())?;
    if verbose {
        println!();
        print!("{}", scheduler.alarm_listing());
    }
    Ok(())
}

/// Print alarm counts and clock status.
pub fn stats(data_dir: &Path) -> Result<()> {
    let scheduler = open_scheduler(data_dir);
    print_json(&scheduler.statistics_document())
}

pub fn add(data_dir: &Path, args: &AlarmArgs) -> Result<()> {
    let spec = args.to_spec()?;
    let mut scheduler = open_scheduler(data_dir);
    let id = scheduler
        .add_customizable(&spec, bind_action(&spec.type_tag))
        .map_err(|e| miette::miette!("{}", e))?;

    info!(%id, name = %spec.name, "alarm added");
    println!("Added alarm {id}");
    Ok(())
}

pub fn modify(data_dir: &Path, id: u32, args: &AlarmArgs) -> Result<()> {
    let id = web_id(id)?;
    let spec = args.to_spec()?;
    let mut scheduler = open_scheduler(data_dir);
    scheduler
        .modify_customizable(id, &spec, Some(bind_action(&spec.type_tag)))
        .map_err(|e| miette::miette!("{}", e))?;

    println!("Modified alarm {id}");
    Ok(())
}

pub fn delete(data_dir: &Path, id: u32) -> Result<()> {
    let id = web_id(id)?;
    let mut scheduler = open_scheduler(data_dir);
    scheduler
        .delete_customizable(id)
        .map_err(|e| miette::miette!("{}", e))?;

    println!("Deleted alarm {id}");
    Ok(())
}

pub fn set_enabled(data_dir: &Path, id: u32, enabled: bool) -> Result<()> {
    let id = web_id(id)?;
    let mut scheduler = open_scheduler(data_dir);
    scheduler
        .enable_customizable(id, enabled)
        .map_err(|e| miette::miette!("{}", e))?;

    let verb = if enabled { "Enabled" } else { "Disabled" };
    println!("{verb} alarm {id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(name: &str, hour: u8, day: u8) -> AlarmArgs {
        AlarmArgs {
            name: name.to_string(),
            hour,
            minute: 30,
            day,
            type_tag: "CHIME".to_string(),
            parameter: 7,
            description: String::new(),
            disabled: false,
        }
    }

    #[test]
    fn test_add_modify_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();

        add(dir.path(), &args("Lunch", 12, 2)).unwrap();
        let scheduler = open_scheduler(dir.path());
        let id = WebId::new(1).unwrap();
        let alarm = scheduler.customizable(id).unwrap();
        assert_eq!(alarm.name, "Lunch");
        assert_eq!(alarm.type_tag, "CHIME");
        assert_eq!(codec::encode_day(alarm.day_mask), 2);

        modify(dir.path(), 1, &args("Late lunch", 13, 0)).unwrap();
        let scheduler = open_scheduler(dir.path());
        let alarm = scheduler.customizable(id).unwrap();
        assert_eq!(alarm.name, "Late lunch");
        assert_eq!(alarm.hour, 13);
        assert!(alarm.day_mask.is_all());

        set_enabled(dir.path(), 1, false).unwrap();
        assert!(!open_scheduler(dir.path()).customizable(id).unwrap().enabled);

        delete(dir.path(), 1).unwrap();
        assert_eq!(open_scheduler(dir.path()).count(), 0);
    }

    #[test]
    fn test_unknown_or_invalid_ids_fail() {
        let dir = tempfile::tempdir().unwrap();
        assert!(delete(dir.path(), 0).is_err());
        assert!(delete(dir.path(), 5).is_err());
        assert!(modify(dir.path(), 5, &args("x", 1, 0)).is_err());
    }
}
