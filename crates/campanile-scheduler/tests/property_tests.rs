//! Property-based tests for alarm matching and the customizable registry.

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;

use campanile_scheduler::{
    Action, CustomizableAlarm, DayMask, MAX_ALARMS, MemoryDocumentStore, Scheduler, TimeReading,
    WILDCARD, WebId, codec,
};

// Strategy for a wall-clock reading within one year
fn reading() -> impl Strategy<Value = TimeReading> {
    (0u16..365, 0u8..24, 0u8..60, 0i64..60).prop_map(|(day, hour, minute, second)| TimeReading {
        hour,
        minute,
        weekday: (day % 7) as u8,
        day_of_year: day,
        epoch: i64::from(day) * 86_400 + i64::from(hour) * 3_600 + i64::from(minute) * 60 + second,
    })
}

// Strategy for alarm names within the stored length
fn name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{0,30}".prop_map(|s| s.to_string())
}

fn day_mask() -> impl Strategy<Value = DayMask> {
    prop_oneof![Just(DayMask::ALL), (0u8..7).prop_map(DayMask::from_weekday)]
}

fn customizable() -> impl Strategy<Value = CustomizableAlarm> {
    (
        name(),
        "[a-z ]{0,40}",
        day_mask(),
        0u8..24,
        0u8..60,
        prop_oneof![Just("BELL"), Just("CHIME"), Just("LOG")],
        any::<u16>(),
        any::<bool>(),
    )
        .prop_map(
            |(name, description, days, hour, minute, tag, parameter, enabled)| {
                CustomizableAlarm::new(name, hour, minute, tag)
                    .description(description)
                    .days(days)
                    .parameter(parameter)
                    .enabled(enabled)
            },
        )
}

/// Scheduler with one system alarm counting its firings.
fn counting(day_mask: DayMask, hour: u8, minute: u8, interval: u16) -> (Scheduler, Rc<Cell<u32>>) {
    let fired = Rc::new(Cell::new(0));
    let counter = Rc::clone(&fired);
    let mut scheduler = Scheduler::new(MemoryDocumentStore::new());
    scheduler
        .add_system(
            day_mask,
            hour,
            minute,
            interval,
            Action::bound(move |_| {
                counter.set(counter.get() + 1);
                Ok(())
            }),
            0,
            true,
        )
        .unwrap();
    (scheduler, fired)
}

fn noop() -> Action {
    Action::NoParameter(|| Ok(()))
}

proptest! {
    #[test]
    fn fixed_alarm_fires_at_most_once_per_minute(
        mut readings in prop::collection::vec(reading(), 1..60),
        hour in 0u8..24,
        minute in 0u8..60,
    ) {
        readings.sort_by_key(|r| r.epoch);
        let (mut scheduler, fired) = counting(DayMask::ALL, hour, minute, 0);

        let mut slots = std::collections::HashSet::new();
        for r in &readings {
            scheduler.check(r).unwrap();
            if r.hour == hour && r.minute == minute {
                slots.insert(r.day_of_year);
            }
        }

        prop_assert_eq!(fired.get() as usize, slots.len());
    }

    #[test]
    fn wildcard_hour_fires_once_per_hour(day in 0u16..365, repeats in 1usize..5) {
        let (mut scheduler, fired) = counting(DayMask::ALL, WILDCARD, 0, 0);

        for hour in 0u8..24 {
            for second in 0..repeats {
                let r = TimeReading {
                    hour,
                    minute: 0,
                    weekday: (day % 7) as u8,
                    day_of_year: day,
                    epoch: i64::from(hour) * 3_600 + second as i64,
                };
                scheduler.check(&r).unwrap();
            }
        }

        prop_assert_eq!(fired.get(), 24);
    }

    #[test]
    fn interval_alarm_respects_minimum_gap(
        steps in prop::collection::vec(-600i64..1_200, 1..80),
    ) {
        let (mut scheduler, _) = counting(DayMask::ALL, WILDCARD, 0, 15);
        let mut epoch = 1_000_000i64;
        let mut last_fire: Option<i64> = None;

        for step in steps {
            // Clocks may jump backwards.
            epoch += step;
            let minute = ((epoch / 60) % 60) as u8;
            let r = TimeReading { hour: 1, minute, weekday: 0, day_of_year: 0, epoch };

            let fired = scheduler.check(&r).unwrap() == 1;
            if fired {
                match last_fire {
                    None => prop_assert_eq!(minute, 0),
                    Some(last) => prop_assert!(epoch - last >= 900),
                }
                last_fire = Some(epoch);
            }
        }
    }

    #[test]
    fn monday_only_alarm_never_fires_other_days(r in reading()) {
        let (mut scheduler, fired) = counting(DayMask::MONDAY, WILDCARD, WILDCARD, 0);
        scheduler.check(&r).unwrap();
        prop_assert_eq!(fired.get() == 1, r.weekday == 1);
    }

    #[test]
    fn ids_strictly_increase_and_follow_live_max(
        adds in 1usize..MAX_ALARMS,
        delete_newest in any::<bool>(),
    ) {
        let mut scheduler = Scheduler::new(MemoryDocumentStore::new());
        let mut previous = 0u32;
        for i in 0..adds {
            let id = scheduler
                .add_customizable(&CustomizableAlarm::new(format!("a{i}"), 1, 0, "BELL"), noop())
                .unwrap();
            prop_assert!(id.get() > previous);
            previous = id.get();
        }

        if delete_newest {
            scheduler.delete_customizable(WebId::new(i64::from(previous)).unwrap()).unwrap();
        }
        let live_max = scheduler.alarms().iter().filter_map(|a| a.web_id).max().map_or(0, |id| id.get());
        let next = scheduler
            .add_customizable(&CustomizableAlarm::new("next", 2, 0, "BELL"), noop())
            .unwrap();
        prop_assert_eq!(next.get(), live_max + 1);
    }

    #[test]
    fn saved_alarms_reload_unchanged(specs in prop::collection::vec(customizable(), 0..MAX_ALARMS)) {
        let documents = MemoryDocumentStore::new();
        let mut scheduler = Scheduler::new(documents.clone());
        for spec in &specs {
            scheduler.add_customizable(spec, noop()).unwrap();
        }
        let before = codec::encode(scheduler.alarms(), 0, false);

        let mut reloaded = Scheduler::new(documents);
        let report = reloaded.begin();
        prop_assert_eq!(report.loaded, specs.len());
        prop_assert_eq!(report.skipped, 0);

        let after = codec::encode(reloaded.alarms(), 0, false);
        prop_assert_eq!(after, before);
    }

    #[test]
    fn full_store_rejects_any_add(spec in customizable()) {
        let mut scheduler = Scheduler::new(MemoryDocumentStore::new());
        for hour in 0..MAX_ALARMS {
            scheduler
                .add_system_no_parameter(DayMask::ALL, hour as u8, 0, 0, || Ok(()), true)
                .unwrap();
        }

        prop_assert!(scheduler.add_customizable(&spec, noop()).is_err());
        prop_assert_eq!(scheduler.count(), MAX_ALARMS);
    }
}
