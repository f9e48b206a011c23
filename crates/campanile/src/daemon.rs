//! Host loop for running the alarm scheduler.
//!
//! Owns the scheduler on a single task and drives it from a tokio interval
//! until ctrl-c. Customizable alarms are re-bound to built-in actions by
//! their type tag. The admin subcommands edit the document from another
//! process; the loop notices the change and reloads it.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use miette::Result;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use campanile_scheduler::{
    Action, ActionResult, DayMask, DocumentState, FsDocumentStore, LoadReport, Scheduler, WILDCARD,
};

/// Default tick period in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 1000;

/// Default heartbeat interval in minutes.
pub const DEFAULT_HEARTBEAT_MINUTES: u16 = 15;

/// Configuration for the host loop.
pub struct DaemonConfig {
    pub data_dir: PathBuf,
    pub tick: Duration,
    /// Minutes between heartbeat log lines (0 to disable).
    pub heartbeat_minutes: u16,
    pub hourly_chime: bool,
}

fn ring_bell(parameter: u16) -> ActionResult {
    info!(parameter, "ringing bell");
    Ok(())
}

fn chime(parameter: u16) -> ActionResult {
    info!(parameter, "chiming");
    Ok(())
}

fn log_alarm(parameter: u16) -> ActionResult {
    info!(parameter, "alarm triggered");
    Ok(())
}

fn heartbeat() -> ActionResult {
    info!("scheduler heartbeat");
    Ok(())
}

/// Resolve a type tag to its built-in action. Unknown tags log.
pub fn bind_action(type_tag: &str) -> Action {
    match type_tag {
        "BELL" => Action::WithParameter(ring_bell),
        "CHIME" => Action::WithParameter(chime),
        "LOG" => Action::WithParameter(log_alarm),
        other => {
            warn!(type_tag = other, "unknown alarm type, falling back to LOG");
            Action::WithParameter(log_alarm)
        }
    }
}

/// Open the scheduler persisting under `data_dir` and load its alarms.
pub fn open_scheduler(data_dir: impl Into<PathBuf>) -> Scheduler {
    let data_dir = data_dir.into();
    let mut scheduler = Scheduler::new(FsDocumentStore::new(&data_dir))
        .with_binder(|type_tag| Some(bind_action(type_tag)));

    let report = scheduler.begin();
    match report.state {
        DocumentState::Loaded | DocumentState::Missing => {}
        DocumentState::Unreadable | DocumentState::Corrupt => warn!(
            data_dir = %data_dir.display(),
            state = ?report.state,
            "alarm document could not be used, starting with no customizable alarms"
        ),
    }
    scheduler
}

/// Tick period in whole milliseconds, saturating at `u64::MAX`.
fn tick_millis(tick: Duration) -> u64 {
    u64::try_from(tick.as_millis()).unwrap_or(u64::MAX)
}

/// Notices when the alarm document on disk changes.
struct DocumentWatcher {
    path: PathBuf,
    stamp: Option<(SystemTime, u64)>,
}

fn file_stamp(path: &Path) -> Option<(SystemTime, u64)> {
    let metadata = std::fs::metadata(path).ok()?;
    Some((metadata.modified().ok()?, metadata.len()))
}

impl DocumentWatcher {
    fn new(data_dir: &Path, scheduler: &Scheduler) -> Self {
        let path = FsDocumentStore::new(data_dir).resolve(scheduler.document_path());
        let stamp = file_stamp(&path);
        Self { path, stamp }
    }

    /// Whether the document changed since the last call.
    fn changed(&mut self) -> bool {
        let stamp = file_stamp(&self.path);
        if stamp == self.stamp {
            return false;
        }
        self.stamp = stamp;
        true
    }
}

/// Reload the customizable alarms if the document changed on disk.
fn refresh(scheduler: &mut Scheduler, watcher: &mut DocumentWatcher) -> Option<LoadReport> {
    if !watcher.changed() {
        return None;
    }
    let report = scheduler.reload_customizables();
    info!(
        state = ?report.state,
        loaded = report.loaded,
        skipped = report.skipped,
        "alarm document changed, reloaded"
    );
    Some(report)
}

/// Add the built-in system alarms selected by `config`.
fn install_system_alarms(scheduler: &mut Scheduler, config: &DaemonConfig) -> Result<()> {
    if config.heartbeat_minutes > 0 {
        scheduler
            .add_system_no_parameter(
                DayMask::ALL,
                WILDCARD,
                0,
                config.heartbeat_minutes,
                heartbeat,
                true,
            )
            .map_err(|e| miette::miette!("failed to add heartbeat alarm: {}", e))?;
    }

    if config.hourly_chime {
        scheduler
            .add_system_with_parameter(DayMask::ALL, WILDCARD, 0, 0, chime, 1, true)
            .map_err(|e| miette::miette!("failed to add hourly chime: {}", e))?;
    }

    Ok(())
}

/// Run the host loop until ctrl-c.
pub async fn run(config: DaemonConfig) -> Result<()> {
    info!(
        data_dir = %config.data_dir.display(),
        tick_ms = tick_millis(config.tick),
        heartbeat_minutes = config.heartbeat_minutes,
        hourly_chime = config.hourly_chime,
        "starting Campanile"
    );

    let mut scheduler = open_scheduler(&config.data_dir);
    install_system_alarms(&mut scheduler, &config)?;
    debug!("{}", scheduler.listing());
    let mut watcher = DocumentWatcher::new(&config.data_dir, &scheduler);

    let mut interval = tokio::time::interval(config.tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            result = &mut shutdown => {
                result.map_err(|e| miette::miette!("failed to listen for ctrl-c: {}", e))?;
                info!("received shutdown signal");
                break;
            }

            _ = interval.tick() => {
                refresh(&mut scheduler, &mut watcher);
                match scheduler.tick() {
                    Ok(0) => {}
                    Ok(fired) => debug!(fired, "alarms fired"),
                    Err(e) => error!(error = %e, "alarm check failed"),
                }
            }
        }
    }

    info!(alarms = scheduler.count(), "Campanile stopped");
    Ok(())
}
