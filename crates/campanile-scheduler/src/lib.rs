//! Fixed-capacity alarm scheduler for Campanile.
//!
//! This crate provides a single-threaded scheduler that:
//! - Holds up to [`MAX_ALARMS`] system and customizable alarms
//! - Fires each alarm at most once per matching window
//! - Addresses customizable alarms by a stable [`WebId`]
//! - Persists customizable alarms as a JSON document and reloads them

mod clock;
pub mod codec;
mod document;
pub mod engine;
mod error;
mod registry;
mod scheduler;
mod store;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{CustomizablesDocument, DOCUMENT_PATH, DOCUMENT_VERSION, DocumentEntry};
pub use document::{DocumentStore, FsDocumentStore, MemoryDocumentStore};
pub use error::{ActionError, SchedulerError, StoreError};
pub use registry::{DocumentState, LoadReport};
pub use scheduler::{ActionBinder, AlarmListing, CurrentTime, Scheduler, StatisticsDocument};
pub use store::AlarmStore;
pub use types::{
    Action, ActionResult, Alarm, CustomizableAlarm, DayMask, DedupState, MAX_ALARMS,
    SYSTEM_TYPE_TAG, TimeReading, WILDCARD, WebId,
};
