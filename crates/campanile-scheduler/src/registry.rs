//! Customizable alarm registry.
//!
//! Customizable alarms are addressed by [`WebId`], never by store index.
//! Every successful mutation rewrites the whole document before returning.

use tracing::{debug, error, info, warn};

use crate::codec::{self, CustomizablesDocument};
use crate::{
    Action, Alarm, CustomizableAlarm, DedupState, Scheduler, SchedulerError, StoreError, WebId,
};

/// How the persisted document looked when it was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// Parsed successfully (individual entries may still have been skipped).
    Loaded,
    /// No document exists yet.
    Missing,
    /// The document store failed to read it.
    Unreadable,
    /// It exists but could not be parsed.
    Corrupt,
}

/// Outcome of [`Scheduler::load_customizables`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub state: DocumentState,
    /// Entries inserted into the store.
    pub loaded: usize,
    /// Entries rejected by validation or duplicate ids.
    pub skipped: usize,
    /// Entries ignored because the store was full.
    pub dropped: usize,
}

impl LoadReport {
    fn empty(state: DocumentState) -> Self {
        Self {
            state,
            loaded: 0,
            skipped: 0,
            dropped: 0,
        }
    }
}

impl Scheduler {
    /// Add a customizable alarm and persist the registry.
    ///
    /// The new id is one more than the largest live id, so ids freed by
    /// deleting the newest alarm are handed out again.
    pub fn add_customizable(
        &mut self,
        spec: &CustomizableAlarm,
        action: Action,
    ) -> Result<WebId, SchedulerError> {
        codec::validate(spec)?;

        let web_id = self.allocate_web_id();
        let index = self
            .alarms
            .push(Alarm::customizable(spec, Some(action), web_id))?;
        self.next_web_id = self.next_web_id.max(web_id.next());

        debug!(index, %web_id, name = %spec.name, "customizable alarm created");
        self.persist();
        Ok(web_id)
    }

    /// Replace the fields and action of a customizable alarm.
    ///
    /// The alarm's dedup state is reset, so it behaves like a new alarm.
    pub fn modify_customizable(
        &mut self,
        web_id: WebId,
        spec: &CustomizableAlarm,
        action: Option<Action>,
    ) -> Result<(), SchedulerError> {
        let index = self.find_customizable(web_id)?;
        let action = action.ok_or(SchedulerError::MissingCallback(web_id))?;
        codec::validate(spec)?;

        if let Some(alarm) = self.alarms.get_mut(index) {
            alarm.apply(spec, Some(action));
        }

        debug!(index, %web_id, "customizable alarm modified");
        self.persist();
        Ok(())
    }

    /// Delete a customizable alarm. Later alarms shift down one index.
    pub fn delete_customizable(&mut self, web_id: WebId) -> Result<(), SchedulerError> {
        let index = self.find_customizable(web_id)?;
        let removed = self.alarms.remove(index);

        info!(index, %web_id, name = ?removed.map(|a| a.name), "customizable alarm deleted");
        self.persist();
        Ok(())
    }

    /// Enable or disable a customizable alarm.
    ///
    /// Enabling resets dedup state so the alarm can fire in the next
    /// matching window; disabling leaves it alone.
    pub fn enable_customizable(&mut self, web_id: WebId, state: bool) -> Result<(), SchedulerError> {
        let index = self.find_customizable(web_id)?;

        if let Some(alarm) = self.alarms.get_mut(index) {
            alarm.enabled = state;
            if state {
                alarm.dedup.reset();
            }
        }

        debug!(index, %web_id, enabled = state, "customizable alarm toggled");
        self.persist();
        Ok(())
    }

    /// Look up a customizable alarm.
    pub fn customizable(&self, web_id: WebId) -> Option<&Alarm> {
        self.alarms
            .position_of(web_id)
            .and_then(|index| self.alarms.get(index))
            .filter(|alarm| alarm.is_customizable)
    }

    /// The customizable alarms with display fields, for external consumers.
    pub fn customizables_document(&self) -> CustomizablesDocument {
        codec::encode(&self.alarms, self.timestamp(), true)
    }

    /// Write the customizable alarms to the document store.
    #[tracing::instrument(skip(self), fields(path = %self.document_path))]
    pub fn save_customizables(&mut self) -> Result<(), SchedulerError> {
        let doc = codec::encode(&self.alarms, self.timestamp(), false);
        let bytes = serde_json::to_vec(&doc)?;
        self.documents.write_all(&self.document_path, &bytes)?;
        debug!(alarms = doc.total, bytes = bytes.len(), "customizable alarms saved");
        Ok(())
    }

    /// Replace the customizable alarms in the store with the persisted ones.
    ///
    /// System alarms are untouched. A missing, unreadable or corrupt
    /// document leaves the registry empty; invalid entries are skipped.
    #[tracing::instrument(skip(self), fields(path = %self.document_path))]
    pub fn load_customizables(&mut self) -> LoadReport {
        self.alarms.retain(|alarm| !alarm.is_customizable);

        let bytes = match self.documents.read_all(&self.document_path) {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound(_)) => {
                info!("no customizable alarm document, starting empty");
                return LoadReport::empty(DocumentState::Missing);
            }
            Err(e) => {
                error!(error = %e, "failed to read customizable alarm document");
                return LoadReport::empty(DocumentState::Unreadable);
            }
        };

        let entries = match codec::decode(&bytes) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "customizable alarm document is unusable, starting empty");
                return LoadReport::empty(DocumentState::Corrupt);
            }
        };

        let mut report = LoadReport::empty(DocumentState::Loaded);
        let total = entries.len();

        for (position, entry) in entries.into_iter().enumerate() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(position, error = %e, "skipping invalid alarm entry");
                    report.skipped += 1;
                    continue;
                }
            };

            if self.alarms.position_of(entry.web_id).is_some() {
                warn!(position, web_id = %entry.web_id, "skipping duplicate alarm id");
                report.skipped += 1;
                continue;
            }

            let action = self
                .binder
                .as_ref()
                .and_then(|bind| bind(&entry.spec.type_tag));
            if action.is_none() {
                warn!(
                    web_id = %entry.web_id,
                    type_tag = %entry.spec.type_tag,
                    "no action bound for loaded alarm"
                );
            }

            let alarm = Alarm::customizable(&entry.spec, action, entry.web_id);
            if let Err(e) = self.alarms.push(alarm) {
                report.dropped = total - position;
                warn!(error = %e, dropped = report.dropped, "ignoring remaining alarm entries");
                break;
            }

            self.next_web_id = self.next_web_id.max(entry.web_id.next());
            report.loaded += 1;
            debug!(web_id = %entry.web_id, name = %entry.spec.name, "alarm loaded");
        }

        info!(
            loaded = report.loaded,
            skipped = report.skipped,
            dropped = report.dropped,
            "customizable alarms loaded"
        );
        report
    }

    /// Load the document again after another writer changed it.
    ///
    /// Alarms whose id and fields survive the reload unchanged keep their
    /// dedup state, so they do not fire twice in the window they already
    /// fired in. Edited and new alarms start fresh.
    pub fn reload_customizables(&mut self) -> LoadReport {
        let previous: Vec<(WebId, CustomizableAlarm, DedupState)> = self
            .alarms
            .iter()
            .filter(|alarm| alarm.is_customizable)
            .filter_map(|alarm| Some((alarm.web_id?, alarm.spec(), alarm.dedup)))
            .collect();

        let report = self.load_customizables();

        for (web_id, spec, dedup) in previous {
            let Some(index) = self.alarms.position_of(web_id) else {
                continue;
            };
            if let Some(alarm) = self.alarms.get_mut(index) {
                if alarm.is_customizable && alarm.spec() == spec {
                    alarm.dedup = dedup;
                }
            }
        }
        report
    }

    fn allocate_web_id(&self) -> WebId {
        self.alarms.max_web_id().map_or(WebId::FIRST, WebId::next)
    }

    fn find_customizable(&self, web_id: WebId) -> Result<usize, SchedulerError> {
        let index = self
            .alarms
            .position_of(web_id)
            .ok_or(SchedulerError::NotFound(web_id))?;
        match self.alarms.get(index) {
            Some(alarm) if alarm.is_customizable => Ok(index),
            _ => Err(SchedulerError::NotCustomizable(web_id)),
        }
    }

    /// Save after a mutation. A failed write is logged; the in-memory
    /// change stands and the next successful save catches the document up.
    fn persist(&mut self) {
        if let Err(e) = self.save_customizables() {
            error!(error = %e, "failed to persist customizable alarms");
        }
    }
}
