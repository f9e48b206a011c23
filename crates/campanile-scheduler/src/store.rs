//! Fixed-capacity alarm storage.

use crate::{Alarm, MAX_ALARMS, SchedulerError, WebId};

/// Ordered, bounded collection of alarms.
///
/// Indices shift down when an earlier alarm is removed, so they must not be
/// held across mutations. Customizable alarms should be addressed by
/// [`WebId`] instead.
#[derive(Debug)]
pub struct AlarmStore {
    alarms: Vec<Alarm>,
    capacity: usize,
}

impl AlarmStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_ALARMS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            alarms: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an alarm and return its index.
    pub fn push(&mut self, alarm: Alarm) -> Result<usize, SchedulerError> {
        if self.is_full() {
            return Err(SchedulerError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.alarms.push(alarm);
        Ok(self.alarms.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<&Alarm> {
        self.alarms.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Alarm> {
        self.alarms.get_mut(index)
    }

    /// Remove the alarm at `index`, shifting later alarms down.
    pub fn remove(&mut self, index: usize) -> Option<Alarm> {
        (index < self.alarms.len()).then(|| self.alarms.remove(index))
    }

    /// Keep only the alarms matching `keep`, preserving order.
    pub fn retain(&mut self, keep: impl FnMut(&Alarm) -> bool) {
        self.alarms.retain(keep);
    }

    pub fn clear(&mut self) {
        self.alarms.clear();
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.alarms.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Alarm> {
        self.alarms.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Alarm> {
        self.alarms.iter_mut()
    }

    /// Index of the customizable alarm carrying `web_id`.
    pub fn position_of(&self, web_id: WebId) -> Option<usize> {
        self.alarms.iter().position(|a| a.web_id == Some(web_id))
    }

    /// Largest web id among live customizable alarms.
    pub fn max_web_id(&self) -> Option<WebId> {
        self.alarms.iter().filter_map(|a| a.web_id).max()
    }
}

impl Default for AlarmStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, CustomizableAlarm, DayMask};

    fn system_alarm(hour: u8) -> Alarm {
        Alarm::system(DayMask::ALL, hour, 0, 0, Action::NoParameter(|| Ok(())), 0, true)
    }

    #[test]
    fn test_push_until_full() {
        let mut store = AlarmStore::new();
        for i in 0..MAX_ALARMS {
            assert_eq!(store.push(system_alarm(i as u8)).unwrap(), i);
        }
        assert!(store.is_full());

        let err = store.push(system_alarm(0)).unwrap_err();
        assert!(matches!(err, SchedulerError::CapacityExceeded { capacity: 16 }));
        assert_eq!(store.len(), MAX_ALARMS);
    }

    #[test]
    fn test_remove_compacts() {
        let mut store = AlarmStore::new();
        for hour in [1, 2, 3] {
            store.push(system_alarm(hour)).unwrap();
        }

        let removed = store.remove(0).unwrap();
        assert_eq!(removed.hour, 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0).map(|a| a.hour), Some(2));
        assert_eq!(store.get(1).map(|a| a.hour), Some(3));
        assert!(store.get(2).is_none());
        assert!(store.remove(5).is_none());
    }

    #[test]
    fn test_position_and_max_web_id() {
        let mut store = AlarmStore::with_capacity(4);
        store.push(system_alarm(0)).unwrap();
        for raw in [3, 9] {
            let id = WebId::new(raw).unwrap();
            let spec = CustomizableAlarm::new("a", 1, 2, "BELL");
            store.push(Alarm::customizable(&spec, None, id)).unwrap();
        }

        assert_eq!(store.position_of(WebId::new(9).unwrap()), Some(2));
        assert_eq!(store.position_of(WebId::new(4).unwrap()), None);
        assert_eq!(store.max_web_id(), WebId::new(9));
    }
}
