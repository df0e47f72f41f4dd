use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::trace;

use crate::components::ComponentId;

/// The ordering key of a calendar event.  Events are ordered by time, then
/// by priority (lower first), then urgent events ahead of normal events,
/// then in insertion order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EventKey {
    pub(crate) time: f64,
    pub(crate) priority: f64,
    pub(crate) urgent: bool,
    sequence: u64,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.priority.total_cmp(&other.priority))
            .then(other.urgent.cmp(&self.urgent))
            .then(self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EventKey {}

/// The event calendar holds at most one event per component.  Each
/// component keeps the key of its event, so an event can be withdrawn
/// exactly - a hold cut short, or a deadline beaten by a grant.
#[derive(Debug, Clone, Default)]
pub(crate) struct Calendar {
    events: BTreeMap<EventKey, ComponentId>,
    sequence: u64,
}

impl Calendar {
    pub(crate) fn insert(
        &mut self,
        component: ComponentId,
        time: f64,
        priority: f64,
        urgent: bool,
    ) -> EventKey {
        let key = EventKey {
            time,
            priority,
            urgent,
            sequence: self.sequence,
        };
        self.sequence += 1;
        self.events.insert(key, component);
        trace!(time, priority, urgent, component = component.index(), "calendar insert");
        key
    }

    pub(crate) fn remove(&mut self, key: &EventKey) -> Option<ComponentId> {
        self.events.remove(key)
    }

    /// Takes the earliest event off the calendar.
    pub(crate) fn pop(&mut self) -> Option<(EventKey, ComponentId)> {
        let key = *self.events.keys().next()?;
        let component = self.events.remove(&key)?;
        trace!(time = key.time, component = component.index(), "calendar pop");
        Some((key, component))
    }

    pub(crate) fn peek_time(&self) -> Option<f64> {
        self.events.keys().next().map(|key| key.time)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_pop_in_key_order() {
        let mut calendar = Calendar::default();
        calendar.insert(ComponentId(1), 5.0, 0.0, false);
        calendar.insert(ComponentId(2), 5.0, 0.0, true);
        calendar.insert(ComponentId(3), 5.0, -1.0, false);
        calendar.insert(ComponentId(4), 2.0, 0.0, false);
        calendar.insert(ComponentId(5), 5.0, 0.0, false);
        let order: Vec<usize> = std::iter::from_fn(|| calendar.pop())
            .map(|(_, component)| component.index())
            .collect();
        assert_eq!(order, vec![4, 3, 2, 1, 5]);
    }

    #[test]
    fn events_are_withdrawn_exactly() {
        let mut calendar = Calendar::default();
        let first = calendar.insert(ComponentId(1), 3.0, 0.0, false);
        calendar.insert(ComponentId(2), 3.0, 0.0, false);
        assert_eq!(calendar.remove(&first), Some(ComponentId(1)));
        assert_eq!(calendar.remove(&first), None);
        assert_eq!(calendar.len(), 1);
        assert_eq!(calendar.peek_time(), Some(3.0));
    }
}
