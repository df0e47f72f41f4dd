//! The queue module provides the ordered membership container of the
//! kernel.  Entries are ordered by ascending priority, with ties in entry
//! order.  Every membership change is observed by a time-weighted length
//! monitor, and every departure tallies the length of stay.
//!
//! Membership changes go through the `Environment`, which keeps the queue
//! and the memberships of its components in step.  The `Queue` itself
//! offers read access - positional lookups and ordered snapshots.

use serde::{Deserialize, Serialize};

use crate::components::ComponentId;
use crate::monitor::{Monitor, TimestampMonitor};

/// A handle to a queue in an `Environment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueId(pub(crate) usize);

impl QueueId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    component: ComponentId,
    priority: f64,
    entry_time: f64,
}

impl QueueEntry {
    pub fn component(&self) -> ComponentId {
        self.component
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn entry_time(&self) -> f64 {
        self.entry_time
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Queue {
    id: QueueId,
    name: String,
    entries: Vec<QueueEntry>,
    length: TimestampMonitor,
    length_of_stay: Monitor,
}

impl Queue {
    pub(crate) fn new(id: QueueId, name: String, now: f64) -> Self {
        Self {
            id,
            length: TimestampMonitor::new(&format!("Length of {}", name), 0, now),
            length_of_stay: Monitor::new(&format!("Length of stay in {}", name)),
            name,
            entries: Vec::new(),
        }
    }

    pub fn id(&self) -> QueueId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn head(&self) -> Option<ComponentId> {
        self.entries.first().map(|entry| entry.component)
    }

    pub fn tail(&self) -> Option<ComponentId> {
        self.entries.last().map(|entry| entry.component)
    }

    /// The component at a position, counted from the head.
    pub fn get(&self, index: usize) -> Option<ComponentId> {
        self.entries.get(index).map(|entry| entry.component)
    }

    pub fn index_of(&self, component: ComponentId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.component == component)
    }

    pub fn contains(&self, component: ComponentId) -> bool {
        self.index_of(component).is_some()
    }

    pub fn priority_of(&self, component: ComponentId) -> Option<f64> {
        self.entry(component).map(|entry| entry.priority)
    }

    pub fn entry(&self, component: ComponentId) -> Option<&QueueEntry> {
        self.entries
            .iter()
            .find(|entry| entry.component == component)
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// A snapshot of the members, from head to tail.  Membership changes
    /// while walking a queue should walk a snapshot.
    pub fn components(&self) -> Vec<ComponentId> {
        self.entries.iter().map(|entry| entry.component).collect()
    }

    /// The time-weighted length of the queue.
    pub fn length(&self) -> &TimestampMonitor {
        &self.length
    }

    pub fn length_mut(&mut self) -> &mut TimestampMonitor {
        &mut self.length
    }

    /// The length of stay of the components that left the queue.
    pub fn length_of_stay(&self) -> &Monitor {
        &self.length_of_stay
    }

    pub fn length_of_stay_mut(&mut self) -> &mut Monitor {
        &mut self.length_of_stay
    }

    pub(crate) fn head_priority(&self) -> f64 {
        self.entries.first().map_or(0.0, |entry| entry.priority)
    }

    pub(crate) fn tail_priority(&self) -> f64 {
        self.entries.last().map_or(0.0, |entry| entry.priority)
    }

    /// The position a new entry with `priority` takes - behind every entry
    /// of the same or lower priority.
    pub(crate) fn sorted_index(&self, priority: f64) -> usize {
        self.entries
            .iter()
            .position(|entry| entry.priority > priority)
            .unwrap_or_else(|| self.entries.len())
    }

    pub(crate) fn insert(&mut self, index: usize, component: ComponentId, priority: f64, now: f64) {
        self.entries.insert(
            index,
            QueueEntry {
                component,
                priority,
                entry_time: now,
            },
        );
        self.length.tally(self.entries.len(), now);
    }

    pub(crate) fn remove(&mut self, component: ComponentId, now: f64) -> Option<QueueEntry> {
        let index = self.index_of(component)?;
        let entry = self.entries.remove(index);
        self.length.tally(self.entries.len(), now);
        self.length_of_stay.tally(now - entry.entry_time);
        Some(entry)
    }

    /// Moves a member to its sorted position for a new priority, keeping
    /// its entry time.  Members of equal priority stay ahead of it.
    pub(crate) fn reposition(&mut self, component: ComponentId, priority: f64) -> bool {
        match self.index_of(component) {
            Some(index) => {
                let mut entry = self.entries.remove(index);
                entry.priority = priority;
                let index = self.sorted_index(priority);
                self.entries.insert(index, entry);
                true
            }
            None => false,
        }
    }
}

/// The members of `left`, then the members of `right` not in `left`.
pub(crate) fn union(left: &Queue, right: &Queue) -> Vec<(ComponentId, f64)> {
    left.entries
        .iter()
        .chain(right.entries.iter().filter(|entry| !left.contains(entry.component)))
        .map(|entry| (entry.component, entry.priority))
        .collect()
}

/// The members of `left` that are also in `right`, in `left` order.
pub(crate) fn intersection(left: &Queue, right: &Queue) -> Vec<(ComponentId, f64)> {
    left.entries
        .iter()
        .filter(|entry| right.contains(entry.component))
        .map(|entry| (entry.component, entry.priority))
        .collect()
}

/// The members of `left` that are not in `right`, in `left` order.
pub(crate) fn difference(left: &Queue, right: &Queue) -> Vec<(ComponentId, f64)> {
    left.entries
        .iter()
        .filter(|entry| !right.contains(entry.component))
        .map(|entry| (entry.component, entry.priority))
        .collect()
}

/// The members of exactly one of `left` and `right`, the `left` ones first.
pub(crate) fn symmetric_difference(left: &Queue, right: &Queue) -> Vec<(ComponentId, f64)> {
    let mut members = difference(left, right);
    members.extend(difference(right, left));
    members
}
