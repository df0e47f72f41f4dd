//! The resource module provides the capacity-constrained claim arbitrator.
//! A `Resource` has a capacity and a claimed quantity, a queue of pending
//! requesters, and (unless anonymous) a queue of claimers.  Claims are
//! identified by default - each component holds its own claimed quantity.
//! An anonymous resource only tracks the aggregate claimed quantity.
//!
//! A `Request` lists one or more claims.  By default a request is all or
//! nothing - it is granted once every listed resource has the requested
//! quantity available.  A greedy request claims what is available right
//! away, and tops the claims up as capacity frees.

use serde::{Deserialize, Serialize};

use crate::components::Deadline;
use crate::monitor::TimestampMonitor;
use crate::queue::QueueId;

/// A handle to a resource in an `Environment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub(crate) usize);

impl ResourceId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One claim of a request - a quantity of a resource, and the priority of
/// the requester in the pending list of that resource (lower first).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Claim {
    pub resource: ResourceId,
    pub quantity: f64,
    pub priority: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Request {
    pub(crate) claims: Vec<Claim>,
    pub(crate) greedy: bool,
    pub(crate) deadline: Deadline,
    pub(crate) mode: Option<String>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    /// A request for a quantity of a single resource.
    pub fn one(resource: ResourceId, quantity: f64) -> Self {
        Self::new().claim(resource, quantity)
    }

    pub fn claim(self, resource: ResourceId, quantity: f64) -> Self {
        self.claim_with_priority(resource, quantity, 0.0)
    }

    pub fn claim_with_priority(mut self, resource: ResourceId, quantity: f64, priority: f64) -> Self {
        self.claims.push(Claim {
            resource,
            quantity,
            priority,
        });
        self
    }

    pub fn greedy(mut self) -> Self {
        self.greedy = true;
        self
    }

    /// Fail the request, if it is not granted by an absolute time.
    pub fn fail_at(mut self, time: f64) -> Self {
        self.deadline = Deadline::At(time);
        self
    }

    /// Fail the request, if it is not granted within a delay.
    pub fn fail_delay(mut self, delay: f64) -> Self {
        self.deadline = Deadline::Delay(delay);
        self
    }

    pub fn mode(mut self, mode: &str) -> Self {
        self.mode = Some(mode.to_string());
        self
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Claims on the same resource are merged, summing the quantities and
    /// keeping the priority of the first.
    pub(crate) fn merged_claims(&self) -> Vec<Claim> {
        self.claims.iter().fold(Vec::new(), |mut merged: Vec<Claim>, claim| {
            match merged
                .iter_mut()
                .find(|existing| existing.resource == claim.resource)
            {
                Some(existing) => existing.quantity += claim.quantity,
                None => merged.push(*claim),
            }
            merged
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    id: ResourceId,
    name: String,
    pub(crate) capacity: f64,
    pub(crate) claimed: f64,
    anonymous: bool,
    requesters: QueueId,
    claimers: QueueId,
    capacity_monitor: TimestampMonitor,
    claimed_monitor: TimestampMonitor,
    available_monitor: TimestampMonitor,
    occupancy_monitor: TimestampMonitor,
}

impl Resource {
    pub(crate) fn new(
        id: ResourceId,
        name: String,
        capacity: f64,
        anonymous: bool,
        requesters: QueueId,
        claimers: QueueId,
        now: f64,
    ) -> Self {
        Self {
            id,
            capacity_monitor: TimestampMonitor::new(&format!("Capacity of {}", name), capacity, now),
            claimed_monitor: TimestampMonitor::new(&format!("Claimed quantity of {}", name), 0, now),
            available_monitor: TimestampMonitor::new(
                &format!("Available quantity of {}", name),
                capacity,
                now,
            ),
            occupancy_monitor: TimestampMonitor::new(&format!("Occupancy of {}", name), 0, now),
            name,
            capacity,
            claimed: 0.0,
            anonymous,
            requesters,
            claimers,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn claimed_quantity(&self) -> f64 {
        self.claimed
    }

    /// Capacity less the claimed quantity - negative while the resource is
    /// over-committed after a capacity reduction.
    pub fn available_quantity(&self) -> f64 {
        self.capacity - self.claimed
    }

    pub fn occupancy(&self) -> f64 {
        if self.capacity > 0.0 {
            self.claimed / self.capacity
        } else {
            0.0
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// The queue of components with a pending request for this resource.
    pub fn requesters(&self) -> QueueId {
        self.requesters
    }

    /// The queue of components holding a claim on this resource.  Always
    /// empty for anonymous resources.
    pub fn claimers(&self) -> QueueId {
        self.claimers
    }

    pub fn capacity_monitor(&self) -> &TimestampMonitor {
        &self.capacity_monitor
    }

    pub fn claimed_monitor(&self) -> &TimestampMonitor {
        &self.claimed_monitor
    }

    pub fn available_monitor(&self) -> &TimestampMonitor {
        &self.available_monitor
    }

    pub fn occupancy_monitor(&self) -> &TimestampMonitor {
        &self.occupancy_monitor
    }

    /// Switch all monitors of the resource on or off.
    pub fn monitor(&mut self, monitoring: bool, now: f64) {
        self.capacity_monitor.monitor(monitoring, now);
        self.claimed_monitor.monitor(monitoring, now);
        self.available_monitor.monitor(monitoring, now);
        self.occupancy_monitor.monitor(monitoring, now);
    }

    pub(crate) fn tally(&mut self, now: f64) {
        self.capacity_monitor.tally(self.capacity, now);
        self.claimed_monitor.tally(self.claimed, now);
        self.available_monitor.tally(self.available_quantity(), now);
        self.occupancy_monitor.tally(self.occupancy(), now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_claims_sum_per_resource() {
        let request = Request::new()
            .claim_with_priority(ResourceId(1), 2.0, -1.0)
            .claim(ResourceId(2), 1.0)
            .claim(ResourceId(1), 1.5);
        let merged = request.merged_claims();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].quantity, 3.5);
        assert_eq!(merged[0].priority, -1.0);
        assert_eq!(request.claims().len(), 3);
    }

    #[test]
    fn occupancy_and_availability() {
        let mut resource = Resource::new(
            ResourceId(0),
            String::from("clerks"),
            4.0,
            false,
            QueueId(0),
            QueueId(1),
            0.0,
        );
        resource.claimed = 3.0;
        resource.tally(2.0);
        assert_eq!(resource.available_quantity(), 1.0);
        assert_eq!(resource.occupancy(), 0.75);
        assert_eq!(resource.occupancy_monitor().get().as_number(), Some(0.75));
        resource.capacity = 0.0;
        assert_eq!(resource.occupancy(), 0.0);
    }
}
