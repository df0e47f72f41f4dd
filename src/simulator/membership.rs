use super::Environment;
use crate::components::ComponentId;
use crate::queue::{self, QueueId};
use crate::utils::errors::SimulationError;

/// Where a component enters a queue.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Placement {
    /// At the tail, with the priority of the tail
    Tail,
    /// At the head, with the priority of the head
    Head,
    /// Behind every member of the same or lower priority
    Sorted(f64),
    /// Just ahead of a member, with its priority
    InFrontOf(ComponentId),
    /// Just behind a member, with its priority
    Behind(ComponentId),
}

impl Environment {
    fn not_a_member(&self, queue: QueueId, component: ComponentId) -> SimulationError {
        SimulationError::Membership {
            component: self.components[component.0].name.clone(),
            queue: self.queues[queue.0].name().to_string(),
            reason: "is not a member of",
        }
    }

    pub(crate) fn place(
        &mut self,
        queue: QueueId,
        component: ComponentId,
        placement: Placement,
    ) -> Result<(), SimulationError> {
        self.check_component(component)?;
        let target = self.queue(queue)?;
        if target.contains(component) {
            return Err(SimulationError::Membership {
                component: self.components[component.0].name.clone(),
                queue: target.name().to_string(),
                reason: "is already a member of",
            });
        }
        let (index, priority) = match placement {
            Placement::Tail => (target.len(), target.tail_priority()),
            Placement::Head => (0, target.head_priority()),
            Placement::Sorted(priority) => (target.sorted_index(priority), priority),
            Placement::InFrontOf(poke) | Placement::Behind(poke) => {
                let index = target
                    .index_of(poke)
                    .ok_or_else(|| self.not_a_member(queue, poke))?;
                let priority = target.priority_of(poke).unwrap_or(0.0);
                match placement {
                    Placement::Behind(_) => (index + 1, priority),
                    _ => (index, priority),
                }
            }
        };
        let now = self.now;
        self.queues[queue.0].insert(index, component, priority, now);
        self.components[component.0].memberships.push(queue);
        let detail = self.queues[queue.0].name().to_string();
        self.record_component("enter", component, detail);
        Ok(())
    }

    /// Takes a component out of a queue, if it is a member.
    pub(crate) fn remove_member(&mut self, queue: QueueId, component: ComponentId) -> bool {
        let now = self.now;
        if self.queues[queue.0].remove(component, now).is_none() {
            return false;
        }
        self.components[component.0]
            .memberships
            .retain(|membership| *membership != queue);
        let detail = self.queues[queue.0].name().to_string();
        self.record_component("leave", component, detail);
        true
    }

    /// Enter a queue at the tail.
    pub fn enter(&mut self, queue: QueueId, component: ComponentId) -> Result<(), SimulationError> {
        self.place(queue, component, Placement::Tail)
    }

    pub fn enter_at_head(&mut self, queue: QueueId, component: ComponentId) -> Result<(), SimulationError> {
        self.place(queue, component, Placement::Head)
    }

    /// Enter a queue behind every member of the same or lower priority.
    pub fn enter_sorted(
        &mut self,
        queue: QueueId,
        component: ComponentId,
        priority: f64,
    ) -> Result<(), SimulationError> {
        self.place(queue, component, Placement::Sorted(priority))
    }

    pub fn enter_in_front_of(
        &mut self,
        queue: QueueId,
        component: ComponentId,
        poke: ComponentId,
    ) -> Result<(), SimulationError> {
        self.check_component(poke)?;
        self.place(queue, component, Placement::InFrontOf(poke))
    }

    pub fn enter_behind(
        &mut self,
        queue: QueueId,
        component: ComponentId,
        poke: ComponentId,
    ) -> Result<(), SimulationError> {
        self.check_component(poke)?;
        self.place(queue, component, Placement::Behind(poke))
    }

    pub fn leave(&mut self, queue: QueueId, component: ComponentId) -> Result<(), SimulationError> {
        self.check_component(component)?;
        self.queue(queue)?;
        if self.remove_member(queue, component) {
            Ok(())
        } else {
            Err(self.not_a_member(queue, component))
        }
    }

    /// Take the head off a queue.
    pub fn pop(&mut self, queue: QueueId) -> Result<Option<ComponentId>, SimulationError> {
        let head = self.queue(queue)?.head();
        if let Some(component) = head {
            self.remove_member(queue, component);
        }
        Ok(head)
    }

    /// Change the priority of a member, moving it to its sorted position.
    pub fn set_priority(
        &mut self,
        queue: QueueId,
        component: ComponentId,
        priority: f64,
    ) -> Result<(), SimulationError> {
        self.check_component(component)?;
        self.queue(queue)?;
        if self.queues[queue.0].reposition(component, priority) {
            Ok(())
        } else {
            Err(self.not_a_member(queue, component))
        }
    }

    /// Take every member out of a queue.
    pub fn clear(&mut self, queue: QueueId) -> Result<(), SimulationError> {
        let members = self.queue(queue)?.components();
        members.into_iter().for_each(|component| {
            self.remove_member(queue, component);
        });
        Ok(())
    }

    /// The number of queues a component is a member of.
    pub fn count(&self, component: ComponentId) -> Result<usize, SimulationError> {
        Ok(self.component(component)?.memberships.len())
    }

    pub fn queues_of(&self, component: ComponentId) -> Result<Vec<QueueId>, SimulationError> {
        Ok(self.component(component)?.memberships.clone())
    }

    pub fn component_with_name(
        &self,
        queue: QueueId,
        name: &str,
    ) -> Result<Option<ComponentId>, SimulationError> {
        Ok(self
            .queue(queue)?
            .components()
            .into_iter()
            .find(|component| self.components[component.0].name == name))
    }

    /// Builds a new queue from a list of members.  Members keep their
    /// priority, and are placed in sorted order, so members of equal
    /// priority keep the list order.
    fn derive_queue(
        &mut self,
        name: &str,
        members: Vec<(ComponentId, f64)>,
    ) -> Result<QueueId, SimulationError> {
        let queue = self.create_queue(name);
        members
            .into_iter()
            .try_for_each(|(component, priority)| {
                self.place(queue, component, Placement::Sorted(priority))
            })?;
        Ok(queue)
    }

    /// A new queue with the members of `left`, then the members of `right`
    /// that are not in `left`.
    pub fn union(&mut self, left: QueueId, right: QueueId, name: &str) -> Result<QueueId, SimulationError> {
        let members = queue::union(self.queue(left)?, self.queue(right)?);
        self.derive_queue(name, members)
    }

    /// A new queue with the members of `left` that are also in `right`.
    pub fn intersection(
        &mut self,
        left: QueueId,
        right: QueueId,
        name: &str,
    ) -> Result<QueueId, SimulationError> {
        let members = queue::intersection(self.queue(left)?, self.queue(right)?);
        self.derive_queue(name, members)
    }

    /// A new queue with the members of `left` that are not in `right`.
    pub fn difference(
        &mut self,
        left: QueueId,
        right: QueueId,
        name: &str,
    ) -> Result<QueueId, SimulationError> {
        let members = queue::difference(self.queue(left)?, self.queue(right)?);
        self.derive_queue(name, members)
    }

    /// A new queue with the members of exactly one of `left` and `right`.
    pub fn symmetric_difference(
        &mut self,
        left: QueueId,
        right: QueueId,
        name: &str,
    ) -> Result<QueueId, SimulationError> {
        let members = queue::symmetric_difference(self.queue(left)?, self.queue(right)?);
        self.derive_queue(name, members)
    }

    /// A new queue with the members of `source`.
    pub fn copy_queue(&mut self, source: QueueId, name: &str) -> Result<QueueId, SimulationError> {
        let members = self
            .queue(source)?
            .entries()
            .iter()
            .map(|entry| (entry.component(), entry.priority()))
            .collect();
        self.derive_queue(name, members)
    }

    /// Move every member of `source` to the tail of `target`.  Members of
    /// both queues stay where they are in `target`.
    pub fn move_queue(&mut self, source: QueueId, target: QueueId) -> Result<(), SimulationError> {
        self.queue(target)?;
        let members = self.queue(source)?.components();
        for component in members {
            self.remove_member(source, component);
            if !self.queues[target.0].contains(component) {
                self.place(target, component, Placement::Tail)?;
            }
        }
        Ok(())
    }
}
