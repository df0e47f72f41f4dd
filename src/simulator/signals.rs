use super::membership::Placement;
use super::Environment;
use crate::components::{ComponentId, Pending, PendingWait, Status};
use crate::monitor::Value;
use crate::state::{StateId, Wait, WaitItem};
use crate::utils::errors::SimulationError;

impl Environment {
    /// Wait for conditions on one or more states - any of them, or all of
    /// them at once.  A wait that is satisfied right away continues at the
    /// current time.  Otherwise the component becomes waiting, and enters
    /// the waiter list of every state it waits on.
    pub fn wait(&mut self, component: ComponentId, wait: Wait) -> Result<(), SimulationError> {
        self.operation = "wait";
        self.check_suspendable(component, "wait")?;
        for item in wait.items.iter() {
            self.state(item.state)?;
        }
        let deadline = wait.deadline.time(self.now);
        if !(deadline >= self.now) {
            return Err(SimulationError::InvalidSchedule {
                component: self.components[component.0].name.clone(),
                time: deadline,
                now: self.now,
            });
        }
        self.withdraw(component)?;
        let detail = wait
            .items
            .iter()
            .map(|item| self.states[item.state.0].name().to_string())
            .collect::<Vec<String>>()
            .join(if wait.all { " and " } else { " or " });
        let target = &mut self.components[component.0];
        target.failed = false;
        if wait.mode.is_some() {
            target.mode = wait.mode;
        }
        target.pending = Some(Pending::Wait(PendingWait {
            items: wait.items,
            all: wait.all,
        }));
        self.record_component("wait", component, detail);
        self.pursue_wait(component, deadline)
    }

    /// Evaluates the wait, and enters the waiter lists when it is not yet
    /// satisfied.  A wait that is not satisfied fails at the deadline.
    pub(crate) fn pursue_wait(&mut self, component: ComponentId, deadline: f64) -> Result<(), SimulationError> {
        self.components[component.0].status = Status::Waiting;
        if self.is_satisfied(component, None) {
            return self.satisfy(component);
        }
        let items = match &self.components[component.0].pending {
            Some(Pending::Wait(wait)) => wait.items.clone(),
            _ => Vec::new(),
        };
        let mut entered: Vec<StateId> = Vec::new();
        for item in items.iter() {
            if entered.contains(&item.state) {
                continue;
            }
            // The lowest priority of the items on a state places the waiter
            let priority = items
                .iter()
                .filter(|other| other.state == item.state)
                .map(|other| other.priority)
                .fold(item.priority, f64::min);
            let waiters = self.states[item.state.0].waiters();
            if !self.queues[waiters.0].contains(component) {
                self.place(waiters, component, Placement::Sorted(priority))?;
            }
            entered.push(item.state);
        }
        self.schedule(component, deadline, 0.0, false)
    }

    /// Whether the wait of a component is satisfied.  `pulse` is the state
    /// being triggered, with the triggered value.
    fn is_satisfied(&self, component: ComponentId, pulse: Option<(StateId, &Value)>) -> bool {
        let wait = match &self.components[component.0].pending {
            Some(Pending::Wait(wait)) => wait,
            _ => return false,
        };
        let holds = |item: &WaitItem| {
            let pulse = pulse
                .filter(|(state, _)| *state == item.state)
                .map(|(_, value)| value);
            item.condition
                .holds(&self.states[item.state.0].value, pulse)
        };
        if wait.all {
            wait.items.iter().all(holds)
        } else {
            wait.items.iter().any(holds)
        }
    }

    fn satisfy(&mut self, component: ComponentId) -> Result<(), SimulationError> {
        self.leave_waiters(component);
        self.components[component.0].pending = None;
        self.schedule(component, self.now, 0.0, false)?;
        self.components[component.0].status = Status::Scheduled;
        self.record_component("wait honor", component, String::new());
        Ok(())
    }

    /// Leaves the waiter lists of the awaited states, keeping the wait.
    pub(crate) fn leave_waiters(&mut self, component: ComponentId) {
        let states: Vec<StateId> = match &self.components[component.0].pending {
            Some(Pending::Wait(wait)) => wait.items.iter().map(|item| item.state).collect(),
            _ => Vec::new(),
        };
        states.into_iter().for_each(|state| {
            let waiters = self.states[state.0].waiters();
            self.remove_member(waiters, component);
        });
    }

    pub(crate) fn retract_wait(&mut self, component: ComponentId, wait: &PendingWait) {
        wait.items.iter().for_each(|item| {
            let waiters = self.states[item.state.0].waiters();
            self.remove_member(waiters, component);
        });
    }

    /// The deadline of a wait fired before its conditions held.
    pub(crate) fn fail_wait(&mut self, component: ComponentId) -> Result<(), SimulationError> {
        if let Some(Pending::Wait(wait)) = self.components[component.0].pending.take() {
            self.retract_wait(component, &wait);
            self.components[component.0].failed = true;
            self.record_component("wait fail", component, String::new());
        }
        Ok(())
    }

    /// Releases the waiters of a state whose waits are now satisfied, from
    /// the head of the waiter list, up to `max` of them.
    fn scan_waiters(
        &mut self,
        state: StateId,
        max: Option<usize>,
        pulse: Option<&Value>,
    ) -> Result<usize, SimulationError> {
        let waiters = self.states[state.0].waiters();
        let members = self.queues[waiters.0].components();
        let mut released = 0;
        for component in members {
            if max.map_or(false, |max| released >= max) {
                break;
            }
            if self.components[component.0].status != Status::Waiting {
                continue;
            }
            if self.is_satisfied(component, pulse.map(|value| (state, value))) {
                self.satisfy(component)?;
                released += 1;
            }
        }
        Ok(released)
    }

    pub fn value(&self, state: StateId) -> Result<&Value, SimulationError> {
        Ok(self.state(state)?.get())
    }

    /// Set the value of a state, and release the waiters whose waits are
    /// now satisfied.
    pub fn set<V: Into<Value>>(&mut self, state: StateId, value: V) -> Result<(), SimulationError> {
        self.operation = "set";
        self.state(state)?;
        let value = value.into();
        let now = self.now;
        let target = &mut self.states[state.0];
        target.store(value.clone(), now);
        let subject = target.name().to_string();
        self.record("set", subject, value.to_string());
        self.scan_waiters(state, None, None)?;
        Ok(())
    }

    /// Pulse a state - set the value, release up to `max` waiters whose
    /// waits are satisfied, and return to the prior value.  The waiters
    /// that are not released keep waiting, even when the prior value would
    /// satisfy them.  Returns the number of released waiters.
    pub fn trigger<V: Into<Value>>(
        &mut self,
        state: StateId,
        value: V,
        max: Option<usize>,
    ) -> Result<usize, SimulationError> {
        self.operation = "trigger";
        self.state(state)?;
        let value = value.into();
        let now = self.now;
        let target = &mut self.states[state.0];
        let prior = target.value.clone();
        target.store(value.clone(), now);
        let subject = target.name().to_string();
        self.record("trigger", subject, value.to_string());
        let released = self.scan_waiters(state, max, Some(&value))?;
        self.states[state.0].store(prior, now);
        Ok(released)
    }

    /// Set a state back to its initial value.
    pub fn reset(&mut self, state: StateId) -> Result<(), SimulationError> {
        let initial = self.state(state)?.initial().clone();
        self.set(state, initial)
    }
}
