use super::Environment;
use crate::components::naming::{default_name, resolve_name};
use crate::components::{Component, ComponentId, InterruptFrame, Pending, Process, Status};
use crate::utils::errors::SimulationError;

/// The options of a hold.  `until` is an absolute time, and takes
/// precedence over `duration`.
#[derive(Debug, Clone, Default)]
pub struct HoldOptions {
    pub duration: Option<f64>,
    pub until: Option<f64>,
    pub urgent: bool,
    pub priority: f64,
    pub mode: Option<String>,
}

/// The options of an activation.  The activation time is `at` (the current
/// time by default) plus `delay`.  A replacement `process` takes over from
/// the current one.  With `keep_request` or `keep_wait`, a requesting or
/// waiting component keeps its request or wait, and the activation time
/// becomes its new deadline.
#[derive(Debug, Clone, Default)]
pub struct ActivateOptions {
    pub at: Option<f64>,
    pub delay: Option<f64>,
    pub urgent: bool,
    pub priority: f64,
    pub process: Option<Box<dyn Process>>,
    pub mode: Option<String>,
    pub keep_request: bool,
    pub keep_wait: bool,
}

impl Environment {
    fn add_component_named(&mut self, name: String, process: Option<Box<dyn Process>>) -> ComponentId {
        let id = ComponentId(self.components.len());
        let name = resolve_name(&mut self.names, &name);
        self.components
            .push(Component::new(id, name, process, self.now));
        self.record_component("create", id, String::new());
        id
    }

    pub(crate) fn add_component(&mut self, name: &str, process: Option<Box<dyn Process>>) -> ComponentId {
        self.add_component_named(name.to_string(), process)
    }

    /// Create a data component without a process, for queue membership.
    pub fn create_component(&mut self, name: &str) -> ComponentId {
        self.add_component(name, None)
    }

    /// Create a data component with a process, without activating it.
    /// Unnamed components are named after their process type.
    pub fn create_process<P: Process + 'static>(&mut self, name: Option<&str>, process: P) -> ComponentId {
        let name = match name {
            Some(name) => name.to_string(),
            None => default_name(process.get_type()),
        };
        self.add_component_named(name, Some(Box::new(process)))
    }

    /// Create a component with a process, and activate it now.
    pub fn spawn<P: Process + 'static>(&mut self, process: P) -> Result<ComponentId, SimulationError> {
        self.spawn_with(None, process, ActivateOptions::default())
    }

    pub fn spawn_named<P: Process + 'static>(
        &mut self,
        name: &str,
        process: P,
    ) -> Result<ComponentId, SimulationError> {
        self.spawn_with(Some(name), process, ActivateOptions::default())
    }

    pub fn spawn_with<P: Process + 'static>(
        &mut self,
        name: Option<&str>,
        process: P,
        options: ActivateOptions,
    ) -> Result<ComponentId, SimulationError> {
        let id = self.create_process(name, process);
        self.activate_with(id, options)?;
        Ok(id)
    }

    pub fn status(&self, component: ComponentId) -> Result<Status, SimulationError> {
        Ok(self.component(component)?.status)
    }

    /// Whether the most recent request or wait of the component ended
    /// through its deadline.
    pub fn failed(&self, component: ComponentId) -> Result<bool, SimulationError> {
        Ok(self.component(component)?.failed)
    }

    pub fn request_failed(&self, component: ComponentId) -> Result<bool, SimulationError> {
        self.failed(component)
    }

    pub fn scheduled_time(&self, component: ComponentId) -> Result<f64, SimulationError> {
        Ok(self.component(component)?.scheduled_time)
    }

    pub fn remaining_duration(&self, component: ComponentId) -> Result<f64, SimulationError> {
        Ok(self.component(component)?.remaining_duration)
    }

    /// Override the time left on the calendar, as used when an interrupted
    /// hold resumes.
    pub fn set_remaining_duration(
        &mut self,
        component: ComponentId,
        duration: f64,
    ) -> Result<(), SimulationError> {
        self.check_component(component)?;
        self.components[component.0].remaining_duration = duration;
        Ok(())
    }

    pub fn mode(&self, component: ComponentId) -> Result<Option<&str>, SimulationError> {
        Ok(self.component(component)?.mode())
    }

    /// Set the mode label of a component.  The mode is only reported, and
    /// has no effect on scheduling.
    pub fn set_mode(&mut self, component: ComponentId, mode: &str) -> Result<(), SimulationError> {
        self.check_component(component)?;
        self.components[component.0].mode = Some(mode.to_string());
        self.record_component("mode", component, mode.to_string());
        Ok(())
    }

    fn apply_mode(&mut self, component: ComponentId, mode: Option<String>) {
        if mode.is_some() {
            self.components[component.0].mode = mode;
        }
    }

    /// Hold, passivate, standby, request, and wait suspend a component that
    /// is not main, and neither data nor interrupted.
    pub(crate) fn check_suspendable(
        &self,
        component: ComponentId,
        operation: &'static str,
    ) -> Result<(), SimulationError> {
        let status = self.component(component)?.status;
        if component == ComponentId::MAIN || status == Status::Data || status == Status::Interrupted
        {
            return Err(self.invalid_state(component, operation));
        }
        Ok(())
    }

    /// Takes a component out of whatever it is suspended on - the
    /// calendar, a pending request, a wait, or the standby list.  A
    /// pending request or wait is abandoned.
    pub(crate) fn withdraw(&mut self, component: ComponentId) -> Result<(), SimulationError> {
        self.unschedule(component);
        match self.components[component.0].status {
            Status::Requesting | Status::Waiting | Status::Interrupted => self.abandon(component)?,
            Status::Standby => self.leave_standby(component),
            _ => {}
        }
        self.components[component.0].interrupts.clear();
        Ok(())
    }

    fn abandon(&mut self, component: ComponentId) -> Result<(), SimulationError> {
        match self.components[component.0].pending.take() {
            Some(Pending::Request(request)) => {
                let resources = self.retract_request(component, &request);
                self.rescan_all(resources)
            }
            Some(Pending::Wait(wait)) => {
                self.retract_wait(component, &wait);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn leave_standby(&mut self, component: ComponentId) {
        self.standby.retain(|standby| *standby != component);
        self.pending_standby.retain(|standby| *standby != component);
    }

    pub fn hold(&mut self, component: ComponentId, duration: f64) -> Result<(), SimulationError> {
        self.hold_with(
            component,
            HoldOptions {
                duration: Some(duration),
                ..HoldOptions::default()
            },
        )
    }

    /// Suspend a component until the end of the hold.  A requesting,
    /// waiting, or standby component leaves what it was suspended on.
    pub fn hold_with(&mut self, component: ComponentId, options: HoldOptions) -> Result<(), SimulationError> {
        self.operation = "hold";
        self.check_suspendable(component, "hold")?;
        let time = match options.until {
            Some(until) => until,
            None => self.now + options.duration.unwrap_or(0.0),
        };
        if !(time >= self.now) {
            return Err(SimulationError::InvalidSchedule {
                component: self.components[component.0].name.clone(),
                time,
                now: self.now,
            });
        }
        self.withdraw(component)?;
        self.apply_mode(component, options.mode);
        self.schedule(component, time, options.priority, options.urgent)?;
        self.components[component.0].status = Status::Scheduled;
        self.record_component("hold", component, format!("scheduled for {}", time));
        Ok(())
    }

    /// Suspend a component until it is activated.  A scheduled component
    /// keeps the time that was left on the calendar as its remaining
    /// duration.
    pub fn passivate(&mut self, component: ComponentId) -> Result<(), SimulationError> {
        self.operation = "passivate";
        self.check_suspendable(component, "passivate")?;
        let was = &self.components[component.0];
        let remaining = if was.status == Status::Scheduled {
            Some(was.scheduled_time - self.now)
        } else {
            None
        };
        self.withdraw(component)?;
        let component_mut = &mut self.components[component.0];
        component_mut.status = Status::Passive;
        if let Some(remaining) = remaining {
            component_mut.remaining_duration = remaining;
        }
        self.record_component("passivate", component, String::new());
        Ok(())
    }

    /// Suspend a component until after the next event, without advancing
    /// the clock.
    pub fn standby(&mut self, component: ComponentId) -> Result<(), SimulationError> {
        self.operation = "standby";
        self.check_suspendable(component, "standby")?;
        self.withdraw(component)?;
        self.components[component.0].status = Status::Standby;
        self.standby.push(component);
        self.record_component("standby", component, String::new());
        Ok(())
    }

    pub fn activate(&mut self, component: ComponentId) -> Result<(), SimulationError> {
        self.activate_with(component, ActivateOptions::default())
    }

    /// Schedule a component.  A component that is suspended on something
    /// else leaves it, and an interrupted component drops its interrupts.
    pub fn activate_with(
        &mut self,
        component: ComponentId,
        options: ActivateOptions,
    ) -> Result<(), SimulationError> {
        self.operation = "activate";
        let target = self.component(component)?;
        let status = target.status;
        if status == Status::Data
            && component != ComponentId::MAIN
            && target.process.is_none()
            && options.process.is_none()
        {
            return Err(self.invalid_state(component, "activate"));
        }
        let time = options.at.unwrap_or(self.now) + options.delay.unwrap_or(0.0);
        if !(time >= self.now) {
            return Err(SimulationError::InvalidSchedule {
                component: target.name.clone(),
                time,
                now: self.now,
            });
        }
        if (options.keep_request && status == Status::Requesting)
            || (options.keep_wait && status == Status::Waiting)
        {
            self.apply_mode(component, options.mode);
            self.schedule(component, time, options.priority, options.urgent)?;
            self.record_component("activate", component, format!("deadline at {}", time));
            return Ok(());
        }
        self.withdraw(component)?;
        if let Some(process) = options.process {
            self.components[component.0].process = Some(process);
        }
        self.apply_mode(component, options.mode);
        self.schedule(component, time, options.priority, options.urgent)?;
        self.components[component.0].status = Status::Scheduled;
        self.record_component("activate", component, format!("scheduled for {}", time));
        Ok(())
    }

    /// Terminate a component.  The component leaves the calendar, its
    /// pending request or wait, its resource claims, and every queue, and
    /// becomes a data component without a process.
    pub fn cancel(&mut self, component: ComponentId) -> Result<(), SimulationError> {
        self.operation = "cancel";
        self.check_component(component)?;
        if component == ComponentId::MAIN {
            return Err(self.invalid_state(component, "cancel"));
        }
        self.withdraw(component)?;
        let target = &mut self.components[component.0];
        target.status = Status::Data;
        target.process = None;
        target.pending = None;
        self.release_all(component)?;
        let memberships = self.components[component.0].memberships.clone();
        memberships.into_iter().for_each(|queue| {
            self.remove_member(queue, component);
        });
        self.record_component("cancel", component, String::new());
        Ok(())
    }

    /// Interrupt a scheduled, requesting, waiting, passive, or standby
    /// component.  The component leaves the calendar and the pending lists,
    /// but keeps its request or wait, to be picked up again on `resume`.
    /// Interrupting an interrupted component nests, and takes another
    /// `resume` to undo.
    pub fn interrupt(&mut self, component: ComponentId) -> Result<(), SimulationError> {
        self.operation = "interrupt";
        let status = self.component(component)?.status;
        if component == ComponentId::MAIN || status == Status::Current || status == Status::Data {
            return Err(self.invalid_state(component, "interrupt"));
        }
        if status == Status::Interrupted {
            let target = &mut self.components[component.0];
            if let Some(frame) = target.interrupts.last().copied() {
                target.interrupts.push(frame);
            }
            let depth = target.interrupts.len();
            self.record_component("interrupt", component, format!("level {}", depth));
            return Ok(());
        }
        let target = &self.components[component.0];
        let remaining = match status {
            Status::Scheduled | Status::Requesting | Status::Waiting => target.scheduled_time - self.now,
            Status::Passive => target.remaining_duration,
            _ => 0.0,
        };
        let (priority, urgent) = target
            .event_key
            .map_or((0.0, false), |key| (key.priority, key.urgent));
        self.unschedule(component);
        match status {
            Status::Requesting => {
                let resources = self.leave_requesters(component);
                self.rescan_all(resources)?;
            }
            Status::Waiting => self.leave_waiters(component),
            Status::Standby => self.leave_standby(component),
            _ => {}
        }
        let target = &mut self.components[component.0];
        target.interrupts.push(InterruptFrame {
            status,
            remaining,
            priority,
            urgent,
        });
        target.status = Status::Interrupted;
        target.remaining_duration = remaining;
        self.record_component("interrupt", component, format!("was {}", status));
        Ok(())
    }

    /// Undo one interrupt.  Undoing the last interrupt re-establishes the
    /// status from before the interrupts - a hold continues for its
    /// remaining duration, and a request or wait is pursued again, with
    /// the remaining time to its deadline.
    pub fn resume(&mut self, component: ComponentId) -> Result<(), SimulationError> {
        self.operation = "resume";
        let target = self.component(component)?;
        if target.status != Status::Interrupted || target.interrupts.is_empty() {
            return Err(SimulationError::InterruptBalance {
                component: target.name.clone(),
            });
        }
        let target = &mut self.components[component.0];
        let frame = target.interrupts.pop();
        let depth = target.interrupts.len();
        if depth > 0 {
            self.record_component("resume", component, format!("level {}", depth));
            return Ok(());
        }
        let remaining = target.remaining_duration;
        let status = frame.map_or(Status::Passive, |frame| frame.status);
        let (priority, urgent) = frame.map_or((0.0, false), |frame| (frame.priority, frame.urgent));
        let time = self.now + remaining;
        match status {
            Status::Scheduled => {
                self.schedule(component, time, priority, urgent)?;
                self.components[component.0].status = Status::Scheduled;
            }
            Status::Standby => {
                self.components[component.0].status = Status::Standby;
                self.standby.push(component);
            }
            Status::Requesting => self.pursue_request(component, time)?,
            Status::Waiting => self.pursue_wait(component, time)?,
            _ => self.components[component.0].status = Status::Passive,
        }
        self.record_component("resume", component, format!("to {}", status));
        Ok(())
    }
}
