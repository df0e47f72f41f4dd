//! The simulator module provides the `Environment` - the logical clock,
//! the event calendar, and the arena of components, queues, resources, and
//! states.  The environment is the run loop of the simulation: it pops the
//! earliest calendar event, advances the clock to it, and steps the process
//! of the component the event belongs to.
//!
//! All operations on the simulated entities go through the environment,
//! which is passed explicitly to every process step.  The operations are
//! grouped by concern - component lifecycle (activate, hold, passivate,
//! standby, interrupt, resume, cancel), resource claims (request, release,
//! capacity changes), state signals (wait, set, trigger), and queue
//! membership.
//!
//! A main component, `ComponentId::MAIN`, represents the driving caller.
//! Running the simulation schedules main at the end of the run, and the run
//! ends when main is popped off the calendar - or when a process reactivates
//! main with `stop`.

use std::collections::BTreeMap;
use std::f64::INFINITY;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::components::naming::resolve_name;
use crate::components::{Component, ComponentId, Status};
use crate::input_modeling::DynRng;
use crate::monitor::Value;
use crate::queue::{Queue, QueueId};
use crate::resource::{Resource, ResourceId};
use crate::state::{State, StateId};
use crate::utils::errors::SimulationError;

pub(crate) mod calendar;
mod claims;
mod lifecycle;
mod membership;
mod signals;

pub use self::lifecycle::{ActivateOptions, HoldOptions};

use self::calendar::Calendar;

/// A record of a state-changing kernel operation, kept when record storage
/// is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRecord {
    pub time: f64,
    pub action: String,
    pub subject: String,
    pub detail: String,
}

fn default_environment_name() -> String {
    String::from("environment")
}

fn default_capacity() -> f64 {
    1.0
}

fn default_state_value() -> Value {
    Value::from(false)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    #[serde(default = "default_environment_name")]
    pub name: String,
    #[serde(default)]
    pub store_records: bool,
    /// Whether runs end urgently - ahead of other events at the end time
    #[serde(default)]
    pub run_urgent: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: default_environment_name(),
            store_records: false,
            run_urgent: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    pub name: String,
    #[serde(default = "default_capacity")]
    pub capacity: f64,
    #[serde(default)]
    pub anonymous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateConfig {
    pub name: String,
    #[serde(default = "default_state_value")]
    pub value: Value,
}

/// The layout of a simulation study - the environment settings, and the
/// queues, resources, and states to create up front.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub queues: Vec<QueueConfig>,
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
    #[serde(default)]
    pub states: Vec<StateConfig>,
}

/// The bounds of a run.  `until` is an absolute end time, and `duration` is
/// relative to the current time.  Without either, the run continues until
/// the calendar is exhausted, or a process calls `stop`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub until: Option<f64>,
    pub duration: Option<f64>,
    /// Overrides the `run_urgent` setting of the environment
    pub urgent: Option<bool>,
}

/// The `Environment` is the core of procsim, and includes everything needed
/// to run a simulation - the clock, the calendar, and the simulated
/// entities.  A caller-seeded random number generator may be attached for
/// the processes to draw from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    name: String,
    now: f64,
    #[serde(skip)]
    calendar: Calendar,
    components: Vec<Component>,
    queues: Vec<Queue>,
    resources: Vec<Resource>,
    states: Vec<State>,
    #[serde(skip)]
    current: ComponentId,
    #[serde(skip)]
    standby: Vec<ComponentId>,
    #[serde(skip)]
    pending_standby: Vec<ComponentId>,
    #[serde(skip)]
    names: BTreeMap<String, usize>,
    #[serde(skip)]
    store_records: bool,
    #[serde(skip)]
    records: Vec<SimulationRecord>,
    #[serde(skip)]
    run_urgent: bool,
    #[serde(skip)]
    operation: &'static str,
    #[serde(skip)]
    rng: Option<DynRng>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::post(SimulationConfig::default())
    }
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// This constructor method creates an environment from a supplied
    /// configuration, with the declared queues, resources, and states.
    pub fn post(config: SimulationConfig) -> Self {
        let mut env = Self {
            name: config.environment.name,
            now: 0.0,
            calendar: Calendar::default(),
            components: Vec::new(),
            queues: Vec::new(),
            resources: Vec::new(),
            states: Vec::new(),
            current: ComponentId::MAIN,
            standby: Vec::new(),
            pending_standby: Vec::new(),
            names: BTreeMap::new(),
            store_records: config.environment.store_records,
            records: Vec::new(),
            run_urgent: config.environment.run_urgent,
            operation: "post",
            rng: None,
        };
        let main = env.add_component("main", None);
        env.components[main.0].status = Status::Current;
        config.queues.iter().for_each(|queue| {
            env.create_queue(&queue.name);
        });
        config.resources.iter().for_each(|resource| {
            env.create_resource(&resource.name, resource.capacity, resource.anonymous);
        });
        config.states.into_iter().for_each(|state| {
            env.create_state(&state.name, state.value);
        });
        env
    }

    /// This constructor method creates an environment from a YAML layout.
    pub fn post_yaml(layout: &str) -> Result<Self, SimulationError> {
        Ok(Self::post(serde_yaml::from_str(layout)?))
    }

    /// This constructor method creates an environment from a JSON layout.
    pub fn post_json(layout: &str) -> Result<Self, SimulationError> {
        Ok(Self::post(serde_json::from_str(layout)?))
    }

    /// Attach a caller-seeded random number generator.  The environment
    /// never seeds or advances it.
    pub fn with_rng(mut self, rng: DynRng) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn set_rng(&mut self, rng: DynRng) {
        self.rng = Some(rng);
    }

    pub fn rng(&self) -> Option<DynRng> {
        self.rng.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// An accessor method for the simulation clock.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// The component whose process is running - main, between steps.
    pub fn current(&self) -> ComponentId {
        self.current
    }

    /// The time of the next calendar event, if any.
    pub fn peek(&self) -> Option<f64> {
        self.calendar.peek_time()
    }

    pub fn component(&self, component: ComponentId) -> Result<&Component, SimulationError> {
        self.components
            .get(component.0)
            .ok_or(SimulationError::ComponentNotFound)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component_id(&self, name: &str) -> Result<ComponentId, SimulationError> {
        Ok(self
            .components
            .iter()
            .find(|component| component.name == name)
            .ok_or(SimulationError::ComponentNotFound)?
            .id)
    }

    pub fn queue(&self, queue: QueueId) -> Result<&Queue, SimulationError> {
        self.queues.get(queue.0).ok_or(SimulationError::QueueNotFound)
    }

    pub fn queue_mut(&mut self, queue: QueueId) -> Result<&mut Queue, SimulationError> {
        self.queues
            .get_mut(queue.0)
            .ok_or(SimulationError::QueueNotFound)
    }

    pub fn queues(&self) -> &[Queue] {
        &self.queues
    }

    pub fn queue_id(&self, name: &str) -> Result<QueueId, SimulationError> {
        Ok(self
            .queues
            .iter()
            .find(|queue| queue.name() == name)
            .ok_or(SimulationError::QueueNotFound)?
            .id())
    }

    pub fn resource(&self, resource: ResourceId) -> Result<&Resource, SimulationError> {
        self.resources
            .get(resource.0)
            .ok_or(SimulationError::ResourceNotFound)
    }

    pub fn resource_mut(&mut self, resource: ResourceId) -> Result<&mut Resource, SimulationError> {
        self.resources
            .get_mut(resource.0)
            .ok_or(SimulationError::ResourceNotFound)
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource_id(&self, name: &str) -> Result<ResourceId, SimulationError> {
        Ok(self
            .resources
            .iter()
            .find(|resource| resource.name() == name)
            .ok_or(SimulationError::ResourceNotFound)?
            .id())
    }

    pub fn state(&self, state: StateId) -> Result<&State, SimulationError> {
        self.states.get(state.0).ok_or(SimulationError::StateNotFound)
    }

    pub fn state_mut(&mut self, state: StateId) -> Result<&mut State, SimulationError> {
        self.states
            .get_mut(state.0)
            .ok_or(SimulationError::StateNotFound)
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state_id(&self, name: &str) -> Result<StateId, SimulationError> {
        Ok(self
            .states
            .iter()
            .find(|state| state.name() == name)
            .ok_or(SimulationError::StateNotFound)?
            .id())
    }

    pub fn create_queue(&mut self, name: &str) -> QueueId {
        let id = QueueId(self.queues.len());
        let name = resolve_name(&mut self.names, name);
        self.queues.push(Queue::new(id, name, self.now));
        id
    }

    /// Create a resource, with its requesters and claimers queues.
    pub fn create_resource(&mut self, name: &str, capacity: f64, anonymous: bool) -> ResourceId {
        let id = ResourceId(self.resources.len());
        let name = resolve_name(&mut self.names, name);
        let requesters = self.create_queue(&format!("requesters of {}", name));
        let claimers = self.create_queue(&format!("claimers of {}", name));
        self.resources.push(Resource::new(
            id, name, capacity, anonymous, requesters, claimers, self.now,
        ));
        id
    }

    /// Create a state, with its waiters queue.
    pub fn create_state<V: Into<Value>>(&mut self, name: &str, value: V) -> StateId {
        let id = StateId(self.states.len());
        let name = resolve_name(&mut self.names, name);
        let waiters = self.create_queue(&format!("waiters of {}", name));
        self.states
            .push(State::new(id, name, value.into(), waiters, self.now));
        id
    }

    pub fn store_records(&mut self, store_records: bool) {
        self.store_records = store_records;
    }

    /// The records of the kernel operations, when record storage is on.
    pub fn records(&self) -> &Vec<SimulationRecord> {
        &self.records
    }

    /// The records about a single component, queue, resource, or state.
    pub fn records_of(&self, subject: &str) -> Vec<&SimulationRecord> {
        self.records
            .iter()
            .filter(|record| record.subject == subject)
            .collect()
    }

    /// A YAML snapshot of the clock and the simulated entities, including
    /// the fields of every process.
    pub fn get_yaml(&self) -> Result<String, SimulationError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// A JSON snapshot of the clock and the simulated entities, including
    /// the fields of every process.
    pub fn get_json(&self) -> Result<String, SimulationError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Run until the calendar is exhausted, or a process calls `stop`.
    pub fn run(&mut self) -> Result<(), SimulationError> {
        self.run_with(RunOptions::default())
    }

    /// Run until an absolute time.  The end of the run is scheduled when
    /// the run starts, so events a process schedules at exactly the end
    /// time are left for the next run.
    pub fn run_until(&mut self, until: f64) -> Result<(), SimulationError> {
        self.run_with(RunOptions {
            until: Some(until),
            ..RunOptions::default()
        })
    }

    /// Run for a duration, from the current time.
    pub fn run_for(&mut self, duration: f64) -> Result<(), SimulationError> {
        self.run_with(RunOptions {
            duration: Some(duration),
            ..RunOptions::default()
        })
    }

    pub fn run_with(&mut self, options: RunOptions) -> Result<(), SimulationError> {
        if self.current != ComponentId::MAIN {
            return Err(SimulationError::InvalidComponentState {
                component: self.components[self.current.0].name.clone(),
                status: Status::Current.to_string(),
                operation: "run",
            });
        }
        self.operation = "run";
        let till = match (options.until, options.duration) {
            (Some(until), _) => until,
            (None, Some(duration)) => self.now + duration,
            (None, None) => INFINITY,
        };
        let urgent = options.urgent.unwrap_or(self.run_urgent);
        self.schedule(ComponentId::MAIN, till, 0.0, urgent)?;
        self.components[ComponentId::MAIN.0].status = Status::Scheduled;
        info!(time = self.now, till, environment = %self.name, "run start");
        while self.components[ComponentId::MAIN.0].status != Status::Current {
            self.step()?;
        }
        info!(time = self.now, environment = %self.name, "run stop");
        Ok(())
    }

    /// End the current run, from within a process, by reactivating main.
    pub fn stop(&mut self) -> Result<(), SimulationError> {
        self.activate_with(
            ComponentId::MAIN,
            ActivateOptions {
                urgent: true,
                ..ActivateOptions::default()
            },
        )
    }

    /// The simulation step executes a single event - either a standby
    /// component due after the previous event, or the earliest event on
    /// the calendar.  A calendar event of a requesting or waiting
    /// component is its deadline, so the request or wait fails before the
    /// process continues.
    pub fn step(&mut self) -> Result<(), SimulationError> {
        if !self.pending_standby.is_empty() {
            let component = self.pending_standby.remove(0);
            if self.components[component.0].status == Status::Standby {
                return self.execute(component);
            }
            return Ok(());
        }
        if !self.standby.is_empty() {
            self.pending_standby = std::mem::take(&mut self.standby);
        }
        let (time, component) = match self.calendar.pop() {
            Some((key, component)) => (key.time, component),
            None if self.components[ComponentId::MAIN.0].status == Status::Scheduled => {
                (INFINITY, ComponentId::MAIN)
            }
            None => return Ok(()),
        };
        self.components[component.0].event_key = None;
        self.components[component.0].scheduled_time = INFINITY;
        // The clock stays put when a run without an end time runs dry
        if time.is_finite() {
            self.now = time;
        }
        match self.components[component.0].status {
            Status::Scheduled if component == ComponentId::MAIN => {
                self.components[component.0].status = Status::Current;
                self.current = ComponentId::MAIN;
                Ok(())
            }
            Status::Scheduled => self.execute(component),
            Status::Requesting => {
                self.fail_request(component)?;
                self.execute(component)
            }
            Status::Waiting => {
                self.fail_wait(component)?;
                self.execute(component)
            }
            status => Err(SimulationError::DeadlineRace {
                component: self.components[component.0].name.clone(),
                status: status.to_string(),
            }),
        }
    }

    /// Steps the process of a component.  A process that returns without
    /// suspending has ended.
    fn execute(&mut self, id: ComponentId) -> Result<(), SimulationError> {
        let component = &mut self.components[id.0];
        component.status = Status::Current;
        component.scheduled_time = INFINITY;
        let process = component.process.take();
        self.current = id;
        self.record_component("current", id, String::new());
        let mut process = match process {
            Some(process) => process,
            None => {
                self.current = ComponentId::MAIN;
                return self.end(id);
            }
        };
        self.operation = "step";
        let outcome = process.step(self, id);
        self.current = ComponentId::MAIN;
        if let Err(error) = outcome {
            let component = &mut self.components[id.0];
            component.process.get_or_insert(process);
            return Err(SimulationError::Aborted {
                time: self.now,
                component: component.name.clone(),
                operation: self.operation,
                source: Box::new(error),
            });
        }
        let status = self.components[id.0].status;
        match status {
            Status::Current => self.end(id),
            // Cancelled during its own step
            Status::Data => Ok(()),
            _ => {
                // A process replaced during the step takes over
                self.components[id.0].process.get_or_insert(process);
                Ok(())
            }
        }
    }

    fn end(&mut self, id: ComponentId) -> Result<(), SimulationError> {
        let component = &mut self.components[id.0];
        component.status = Status::Data;
        component.process = None;
        component.pending = None;
        component.interrupts.clear();
        self.record_component("end", id, String::new());
        self.release_all(id)
    }

    /// Puts a component on the calendar, replacing its previous event.
    /// Components scheduled at an infinite time stay off the calendar.
    pub(crate) fn schedule(
        &mut self,
        id: ComponentId,
        time: f64,
        priority: f64,
        urgent: bool,
    ) -> Result<(), SimulationError> {
        // Also rejects NaN
        if !(time >= self.now) {
            return Err(SimulationError::InvalidSchedule {
                component: self.components[id.0].name.clone(),
                time,
                now: self.now,
            });
        }
        self.unschedule(id);
        let key = if time.is_finite() {
            Some(self.calendar.insert(id, time, priority, urgent))
        } else {
            None
        };
        let component = &mut self.components[id.0];
        component.event_key = key;
        component.scheduled_time = time;
        Ok(())
    }

    pub(crate) fn unschedule(&mut self, id: ComponentId) {
        let component = &mut self.components[id.0];
        component.scheduled_time = INFINITY;
        if let Some(key) = component.event_key.take() {
            self.calendar.remove(&key);
        }
    }

    pub(crate) fn record(&mut self, action: &str, subject: String, detail: String) {
        debug!(
            time = self.now,
            subject = %subject,
            action = %action,
            detail = %detail,
            "simulation record"
        );
        if self.store_records {
            self.records.push(SimulationRecord {
                time: self.now,
                action: action.to_string(),
                subject,
                detail,
            });
        }
    }

    pub(crate) fn record_component(&mut self, action: &str, id: ComponentId, detail: String) {
        let subject = self.components[id.0].name.clone();
        self.record(action, subject, detail);
    }

    pub(crate) fn check_component(&self, id: ComponentId) -> Result<(), SimulationError> {
        self.component(id).map(|_| ())
    }

    pub(crate) fn invalid_state(&self, id: ComponentId, operation: &'static str) -> SimulationError {
        let component = &self.components[id.0];
        SimulationError::InvalidComponentState {
            component: component.name.clone(),
            status: component.status.to_string(),
            operation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_from_yaml() {
        let layout = r#"
environment:
  name: bank
  storeRecords: true
queues:
  - name: waitingline
resources:
  - name: clerks
    capacity: 3
  - name: parking
    anonymous: true
states:
  - name: worktodo
  - name: light
    value: red
"#;
        let env = Environment::post_yaml(layout).unwrap();
        assert_eq!(env.name(), "bank");
        let clerks = env.resource_id("clerks").unwrap();
        assert_eq!(env.resource(clerks).unwrap().capacity(), 3.0);
        let parking = env.resource_id("parking").unwrap();
        assert_eq!(env.resource(parking).unwrap().capacity(), 1.0);
        assert!(env.resource(parking).unwrap().is_anonymous());
        let worktodo = env.state_id("worktodo").unwrap();
        assert_eq!(env.state(worktodo).unwrap().get(), &Value::from(false));
        let light = env.state_id("light").unwrap();
        assert_eq!(env.state(light).unwrap().get(), &Value::from("red"));
        assert!(env.queue_id("waitingline").is_ok());
        assert!(env.queue_id("requesters of clerks").is_ok());
        assert!(matches!(
            env.queue_id("missing"),
            Err(SimulationError::QueueNotFound)
        ));
    }

    #[test]
    fn layout_from_json() {
        let layout = r#"{"resources": [{"name": "pumps", "capacity": 2}], "states": [{"name": "level", "value": 5}]}"#;
        let env = Environment::post_json(layout).unwrap();
        assert_eq!(env.name(), "environment");
        let level = env.state_id("level").unwrap();
        assert_eq!(env.state(level).unwrap().get(), &Value::from(5));
    }

    #[test]
    fn main_is_the_first_component() {
        let env = Environment::new();
        let main = env.component(ComponentId::MAIN).unwrap();
        assert_eq!(main.name(), "main");
        assert_eq!(main.status(), Status::Current);
        assert_eq!(env.component_id("main").unwrap(), ComponentId::MAIN);
        assert_eq!(env.current(), ComponentId::MAIN);
    }

    #[test]
    fn runs_without_events_advance_to_the_end_time() {
        let mut env = Environment::new();
        env.run_until(10.0).unwrap();
        assert_eq!(env.now(), 10.0);
        env.run_for(5.0).unwrap();
        assert_eq!(env.now(), 15.0);
        env.run().unwrap();
        assert_eq!(env.now(), 15.0);
        assert!(matches!(
            env.run_until(3.0),
            Err(SimulationError::InvalidSchedule { .. })
        ));
    }
}
