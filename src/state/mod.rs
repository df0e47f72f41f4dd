//! The state module provides the condition signaling of the kernel.  A
//! `State` holds a value, and a queue of waiting components.  Each waiting
//! component waits for one or more conditions on one or more states - for
//! any of them (by default), or for all of them at once.
//!
//! Setting the value of a state releases the waiters whose conditions now
//! hold.  Triggering a state is a momentary pulse - the waiters that match
//! the triggered value are released, and the state then returns to its
//! prior value without releasing anyone else.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::components::Deadline;
use crate::monitor::{TimestampMonitor, Value};
use crate::queue::QueueId;

/// A handle to a state in an `Environment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(pub(crate) usize);

impl StateId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A condition on the value of a state.
#[derive(Clone)]
pub enum Condition {
    /// Holds while the value equals the given value
    Equals(Value),
    /// Holds while the predicate holds for the value
    Predicate(Rc<dyn Fn(&Value) -> bool>),
    /// Holds only during a trigger of the state with the given value
    Pulse(Value),
}

impl Condition {
    pub fn equals<V: Into<Value>>(value: V) -> Self {
        Condition::Equals(value.into())
    }

    pub fn predicate<F: Fn(&Value) -> bool + 'static>(predicate: F) -> Self {
        Condition::Predicate(Rc::new(predicate))
    }

    pub fn pulse<V: Into<Value>>(value: V) -> Self {
        Condition::Pulse(value.into())
    }

    /// Evaluates the condition against a state value.  `pulse` is the
    /// triggered value, while the state is being triggered.
    pub(crate) fn holds(&self, value: &Value, pulse: Option<&Value>) -> bool {
        match self {
            Condition::Equals(expected) => value == expected,
            Condition::Predicate(predicate) => predicate(value),
            Condition::Pulse(expected) => pulse == Some(expected),
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Equals(Value::from(true))
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Equals(value) => f.debug_tuple("Equals").field(value).finish(),
            Condition::Predicate(_) => f.write_str("Predicate"),
            Condition::Pulse(value) => f.debug_tuple("Pulse").field(value).finish(),
        }
    }
}

/// One item of a wait - a condition on a state, and the priority of the
/// waiter in the waiter list of that state (lower first).
#[derive(Debug, Clone)]
pub struct WaitItem {
    pub state: StateId,
    pub condition: Condition,
    pub priority: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Wait {
    pub(crate) items: Vec<WaitItem>,
    pub(crate) all: bool,
    pub(crate) deadline: Deadline,
    pub(crate) mode: Option<String>,
}

impl Wait {
    pub fn new() -> Self {
        Self::default()
    }

    /// A wait for a single condition on a single state.
    pub fn one(state: StateId, condition: Condition) -> Self {
        Self::new().on(state, condition)
    }

    pub fn on(self, state: StateId, condition: Condition) -> Self {
        self.on_with_priority(state, condition, 0.0)
    }

    pub fn on_with_priority(mut self, state: StateId, condition: Condition, priority: f64) -> Self {
        self.items.push(WaitItem {
            state,
            condition,
            priority,
        });
        self
    }

    /// Wait until all conditions hold at the same time, rather than any.
    pub fn all(mut self) -> Self {
        self.all = true;
        self
    }

    pub fn fail_at(mut self, time: f64) -> Self {
        self.deadline = Deadline::At(time);
        self
    }

    pub fn fail_delay(mut self, delay: f64) -> Self {
        self.deadline = Deadline::Delay(delay);
        self
    }

    pub fn mode(mut self, mode: &str) -> Self {
        self.mode = Some(mode.to_string());
        self
    }

    pub fn items(&self) -> &[WaitItem] {
        &self.items
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    id: StateId,
    name: String,
    pub(crate) value: Value,
    initial: Value,
    waiters: QueueId,
    value_monitor: TimestampMonitor,
}

impl State {
    pub(crate) fn new(id: StateId, name: String, value: Value, waiters: QueueId, now: f64) -> Self {
        Self {
            id,
            value_monitor: TimestampMonitor::new(&format!("Value of {}", name), value.clone(), now),
            name,
            initial: value.clone(),
            value,
            waiters,
        }
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> &Value {
        &self.value
    }

    pub fn initial(&self) -> &Value {
        &self.initial
    }

    /// The queue of components waiting on this state.
    pub fn waiters(&self) -> QueueId {
        self.waiters
    }

    pub fn value_monitor(&self) -> &TimestampMonitor {
        &self.value_monitor
    }

    pub fn value_monitor_mut(&mut self) -> &mut TimestampMonitor {
        &mut self.value_monitor
    }

    pub(crate) fn store(&mut self, value: Value, now: f64) {
        self.value_monitor.tally(value.clone(), now);
        self.value = value;
    }
}
