//! The components module provides the bookkeeping of the simulated
//! processes.  A `Component` carries its identity, its status in the
//! process state machine, its place on the calendar, its resource claims,
//! its queue memberships, its interrupt stack, and the `Process` that
//! drives it.  Components live in the arena of the `Environment`, and are
//! addressed by `ComponentId` handles.

use std::collections::BTreeMap;
use std::f64::INFINITY;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::queue::QueueId;
use crate::resource::{Claim, ResourceId};
use crate::simulator::calendar::EventKey;
use crate::state::WaitItem;

pub(crate) mod naming;
pub mod process;

pub use self::process::{Process, ProcessClone, SerializableProcess};
pub use procsim_derive::SerializableProcess;

/// A handle to a component in an `Environment`.  The handle of the main
/// component, which represents the driving caller, is `ComponentId::MAIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub(crate) usize);

impl ComponentId {
    pub const MAIN: ComponentId = ComponentId(0);

    pub fn index(&self) -> usize {
        self.0
    }
}

/// The status of a component in the process state machine.  A component
/// has exactly one status at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Data,
    Current,
    Scheduled,
    Passive,
    Requesting,
    Waiting,
    Standby,
    Interrupted,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            Status::Data => "data",
            Status::Current => "current",
            Status::Scheduled => "scheduled",
            Status::Passive => "passive",
            Status::Requesting => "requesting",
            Status::Waiting => "waiting",
            Status::Standby => "standby",
            Status::Interrupted => "interrupted",
        };
        write!(f, "{}", status)
    }
}

/// The failure deadline of a request or wait.  The deadline races the
/// grant of the request, or the satisfaction of the wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deadline {
    None,
    /// An absolute simulation time
    At(f64),
    /// A delay relative to the time of the request or wait
    Delay(f64),
}

impl Default for Deadline {
    fn default() -> Self {
        Deadline::None
    }
}

impl Deadline {
    pub(crate) fn time(&self, now: f64) -> f64 {
        match self {
            Deadline::None => INFINITY,
            Deadline::At(time) => *time,
            Deadline::Delay(delay) => now + delay,
        }
    }
}

/// An outstanding resource request.  `granted` follows `claims`, with the
/// quantity claimed so far by a greedy request.
#[derive(Debug, Clone)]
pub(crate) struct PendingRequest {
    pub(crate) claims: Vec<Claim>,
    pub(crate) granted: Vec<f64>,
    pub(crate) greedy: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct PendingWait {
    pub(crate) items: Vec<WaitItem>,
    pub(crate) all: bool,
}

/// What a requesting or waiting component is suspended on.  Interrupting
/// the component keeps it, so `resume` can pick the request or wait up
/// again.
#[derive(Debug, Clone)]
pub(crate) enum Pending {
    Request(PendingRequest),
    Wait(PendingWait),
}

/// A saved interrupt frame - the status before the interrupt, the time
/// that was left on the calendar, and the tie-break of the calendar event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct InterruptFrame {
    pub(crate) status: Status,
    pub(crate) remaining: f64,
    pub(crate) priority: f64,
    pub(crate) urgent: bool,
}

/// The `Component` is the bookkeeping half of a simulated process.  The
/// behavior half is its `Process`, which is absent for data components
/// that only take part in queues.
#[derive(Debug, Clone)]
pub struct Component {
    pub(crate) id: ComponentId,
    pub(crate) name: String,
    pub(crate) status: Status,
    pub(crate) mode: Option<String>,
    pub(crate) creation_time: f64,
    pub(crate) scheduled_time: f64,
    pub(crate) event_key: Option<EventKey>,
    pub(crate) remaining_duration: f64,
    pub(crate) failed: bool,
    pub(crate) claims: BTreeMap<ResourceId, f64>,
    pub(crate) memberships: Vec<QueueId>,
    pub(crate) pending: Option<Pending>,
    pub(crate) interrupts: Vec<InterruptFrame>,
    pub(crate) process: Option<Box<dyn Process>>,
}

impl Component {
    pub(crate) fn new(
        id: ComponentId,
        name: String,
        process: Option<Box<dyn Process>>,
        now: f64,
    ) -> Self {
        Self {
            id,
            name,
            status: Status::Data,
            mode: None,
            creation_time: now,
            scheduled_time: INFINITY,
            event_key: None,
            remaining_duration: 0.0,
            failed: false,
            claims: BTreeMap::new(),
            memberships: Vec::new(),
            pending: None,
            interrupts: Vec::new(),
            process,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The creation order of the component - main is 0.
    pub fn sequence_number(&self) -> usize {
        self.id.0
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn mode(&self) -> Option<&str> {
        self.mode.as_deref()
    }

    pub fn creation_time(&self) -> f64 {
        self.creation_time
    }

    /// The time of the next calendar event of the component - the end of a
    /// hold, or the deadline of a request or wait.  Infinite when the
    /// component is not on the calendar.
    pub fn scheduled_time(&self) -> f64 {
        self.scheduled_time
    }

    /// The time that was left on the calendar when the component was last
    /// interrupted or passivated.
    pub fn remaining_duration(&self) -> f64 {
        self.remaining_duration
    }

    /// Whether the most recent request or wait ended through its deadline.
    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn claims(&self) -> &BTreeMap<ResourceId, f64> {
        &self.claims
    }

    pub fn memberships(&self) -> &[QueueId] {
        &self.memberships
    }

    pub fn interrupt_depth(&self) -> usize {
        self.interrupts.len()
    }

    pub fn process(&self) -> Option<&dyn Process> {
        self.process.as_deref()
    }

    pub fn is_data(&self) -> bool {
        self.status == Status::Data
    }

    pub fn is_current(&self) -> bool {
        self.status == Status::Current
    }

    pub fn is_scheduled(&self) -> bool {
        self.status == Status::Scheduled
    }

    pub fn is_passive(&self) -> bool {
        self.status == Status::Passive
    }

    pub fn is_requesting(&self) -> bool {
        self.status == Status::Requesting
    }

    pub fn is_waiting(&self) -> bool {
        self.status == Status::Waiting
    }

    pub fn is_standby(&self) -> bool {
        self.status == Status::Standby
    }

    pub fn is_interrupted(&self) -> bool {
        self.status == Status::Interrupted
    }
}

impl Serialize for Component {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let claims: Vec<(ResourceId, f64)> = self
            .claims
            .iter()
            .map(|(resource, quantity)| (*resource, *quantity))
            .collect();
        let mut component = serializer.serialize_map(None)?;
        component.serialize_entry("id", &self.id)?;
        component.serialize_entry("name", &self.name)?;
        component.serialize_entry("status", &self.status)?;
        component.serialize_entry("mode", &self.mode)?;
        component.serialize_entry("creationTime", &self.creation_time)?;
        component.serialize_entry("scheduledTime", &self.scheduled_time)?;
        component.serialize_entry("claims", &claims)?;
        component.serialize_entry("queues", &self.memberships)?;
        component.serialize_entry("interruptDepth", &self.interrupts.len())?;
        if let Some(process) = &self.process {
            component.serialize_entry("type", process.get_type())?;
            component.serialize_entry("process", &SerializableProcess::serialize(process.as_ref()))?;
        }
        component.end()
    }
}
