use std::fmt::Debug;

use super::ComponentId;
use crate::simulator::Environment;
use crate::utils::errors::SimulationError;

pub trait ProcessClone {
    fn clone_box(&self) -> Box<dyn Process>;
}

impl<T> ProcessClone for T
where
    T: 'static + Process + Clone,
{
    fn clone_box(&self) -> Box<dyn Process> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Process> {
    fn clone(&self) -> Box<dyn Process> {
        self.clone_box()
    }
}

pub trait SerializableProcess {
    fn get_type(&self) -> &'static str {
        "Process"
    }
    fn serialize(&self) -> serde_yaml::Value {
        serde_yaml::Value::Null
    }
}

/// The `Process` trait defines the behavior of a component.  A process is
/// an explicit state machine: each call to `step` runs the process from
/// where it last suspended up to its next suspension point, and returns.
///
/// Within `step`, the process suspends by calling one of the suspension
/// operations of the environment on itself - `hold`, `passivate`,
/// `standby`, `request`, or `wait` - and then returning.  Returning
/// without suspending ends the process: the component releases its
/// resource claims and becomes a data component.  The fields of the
/// process record where it stopped, so the next `step` knows where to
/// continue.
pub trait Process: ProcessClone + SerializableProcess + Debug {
    fn step(&mut self, env: &mut Environment, me: ComponentId) -> Result<(), SimulationError>;
}
