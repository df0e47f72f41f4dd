use thiserror::Error;

/// `SimulationError` enumerates all possible errors returned by procsim
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Represents an attempt to schedule an event before the current time,
    /// including holds with a negative duration
    #[error("{component} cannot be scheduled at {time}, before the current time {now}")]
    InvalidSchedule {
        component: String,
        time: f64,
        now: f64,
    },

    /// Represents a release of more than the claimed quantity of a resource
    #[error("{component} cannot release {quantity} of {resource}, only {claimed} is claimed")]
    ClaimUnderflow {
        component: String,
        resource: String,
        quantity: f64,
        claimed: f64,
    },

    /// Represents a resume without a matching, outstanding interrupt
    #[error("{component} was resumed, but it is not interrupted")]
    InterruptBalance { component: String },

    /// Represents a duplicate queue entry, or the removal of a non-member
    #[error("{component} {reason} {queue}")]
    Membership {
        component: String,
        queue: String,
        reason: &'static str,
    },

    /// Represents an event firing for a component that no longer expects
    /// one - the success and deadline paths of a request or wait both fired
    #[error("An event fired for {component} while it was {status}, with no pending deadline")]
    DeadlineRace { component: String, status: String },

    /// Represents an operation that is not legal in the component status
    #[error("Cannot {operation} {component} while it is {status}")]
    InvalidComponentState {
        component: String,
        status: String,
        operation: &'static str,
    },

    /// Represents a negative quantity in a request or capacity change
    #[error("An invalid quantity {quantity} was specified for {resource}")]
    InvalidQuantity { resource: String, quantity: f64 },

    /// Represents histogram bins without a positive, finite width, or
    /// without a finite lower bound
    #[error("Histogram bins need a positive width and finite bounds, got lower {lower} and width {width}")]
    InvalidHistogram { lower: f64, width: f64 },

    /// Represents an operation requested on a component that does not exist
    #[error("A specified component cannot be found in the simulation")]
    ComponentNotFound,

    /// Represents an operation requested on a queue that does not exist
    #[error("A specified queue cannot be found in the simulation")]
    QueueNotFound,

    /// Represents an operation requested on a resource that does not exist
    #[error("A specified resource cannot be found in the simulation")]
    ResourceNotFound,

    /// Represents an operation requested on a state that does not exist
    #[error("A specified state cannot be found in the simulation")]
    StateNotFound,

    /// Represents an unrecoverable error raised while a process was running,
    /// with the simulation time, component, and operation at failure
    #[error("Simulation aborted at time {time}, in {operation} of {component}: {source}")]
    Aborted {
        time: f64,
        component: String,
        operation: &'static str,
        #[source]
        source: Box<SimulationError>,
    },

    /// Transparent serde_json errors
    #[error(transparent)]
    JSONError(#[from] serde_json::error::Error),

    /// Transparent serde_yaml errors
    #[error(transparent)]
    YAMLError(#[from] serde_yaml::Error),
}
