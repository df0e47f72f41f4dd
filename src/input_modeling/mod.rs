//! The input modeling module provides the handle through which processes
//! share a caller-seeded random number generator.  The kernel itself only
//! consumes sampled numbers - durations, quantities, and values - and never
//! seeds or advances the generator.

pub mod dynamic_rng;

pub use dynamic_rng::{dyn_rng, DynRng, SimulationRng};
