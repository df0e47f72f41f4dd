//! # Overview
//! "Procsim" provides a process-oriented discrete event simulation kernel.
//! Simulated activity is modeled as components, each driven by a process
//! that suspends and resumes at well-defined points - holding for a
//! duration, passivating, requesting resources, or waiting on states.
//!
//! This repository contains:
//!
//! * Simulator engine, with the logical clock, the event calendar, and the
//! run loop, passed explicitly to every process step.
//! * Components and the process state machine - activation, hold,
//! passivate, standby, interrupt, resume, and cancel.
//! * Queues with priority ordering and set algebra.
//! * Resources with all or nothing and greedy claims, and failure
//! deadlines.
//! * States with condition waits and momentary triggers.
//! * Monitors and output analysis, for statistics on tallied and
//! time-weighted observations.
//!
//! The kernel is deterministic - given the same caller-seeded random number
//! generator and the same sequence of operations, a run produces the same
//! results.
pub mod components;
pub mod input_modeling;
pub mod monitor;
pub mod output_analysis;
pub mod queue;
pub mod resource;
pub mod simulator;
pub mod state;
pub mod utils;
