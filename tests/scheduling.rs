use std::cell::RefCell;
use std::rc::Rc;

use procsim::components::{ComponentId, Process, SerializableProcess, Status};
use procsim::queue::QueueId;
use procsim::resource::{Request, ResourceId};
use procsim::simulator::{ActivateOptions, Environment, HoldOptions};
use procsim::utils::errors::SimulationError;
use serde::Serialize;

type Log = Rc<RefCell<Vec<(f64, String)>>>;

fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn times(log: &Log) -> Vec<f64> {
    log.borrow().iter().map(|(time, _)| *time).collect()
}

fn names(log: &Log) -> Vec<String> {
    log.borrow().iter().map(|(_, name)| name.clone()).collect()
}

/// Logs every step, then holds for the interval until no ticks remain
#[derive(Debug, Clone, Serialize, SerializableProcess)]
#[serde(rename_all = "camelCase")]
struct Ticker {
    interval: f64,
    remaining: usize,
    #[serde(skip)]
    log: Log,
}

impl Ticker {
    fn new(interval: f64, remaining: usize, log: &Log) -> Self {
        Self {
            interval,
            remaining,
            log: log.clone(),
        }
    }
}

impl Process for Ticker {
    fn step(&mut self, env: &mut Environment, me: ComponentId) -> Result<(), SimulationError> {
        let name = env.component(me)?.name().to_string();
        self.log.borrow_mut().push((env.now(), name));
        if self.remaining == 0 {
            return Ok(());
        }
        self.remaining -= 1;
        env.hold(me, self.interval)
    }
}

/// Stands by until it has polled a number of times
#[derive(Debug, Clone, Serialize, SerializableProcess)]
struct Watcher {
    polls: usize,
    #[serde(skip)]
    log: Log,
}

impl Process for Watcher {
    fn step(&mut self, env: &mut Environment, me: ComponentId) -> Result<(), SimulationError> {
        self.log.borrow_mut().push((env.now(), String::from("poll")));
        self.polls -= 1;
        if self.polls == 0 {
            return Ok(());
        }
        env.standby(me)
    }
}

#[derive(Debug, Clone, Serialize, SerializableProcess)]
struct Stopper {
    phase: usize,
}

impl Process for Stopper {
    fn step(&mut self, env: &mut Environment, me: ComponentId) -> Result<(), SimulationError> {
        self.phase += 1;
        match self.phase {
            1 => env.hold(me, 3.0),
            _ => {
                env.stop()?;
                env.hold(me, 1.0)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, SerializableProcess)]
struct Occupant {
    phase: usize,
    resource: ResourceId,
    queue: QueueId,
}

impl Process for Occupant {
    fn step(&mut self, env: &mut Environment, me: ComponentId) -> Result<(), SimulationError> {
        self.phase += 1;
        match self.phase {
            1 => {
                env.enter(self.queue, me)?;
                env.request(me, Request::one(self.resource, 1.0))
            }
            _ => env.hold(me, 10.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, SerializableProcess)]
struct Canceller {
    target: ComponentId,
    done: bool,
}

impl Process for Canceller {
    fn step(&mut self, env: &mut Environment, me: ComponentId) -> Result<(), SimulationError> {
        if self.done {
            return env.cancel(self.target);
        }
        self.done = true;
        env.hold(me, 2.0)
    }
}

#[derive(Debug, Clone, Serialize, SerializableProcess)]
struct Backwards {}

impl Process for Backwards {
    fn step(&mut self, env: &mut Environment, me: ComponentId) -> Result<(), SimulationError> {
        env.hold(me, -1.0)
    }
}

#[test]
fn holds_resume_at_the_exact_time() -> Result<(), SimulationError> {
    let log = new_log();
    let mut env = Environment::new();
    let ticker = env.spawn(Ticker::new(1.5, 3, &log))?;
    env.run()?;
    assert_eq!(times(&log), vec![0.0, 1.5, 3.0, 4.5]);
    assert_eq!(env.status(ticker)?, Status::Data);
    assert_eq!(env.now(), 4.5);
    assert!(env.component(ticker)?.process().is_none());
    Ok(())
}

#[test]
fn simultaneous_events_follow_priority_urgency_and_order() -> Result<(), SimulationError> {
    let log = new_log();
    let mut env = Environment::new();
    env.spawn_named("a", Ticker::new(1.0, 0, &log))?;
    env.spawn_named("b", Ticker::new(1.0, 0, &log))?;
    env.spawn_named("c", Ticker::new(1.0, 0, &log))?;
    env.spawn_with(
        Some("d"),
        Ticker::new(1.0, 0, &log),
        ActivateOptions {
            urgent: true,
            ..ActivateOptions::default()
        },
    )?;
    env.spawn_with(
        Some("e"),
        Ticker::new(1.0, 0, &log),
        ActivateOptions {
            priority: -1.0,
            ..ActivateOptions::default()
        },
    )?;
    env.run()?;
    assert_eq!(names(&log), vec!["e", "d", "a", "b", "c"]);
    Ok(())
}

#[test]
fn unnamed_components_follow_the_process_type() -> Result<(), SimulationError> {
    let log = new_log();
    let mut env = Environment::new();
    let first = env.spawn(Ticker::new(1.0, 0, &log))?;
    let second = env.spawn(Ticker::new(1.0, 0, &log))?;
    let counted = env.spawn_named("clerk,", Ticker::new(1.0, 0, &log))?;
    assert_eq!(env.component(first)?.name(), "ticker.0");
    assert_eq!(env.component(second)?.name(), "ticker.1");
    assert_eq!(env.component(counted)?.name(), "clerk.1");
    Ok(())
}

#[test]
fn runs_end_at_the_requested_time() -> Result<(), SimulationError> {
    let log = new_log();
    let mut env = Environment::new();
    let ticker = env.spawn(Ticker::new(1.0, 100, &log))?;
    env.run_until(5.5)?;
    assert_eq!(env.now(), 5.5);
    assert_eq!(times(&log), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(env.status(ticker)?, Status::Scheduled);
    assert_eq!(env.scheduled_time(ticker)?, 6.0);
    env.run_for(2.0)?;
    assert_eq!(env.now(), 7.5);
    assert_eq!(log.borrow().len(), 8);
    Ok(())
}

#[test]
fn events_scheduled_at_the_end_time_wait_for_the_next_run() -> Result<(), SimulationError> {
    let log = new_log();
    let mut env = Environment::new();
    let ticker = env.spawn(Ticker::new(1.0, 100, &log))?;
    env.run_until(3.0)?;
    assert_eq!(env.now(), 3.0);
    assert_eq!(times(&log), vec![0.0, 1.0, 2.0]);
    assert_eq!(env.scheduled_time(ticker)?, 3.0);
    env.run_until(4.0)?;
    assert_eq!(times(&log), vec![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(env.scheduled_time(ticker)?, 4.0);
    Ok(())
}

#[test]
fn stop_ends_the_run_from_a_process() -> Result<(), SimulationError> {
    let mut env = Environment::new();
    let stopper = env.spawn(Stopper { phase: 0 })?;
    env.run()?;
    assert_eq!(env.now(), 3.0);
    assert_eq!(env.current(), ComponentId::MAIN);
    assert_eq!(env.scheduled_time(stopper)?, 4.0);
    Ok(())
}

#[test]
fn standby_runs_after_every_event() -> Result<(), SimulationError> {
    let ticks = new_log();
    let polls = new_log();
    let mut env = Environment::new();
    env.spawn(Ticker::new(1.0, 2, &ticks))?;
    let watcher = env.spawn(Watcher {
        polls: 3,
        log: polls.clone(),
    })?;
    env.run()?;
    assert_eq!(times(&ticks), vec![0.0, 1.0, 2.0]);
    assert_eq!(times(&polls), vec![0.0, 1.0, 2.0]);
    assert_eq!(env.status(watcher)?, Status::Data);
    Ok(())
}

#[test]
fn hold_until_and_passivate() -> Result<(), SimulationError> {
    let log = new_log();
    let mut env = Environment::new();
    let ticker = env.spawn(Ticker::new(1.0, 5, &log))?;
    env.run_until(0.5)?;
    env.hold_with(
        ticker,
        HoldOptions {
            until: Some(3.0),
            ..HoldOptions::default()
        },
    )?;
    assert_eq!(env.scheduled_time(ticker)?, 3.0);
    env.run_until(1.0)?;
    env.passivate(ticker)?;
    assert_eq!(env.status(ticker)?, Status::Passive);
    assert_eq!(env.remaining_duration(ticker)?, 2.0);
    env.run_until(4.0)?;
    assert_eq!(times(&log), vec![0.0]);
    env.activate(ticker)?;
    env.run_until(4.5)?;
    assert_eq!(times(&log), vec![0.0, 4.0]);
    Ok(())
}

#[test]
fn cancel_releases_claims_and_memberships() -> Result<(), SimulationError> {
    let mut env = Environment::new();
    let line = env.create_queue("line");
    let desk = env.create_resource("desk", 1.0, false);
    let occupant = env.spawn(Occupant {
        phase: 0,
        resource: desk,
        queue: line,
    })?;
    env.spawn(Canceller {
        target: occupant,
        done: false,
    })?;
    env.run_until(1.0)?;
    assert_eq!(env.claimed_quantity(occupant, desk)?, 1.0);
    assert!(env.queue(line)?.contains(occupant));
    env.run()?;
    assert_eq!(env.now(), 2.0);
    assert_eq!(env.status(occupant)?, Status::Data);
    assert_eq!(env.resource(desk)?.claimed_quantity(), 0.0);
    assert!(env.queue(line)?.is_empty());
    assert_eq!(env.count(occupant)?, 0);
    Ok(())
}

#[test]
fn process_errors_abort_the_run() -> Result<(), SimulationError> {
    let mut env = Environment::new();
    env.spawn_named("backwards", Backwards {})?;
    match env.run() {
        Err(SimulationError::Aborted {
            component, source, ..
        }) => {
            assert_eq!(component, "backwards");
            assert!(matches!(*source, SimulationError::InvalidSchedule { .. }));
        }
        other => panic!("expected an aborted run, got {:?}", other),
    }
    Ok(())
}

#[test]
fn illegal_operations_are_rejected() -> Result<(), SimulationError> {
    let mut env = Environment::new();
    let widget = env.create_component("widget");
    assert!(matches!(
        env.activate(widget),
        Err(SimulationError::InvalidComponentState { .. })
    ));
    assert!(matches!(
        env.hold(ComponentId::MAIN, 1.0),
        Err(SimulationError::InvalidComponentState { .. })
    ));
    assert!(matches!(
        env.cancel(ComponentId::MAIN),
        Err(SimulationError::InvalidComponentState { .. })
    ));
    assert!(matches!(
        env.interrupt(widget),
        Err(SimulationError::InvalidComponentState { .. })
    ));
    Ok(())
}
