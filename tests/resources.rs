use std::cell::RefCell;
use std::rc::Rc;

use procsim::components::{ComponentId, Process, SerializableProcess, Status};
use procsim::output_analysis::Statistics;
use procsim::resource::Request;
use procsim::simulator::Environment;
use procsim::utils::errors::SimulationError;
use serde::Serialize;

type Log = Rc<RefCell<Vec<(String, f64, bool)>>>;

fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Requests, is served for a while, and releases its claims on ending
#[derive(Debug, Clone, Serialize, SerializableProcess)]
#[serde(rename_all = "camelCase")]
struct Customer {
    #[serde(skip)]
    request: Option<Request>,
    service: f64,
    served: bool,
    #[serde(skip)]
    log: Log,
}

impl Customer {
    fn new(request: Request, service: f64, log: &Log) -> Self {
        Self {
            request: Some(request),
            service,
            served: false,
            log: log.clone(),
        }
    }
}

impl Process for Customer {
    fn step(&mut self, env: &mut Environment, me: ComponentId) -> Result<(), SimulationError> {
        if let Some(request) = self.request.take() {
            return env.request(me, request);
        }
        if self.served {
            return Ok(());
        }
        self.served = true;
        let name = env.component(me)?.name().to_string();
        let failed = env.failed(me)?;
        self.log.borrow_mut().push((name, env.now(), failed));
        if failed {
            return Ok(());
        }
        env.hold(me, self.service)
    }
}

fn entry(name: &str, time: f64, failed: bool) -> (String, f64, bool) {
    (name.to_string(), time, failed)
}

#[test]
fn a_release_honors_the_next_request() -> Result<(), SimulationError> {
    let log = new_log();
    let mut env = Environment::new();
    let desk = env.create_resource("desk", 1.0, false);
    env.spawn_named("x", Customer::new(Request::one(desk, 1.0), 5.0, &log))?;
    let y = env.spawn_named("y", Customer::new(Request::one(desk, 1.0), 1.0, &log))?;
    env.run_until(1.0)?;
    assert_eq!(env.status(y)?, Status::Requesting);
    let requesters = env.resource(desk)?.requesters();
    assert_eq!(env.queue(requesters)?.components(), vec![y]);
    env.run()?;
    assert_eq!(*log.borrow(), vec![entry("x", 0.0, false), entry("y", 5.0, false)]);
    assert_eq!(env.now(), 6.0);
    assert_eq!(env.resource(desk)?.claimed_quantity(), 0.0);
    Ok(())
}

#[test]
fn requests_are_all_or_nothing() -> Result<(), SimulationError> {
    let log = new_log();
    let mut env = Environment::new();
    let pumps = env.create_resource("pumps", 2.0, false);
    env.spawn_named("a", Customer::new(Request::one(pumps, 1.0), 3.0, &log))?;
    let b = env.spawn_named("b", Customer::new(Request::one(pumps, 2.0), 1.0, &log))?;
    env.run_until(1.0)?;
    assert_eq!(env.status(b)?, Status::Requesting);
    assert_eq!(env.claimed_quantity(b, pumps)?, 0.0);
    assert_eq!(env.resource(pumps)?.claimed_quantity(), 1.0);
    env.run()?;
    assert_eq!(*log.borrow(), vec![entry("a", 0.0, false), entry("b", 3.0, false)]);
    Ok(())
}

#[test]
fn multi_resource_requests_claim_together() -> Result<(), SimulationError> {
    let log = new_log();
    let mut env = Environment::new();
    let crane = env.create_resource("crane", 1.0, false);
    let berth = env.create_resource("berth", 1.0, false);
    env.spawn_named("a", Customer::new(Request::one(berth, 1.0), 4.0, &log))?;
    let b = env.spawn_named(
        "b",
        Customer::new(Request::new().claim(crane, 1.0).claim(berth, 1.0), 1.0, &log),
    )?;
    env.run_until(1.0)?;
    assert_eq!(env.resource(crane)?.claimed_quantity(), 0.0);
    env.run_until(4.5)?;
    assert_eq!(env.claimed_resources(b)?, vec![crane, berth]);
    env.run()?;
    assert_eq!(*log.borrow(), vec![entry("a", 0.0, false), entry("b", 4.0, false)]);
    Ok(())
}

#[test]
fn greedy_requests_claim_what_is_available() -> Result<(), SimulationError> {
    let log = new_log();
    let mut env = Environment::new();
    let pumps = env.create_resource("pumps", 2.0, false);
    env.spawn_named("a", Customer::new(Request::one(pumps, 1.0), 3.0, &log))?;
    let c = env.spawn_named("c", Customer::new(Request::one(pumps, 2.0).greedy(), 1.0, &log))?;
    env.run_until(1.0)?;
    assert_eq!(env.status(c)?, Status::Requesting);
    assert_eq!(env.claimed_quantity(c, pumps)?, 1.0);
    assert_eq!(env.resource(pumps)?.available_quantity(), 0.0);
    env.run()?;
    assert_eq!(*log.borrow(), vec![entry("a", 0.0, false), entry("c", 3.0, false)]);
    assert_eq!(env.now(), 4.0);
    Ok(())
}

#[test]
fn failed_greedy_requests_give_back_partial_claims() -> Result<(), SimulationError> {
    let log = new_log();
    let mut env = Environment::new();
    let pumps = env.create_resource("pumps", 3.0, false);
    env.spawn_named("a", Customer::new(Request::one(pumps, 2.0), 10.0, &log))?;
    let b = env.spawn_named(
        "b",
        Customer::new(Request::one(pumps, 2.0).greedy().fail_delay(5.0), 1.0, &log),
    )?;
    env.run_until(1.0)?;
    assert_eq!(env.claimed_quantity(b, pumps)?, 1.0);
    assert_eq!(env.resource(pumps)?.claimed_quantity(), 3.0);
    env.run_until(6.0)?;
    assert!(env.failed(b)?);
    assert_eq!(env.claimed_quantity(b, pumps)?, 0.0);
    assert_eq!(env.resource(pumps)?.claimed_quantity(), 2.0);
    let claimers = env.resource(pumps)?.claimers();
    assert!(!env.queue(claimers)?.contains(b));
    assert_eq!(*log.borrow(), vec![entry("a", 0.0, false), entry("b", 5.0, true)]);
    Ok(())
}

#[test]
fn releases_are_checked_against_the_claim() -> Result<(), SimulationError> {
    let log = new_log();
    let mut env = Environment::new();
    let pumps = env.create_resource("pumps", 2.0, false);
    let a = env.spawn_named("a", Customer::new(Request::one(pumps, 1.0), 3.0, &log))?;
    env.run_until(1.0)?;
    assert!(matches!(
        env.release(a, pumps, Some(2.0)),
        Err(SimulationError::ClaimUnderflow { .. })
    ));
    assert!(matches!(
        env.release(a, pumps, Some(-1.0)),
        Err(SimulationError::InvalidQuantity { .. })
    ));
    env.release(a, pumps, Some(0.25))?;
    assert_eq!(env.claimed_quantity(a, pumps)?, 0.75);
    env.release(a, pumps, None)?;
    assert_eq!(env.claimed_quantity(a, pumps)?, 0.0);
    assert!(env.claimed_resources(a)?.is_empty());
    assert!(matches!(
        env.release(a, pumps, None),
        Err(SimulationError::ClaimUnderflow { .. })
    ));
    assert!(matches!(
        env.release(ComponentId::MAIN, pumps, None),
        Err(SimulationError::ClaimUnderflow { .. })
    ));
    Ok(())
}

#[test]
fn capacity_increases_honor_pending_requests() -> Result<(), SimulationError> {
    let log = new_log();
    let mut env = Environment::new();
    let desk = env.create_resource("desk", 1.0, false);
    env.spawn_named("a", Customer::new(Request::one(desk, 1.0), 10.0, &log))?;
    let b = env.spawn_named("b", Customer::new(Request::one(desk, 1.0), 1.0, &log))?;
    env.run_until(1.0)?;
    assert!(matches!(
        env.set_capacity(desk, -1.0),
        Err(SimulationError::InvalidQuantity { .. })
    ));
    env.set_capacity(desk, 2.0)?;
    assert_eq!(env.status(b)?, Status::Scheduled);
    env.run_until(3.0)?;
    assert_eq!(*log.borrow(), vec![entry("a", 0.0, false), entry("b", 1.0, false)]);
    env.set_capacity(desk, 0.0)?;
    assert_eq!(env.resource(desk)?.available_quantity(), -1.0);
    Ok(())
}

#[test]
fn over_commitment_is_absorbed_by_releases() -> Result<(), SimulationError> {
    let log = new_log();
    let mut env = Environment::new();
    let desk = env.create_resource("desk", 2.0, false);
    let a = env.spawn_named("a", Customer::new(Request::one(desk, 2.0), 100.0, &log))?;
    let b = env.spawn_named("b", Customer::new(Request::one(desk, 1.0), 1.0, &log))?;
    env.run_until(1.0)?;
    assert_eq!(env.status(b)?, Status::Requesting);
    env.set_capacity(desk, 1.0)?;
    assert_eq!(env.resource(desk)?.available_quantity(), -1.0);
    env.release(a, desk, Some(1.0))?;
    assert_eq!(env.resource(desk)?.available_quantity(), 0.0);
    assert_eq!(env.status(b)?, Status::Requesting);
    env.run_until(2.0)?;
    env.release(a, desk, Some(1.0))?;
    assert_eq!(env.status(b)?, Status::Scheduled);
    env.run_until(4.0)?;
    assert_eq!(env.claimed_quantity(b, desk)?, 0.0);
    assert_eq!(*log.borrow(), vec![entry("a", 0.0, false), entry("b", 2.0, false)]);
    Ok(())
}

#[test]
fn anonymous_resources_track_the_aggregate() -> Result<(), SimulationError> {
    let log = new_log();
    let mut env = Environment::new();
    let parking = env.create_resource("parking", 2.0, true);
    let a = env.spawn_named("a", Customer::new(Request::one(parking, 1.0), 1.0, &log))?;
    env.run()?;
    assert_eq!(env.status(a)?, Status::Data);
    assert_eq!(env.claimed_quantity(a, parking)?, 0.0);
    assert_eq!(env.resource(parking)?.claimed_quantity(), 1.0);
    assert!(matches!(
        env.release(ComponentId::MAIN, parking, Some(1.5)),
        Err(SimulationError::ClaimUnderflow { .. })
    ));
    env.release(ComponentId::MAIN, parking, Some(1.0))?;
    assert_eq!(env.resource(parking)?.claimed_quantity(), 0.0);
    Ok(())
}

#[test]
fn resource_monitors_are_time_weighted() -> Result<(), SimulationError> {
    let log = new_log();
    let mut env = Environment::new();
    let pumps = env.create_resource("pumps", 2.0, false);
    env.spawn_named("a", Customer::new(Request::one(pumps, 1.0), 4.0, &log))?;
    env.run_until(8.0)?;
    let resource = env.resource(pumps)?;
    let claimed = resource.claimed_monitor().view(env.now());
    assert_eq!(claimed.mean(false), Some(0.5));
    assert_eq!(claimed.maximum(false), Some(1.0));
    let occupancy = resource.occupancy_monitor().view(env.now());
    assert_eq!(occupancy.mean(false), Some(0.25));
    Ok(())
}
