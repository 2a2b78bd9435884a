//! End-to-end regulation scenarios against mock relays and a settable
//! thermometer. The regulator runs on its own thread with millisecond
//! timing; assertions poll the shared mock state.

use std::sync::Arc;
use std::thread::JoinHandle;

use futures_lite::future::block_on;

use brewregulator::adapters::shared_goal::SharedGoal;
use brewregulator::adapters::store::JsonStore;
use brewregulator::app::events::{RegulatorEvent, TransitionReason};
use brewregulator::app::poller::SharedReading;
use brewregulator::app::ports::{ConfigError, GoalSource};
use brewregulator::app::regulation::{CycleOutcome, RegulationLoop};
use brewregulator::app::shutdown::ShutdownSignal;
use brewregulator::control::hysteresis;
use brewregulator::error::RelayError;
use brewregulator::{ControlState, Error, Goal, Halt, Purpose, Regulator, RegulatorConfig};

use super::mock_hw::{Bench, RecordingSink, Thermometer, wait_until};

fn fast_config() -> RegulatorConfig {
    RegulatorConfig {
        poll_interval_ms: 1,
        cycle_interval_secs: 0.001,
        secs_to_drift_one_degree: 0.002,
    }
}

fn goal(target_c: f32) -> Arc<SharedGoal> {
    Arc::new(SharedGoal::new(Goal::new(target_c, 0.5)).unwrap())
}

struct Running {
    shutdown: Arc<ShutdownSignal>,
    thread: JoinHandle<Result<(), Error>>,
}

impl Running {
    fn stop(self) -> Result<(), Error> {
        self.shutdown.request();
        self.join()
    }

    fn join(self) -> Result<(), Error> {
        self.thread.join().expect("regulator thread panicked")
    }
}

fn spawn<G: GoalSource + Send + 'static>(
    thermo: &Thermometer,
    bench: &Bench,
    goal: G,
    sink: &RecordingSink,
) -> Running {
    let regulator = Regulator::new(
        fast_config(),
        thermo.clone(),
        bench.relays(),
        goal,
        sink.clone(),
    )
    .unwrap();
    let shutdown = regulator.shutdown_handle();
    let thread = std::thread::spawn(move || regulator.start());
    Running { shutdown, thread }
}

fn is_goal_met(e: &RegulatorEvent) -> bool {
    matches!(e, RegulatorEvent::GoalMet { .. })
}

fn is_sustaining(e: &RegulatorEvent) -> bool {
    matches!(e, RegulatorEvent::Sustaining { .. })
}

// ── Chase ─────────────────────────────────────────────────────

#[test]
fn warm_chamber_cools_to_target_then_sustains() {
    let bench = Bench::new();
    let sink = RecordingSink::new();
    let thermo = Thermometer::reading(25.0);
    let run = spawn(&thermo, &bench, goal(18.0), &sink);

    assert!(wait_until(|| bench.cooling()), "cooling should engage");
    assert!(!bench.heating());
    assert_eq!(bench.state(), ControlState::Cooling);

    thermo.set(18.0);
    assert!(wait_until(|| sink.contains(is_goal_met)));
    let met = sink.position(is_goal_met).unwrap();
    assert!(wait_until(|| sink.events()[met..].iter().any(is_sustaining)));
    assert!(!bench.cooling());

    assert_eq!(run.stop(), Ok(()));
    assert!(!bench.both_on_seen());
    assert_eq!(bench.state(), ControlState::Idle);
    assert!(!sink.contains(|e| matches!(
        e,
        RegulatorEvent::RelayToggled(t) if t.purpose == Purpose::Heating
    )));
    let released = sink.events()[..met].iter().rev().find_map(|e| match e {
        RegulatorEvent::RelayToggled(t) => Some(*t),
        _ => None,
    });
    assert_eq!(released.map(|t| (t.to, t.reason)), Some((false, TransitionReason::Release)));
}

#[test]
fn cold_chamber_heats() {
    let bench = Bench::new();
    let sink = RecordingSink::new();
    let thermo = Thermometer::reading(12.0);
    let run = spawn(&thermo, &bench, goal(18.0), &sink);

    assert!(wait_until(|| bench.heating()));
    assert!(!bench.cooling());
    thermo.set(18.3);
    assert!(wait_until(|| !bench.heating()));

    assert_eq!(run.stop(), Ok(()));
    assert!(sink.contains(|e| matches!(
        e,
        RegulatorEvent::GoalMet { purpose: Purpose::Heating, .. }
    )));
}

#[test]
fn goal_change_mid_chase_is_observed() {
    let bench = Bench::new();
    let sink = RecordingSink::new();
    let thermo = Thermometer::reading(25.0);
    let shared = goal(18.0);
    let run = spawn(&thermo, &bench, Arc::clone(&shared), &sink);

    assert!(wait_until(|| bench.cooling()));
    shared.set(Goal::new(25.2, 0.5)).unwrap();
    assert!(wait_until(|| sink.contains(is_goal_met)));
    assert!(!bench.cooling());

    assert_eq!(run.stop(), Ok(()));
    let met = sink.events().into_iter().find(is_goal_met).unwrap();
    assert_eq!(
        met,
        RegulatorEvent::GoalMet {
            purpose: Purpose::Cooling,
            reading_c: 25.0,
            target_c: 25.2,
        }
    );
}

// ── Sustain ───────────────────────────────────────────────────

#[test]
fn reading_inside_band_sustains_without_touching_relays() {
    let reading = SharedReading::new();
    reading.store(18.2).unwrap();
    let bench = Bench::new();
    let sink = RecordingSink::new();
    let config = RegulatorConfig {
        secs_to_drift_one_degree: 0.01,
        ..fast_config()
    };
    let mut regulation = RegulationLoop::new(
        config,
        bench.relays(),
        goal(18.0),
        sink.clone(),
        reading,
        Arc::new(ShutdownSignal::new()),
    );

    let outcome = block_on(regulation.run_cycle()).unwrap();

    let expected = hysteresis::sustain_duration(0.5, 0.01);
    assert_eq!(
        outcome,
        CycleOutcome::Sustained {
            reading_c: 18.2,
            sleep: expected,
        }
    );
    assert!(expected.as_micros().abs_diff(5_000) <= 1);
    assert_eq!(bench.writes(), 0);
    assert!(sink.contains(is_sustaining));
}

/// Goal source that skips validation, as a misbehaving external store would.
struct Unchecked(Goal);

impl GoalSource for Unchecked {
    fn goal(&self) -> Result<Goal, ConfigError> {
        Ok(self.0)
    }
}

#[test]
fn huge_drift_sustain_sleeps_until_cancelled() {
    let reading = SharedReading::new();
    reading.store(18.2).unwrap();
    let bench = Bench::new();
    let sink = RecordingSink::new();
    let shutdown = Arc::new(ShutdownSignal::new());
    let mut regulation = RegulationLoop::new(
        RegulatorConfig::default(),
        bench.relays(),
        Unchecked(Goal::new(18.0, 1.0e15)),
        sink.clone(),
        reading,
        Arc::clone(&shutdown),
    );

    let stopper = {
        let shutdown = Arc::clone(&shutdown);
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            shutdown.request();
        })
    };
    let outcome = block_on(regulation.run_cycle());
    stopper.join().unwrap();

    assert_eq!(outcome, Err(Halt::Cancelled));
    assert!(sink.contains(is_sustaining));
    assert_eq!(bench.writes(), 0);
    assert_eq!(regulation.relays().control_state().unwrap(), ControlState::Idle);
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn no_reading_blocks_before_first_decision() {
    let bench = Bench::new();
    let sink = RecordingSink::new();
    let run = spawn(&Thermometer::broken(), &bench, goal(18.0), &sink);

    std::thread::sleep(std::time::Duration::from_millis(50));
    assert_eq!(bench.writes(), 0);
    assert!(!sink.contains(|e| matches!(e, RegulatorEvent::Telemetry(_))));

    assert_eq!(run.stop(), Ok(()));
    assert_eq!(bench.writes(), 0);
    assert_eq!(
        sink.events().last(),
        Some(&RegulatorEvent::Stopped(Halt::Cancelled))
    );
}

#[test]
fn both_relays_persisted_on_are_reconciled() {
    let bench = Bench::with_states(true, true);
    let sink = RecordingSink::new();
    let run = spawn(&Thermometer::broken(), &bench, goal(18.0), &sink);

    assert!(wait_until(|| bench.state() == ControlState::Idle));
    assert!(sink.contains(|e| matches!(
        e,
        RegulatorEvent::RelayToggled(t) if t.reason == TransitionReason::Reconcile
    )));
    assert_eq!(run.stop(), Ok(()));
}

#[test]
fn missing_goal_is_rejected_before_start() {
    let bench = Bench::new();
    let result = Regulator::new(
        fast_config(),
        Thermometer::reading(20.0),
        bench.relays(),
        JsonStore::in_memory(),
        RecordingSink::new(),
    );
    assert!(matches!(result, Err(Error::Config(ConfigError::NotFound))));
    assert_eq!(bench.writes(), 0);
}

#[test]
fn rejected_startup_turns_resumed_relay_off() {
    let bench = Bench::with_states(false, true);
    let result = Regulator::new(
        fast_config(),
        Thermometer::reading(20.0),
        bench.relays(),
        JsonStore::in_memory(),
        RecordingSink::new(),
    );
    assert!(matches!(result, Err(Error::Config(ConfigError::NotFound))));
    assert_eq!(bench.state(), ControlState::Idle);
}

#[test]
fn invalid_config_is_rejected_before_start() {
    let bench = Bench::new();
    let config = RegulatorConfig {
        poll_interval_ms: 0,
        ..fast_config()
    };
    let result = Regulator::new(
        config,
        Thermometer::reading(20.0),
        bench.relays(),
        goal(18.0),
        RecordingSink::new(),
    );
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::ValidationFailed(_)))
    ));
}

// ── Faults and cancellation ───────────────────────────────────

#[test]
fn relay_fault_on_engage_leaves_everything_off() {
    let bench = Bench::new();
    bench.fail_next_set(Purpose::Cooling, true);
    let sink = RecordingSink::new();
    let run = spawn(&Thermometer::reading(25.0), &bench, goal(18.0), &sink);

    assert_eq!(run.join(), Err(Error::Relay(RelayError::GpioWriteFailed)));
    assert_eq!(bench.state(), ControlState::Idle);
    assert!(sink.contains(|e| matches!(e, RegulatorEvent::Stopped(Halt::Fault(_)))));
}

#[test]
fn relay_fault_on_release_is_retried_during_unwind() {
    let bench = Bench::new();
    bench.fail_next_set(Purpose::Cooling, false);
    let sink = RecordingSink::new();
    let thermo = Thermometer::reading(25.0);
    let run = spawn(&thermo, &bench, goal(18.0), &sink);

    assert!(wait_until(|| bench.cooling()));
    thermo.set(17.0);

    assert_eq!(run.join(), Err(Error::Relay(RelayError::GpioWriteFailed)));
    assert!(!bench.cooling());
    assert!(!bench.heating());
}

#[test]
fn cancellation_mid_chase_turns_relay_off() {
    let bench = Bench::new();
    let sink = RecordingSink::new();
    let run = spawn(&Thermometer::reading(25.0), &bench, goal(18.0), &sink);

    assert!(wait_until(|| bench.cooling()));
    assert_eq!(run.stop(), Ok(()));

    assert_eq!(bench.state(), ControlState::Idle);
    let events = sink.events();
    let last_toggle = events.iter().rev().find_map(|e| match e {
        RegulatorEvent::RelayToggled(t) => Some(*t),
        _ => None,
    });
    assert_eq!(last_toggle.map(|t| t.to), Some(false));
    assert_eq!(events.last(), Some(&RegulatorEvent::Stopped(Halt::Cancelled)));
}
