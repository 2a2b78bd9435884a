//! Mock hardware for integration tests.
//!
//! A [`Bench`] holds the state of both relays behind one lock so it can
//! detect the two being on at the same moment. Relays, the sensor and the
//! sink are `Send` handles onto shared state, letting tests observe a
//! regulator running on another thread.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use brewregulator::app::events::RegulatorEvent;
use brewregulator::app::ports::{EventSink, RelayPort, TemperatureSensor};
use brewregulator::error::{RelayError, SensorError};
use brewregulator::interlock::RelayPair;
use brewregulator::{ControlState, Purpose};

// ── Relays ────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct BenchState {
    heating: bool,
    cooling: bool,
    writes: u32,
    both_on_seen: bool,
    /// Fail the next `set(value)` call for (purpose, value).
    fail_next: Option<(Purpose, bool)>,
}

/// Shared view of both relays.
#[derive(Clone, Default)]
pub struct Bench(Arc<Mutex<BenchState>>);

#[allow(dead_code)]
impl Bench {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with persisted relay states, as after a restart.
    pub fn with_states(heating: bool, cooling: bool) -> Self {
        let bench = Self::new();
        {
            let mut s = bench.0.lock().unwrap();
            s.heating = heating;
            s.cooling = cooling;
        }
        bench
    }

    pub fn relays(&self) -> RelayPair<MockRelay, MockRelay> {
        RelayPair::new(
            MockRelay {
                bench: self.clone(),
                purpose: Purpose::Heating,
            },
            MockRelay {
                bench: self.clone(),
                purpose: Purpose::Cooling,
            },
        )
    }

    pub fn heating(&self) -> bool {
        self.0.lock().unwrap().heating
    }

    pub fn cooling(&self) -> bool {
        self.0.lock().unwrap().cooling
    }

    pub fn state(&self) -> ControlState {
        let s = self.0.lock().unwrap();
        ControlState::from_relays(s.heating, s.cooling)
    }

    pub fn writes(&self) -> u32 {
        self.0.lock().unwrap().writes
    }

    pub fn both_on_seen(&self) -> bool {
        self.0.lock().unwrap().both_on_seen
    }

    pub fn fail_next_set(&self, purpose: Purpose, on: bool) {
        self.0.lock().unwrap().fail_next = Some((purpose, on));
    }
}

pub struct MockRelay {
    bench: Bench,
    purpose: Purpose,
}

impl RelayPort for MockRelay {
    fn is_on(&self) -> Result<bool, RelayError> {
        let s = self.bench.0.lock().unwrap();
        Ok(match self.purpose {
            Purpose::Heating => s.heating,
            Purpose::Cooling => s.cooling,
        })
    }

    fn set(&mut self, on: bool) -> Result<(), RelayError> {
        let mut s = self.bench.0.lock().unwrap();
        if s.fail_next == Some((self.purpose, on)) {
            s.fail_next = None;
            return Err(RelayError::GpioWriteFailed);
        }
        match self.purpose {
            Purpose::Heating => s.heating = on,
            Purpose::Cooling => s.cooling = on,
        }
        s.writes += 1;
        if s.heating && s.cooling {
            s.both_on_seen = true;
        }
        Ok(())
    }
}

// ── Sensor ────────────────────────────────────────────────────

/// Thermometer whose value the test sets. `None` makes reads fail.
#[derive(Clone)]
pub struct Thermometer(Arc<Mutex<Option<f32>>>);

#[allow(dead_code)]
impl Thermometer {
    pub fn reading(celsius: f32) -> Self {
        Self(Arc::new(Mutex::new(Some(celsius))))
    }

    pub fn broken() -> Self {
        Self(Arc::new(Mutex::new(None)))
    }

    pub fn set(&self, celsius: f32) {
        *self.0.lock().unwrap() = Some(celsius);
    }
}

impl TemperatureSensor for Thermometer {
    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        self.0.lock().unwrap().ok_or(SensorError::ReadFailed)
    }
}

// ── Event sink ────────────────────────────────────────────────

/// Sink that keeps every event for later assertions.
#[derive(Clone, Default)]
pub struct RecordingSink(Arc<Mutex<Vec<RegulatorEvent>>>);

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RegulatorEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, pred: impl Fn(&RegulatorEvent) -> bool) -> bool {
        self.0.lock().unwrap().iter().any(pred)
    }

    /// Index of the first matching event.
    pub fn position(&self, pred: impl Fn(&RegulatorEvent) -> bool) -> Option<usize> {
        self.0.lock().unwrap().iter().position(pred)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &RegulatorEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// Poll `cond` until it holds or five seconds pass.
pub fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}
