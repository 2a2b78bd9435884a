//! Liveness tracking for an external health check.
//!
//! [`HealthSink`] is an [`EventSink`] that stamps every event into a shared
//! [`HealthMonitor`]. A supervisor holding the monitor asks
//! [`HealthMonitor::is_alive`] whether the loop has produced anything
//! recently, and can inspect the last few relay transitions.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use embassy_time::{Duration, Instant};
use heapless::HistoryBuffer;

use crate::app::events::{RegulatorEvent, RelayTransition};
use crate::app::ports::EventSink;

/// Number of relay transitions kept for inspection.
pub const TRANSITION_HISTORY: usize = 16;

pub struct HealthMonitor {
    events: AtomicU64,
    /// `Instant::as_ticks` of the last event; 0 = none yet.
    last_event: AtomicU64,
    stopped: AtomicBool,
    transitions: Mutex<HistoryBuffer<RelayTransition, TRANSITION_HISTORY>>,
}

impl HealthMonitor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: AtomicU64::new(0),
            last_event: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            transitions: Mutex::new(HistoryBuffer::new()),
        })
    }

    pub fn sink(self: &Arc<Self>) -> HealthSink {
        HealthSink(Arc::clone(self))
    }

    pub fn event_count(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    /// True if the loop is running and emitted an event within `max_silence`.
    pub fn is_alive(&self, max_silence: Duration) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            return false;
        }
        match self.last_event.load(Ordering::Acquire) {
            0 => false,
            ticks => Instant::now().saturating_duration_since(Instant::from_ticks(ticks)) <= max_silence,
        }
    }

    /// Recent relay transitions, oldest first.
    pub fn recent_transitions(&self) -> Vec<RelayTransition> {
        self.transitions
            .lock()
            .map(|h| h.oldest_ordered().copied().collect())
            .unwrap_or_default()
    }

    fn record(&self, event: &RegulatorEvent) {
        self.events.fetch_add(1, Ordering::Relaxed);
        self.last_event
            .store(Instant::now().as_ticks().max(1), Ordering::Release);
        match event {
            RegulatorEvent::RelayToggled(t) => {
                if let Ok(mut h) = self.transitions.lock() {
                    h.write(*t);
                }
            }
            RegulatorEvent::Stopped(_) => self.stopped.store(true, Ordering::Release),
            _ => {}
        }
    }
}

/// Event sink half of the monitor.
#[derive(Clone)]
pub struct HealthSink(Arc<HealthMonitor>);

impl EventSink for HealthSink {
    fn emit(&mut self, event: &RegulatorEvent) {
        self.0.record(event);
    }
}
