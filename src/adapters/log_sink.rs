//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured regulator events through
//! the `log` facade. The binary routes these to stderr via
//! `tracing-subscriber`.

use log::{debug, error, info};

use crate::app::events::RegulatorEvent;
use crate::app::ports::EventSink;
use crate::error::Halt;

/// Adapter that logs every [`RegulatorEvent`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &RegulatorEvent) {
        match event {
            RegulatorEvent::Started { goal } => {
                info!(
                    "START | target={:.2}\u{00b0}C drift={:.2}",
                    goal.target_c, goal.drift_c
                );
            }
            RegulatorEvent::Telemetry(t) => {
                debug!(
                    "TELEM | T={:.2}\u{00b0}C | target={:.2}\u{00b1}{:.2} | state={:?}",
                    t.reading_c, t.target_c, t.drift_c, t.state
                );
            }
            RegulatorEvent::RelayToggled(t) => {
                info!(
                    "RELAY | {} {} -> {} ({:?})",
                    t.purpose, t.from, t.to, t.reason
                );
            }
            RegulatorEvent::Sustaining {
                reading_c,
                sleep_secs,
            } => {
                debug!("SUSTAIN | T={:.2}\u{00b0}C | sleep={:.0}s", reading_c, sleep_secs);
            }
            RegulatorEvent::ChaseStarted {
                purpose,
                reading_c,
                target_c,
            } => {
                info!(
                    "CHASE | {} | T={:.2}\u{00b0}C -> {:.2}\u{00b0}C",
                    purpose, reading_c, target_c
                );
            }
            RegulatorEvent::GoalMet {
                purpose,
                reading_c,
                target_c,
            } => {
                info!(
                    "GOAL | {} done | T={:.2}\u{00b0}C target={:.2}\u{00b0}C",
                    purpose, reading_c, target_c
                );
            }
            RegulatorEvent::Stopped(Halt::Cancelled) => info!("STOP | cancelled"),
            RegulatorEvent::Stopped(Halt::Fault(e)) => error!("STOP | fault: {}", e),
        }
    }
}
