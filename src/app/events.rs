//! Outbound regulator events.
//!
//! The [`Regulator`](super::service::Regulator) and the relay interlock emit
//! these through the [`EventSink`](super::ports::EventSink) port. Adapters on
//! the other side decide what to do with them: log lines, health tracking,
//! a test recorder.

use crate::control::{ControlState, Goal, Purpose};
use crate::error::Halt;

/// Structured events emitted by the regulation core.
#[derive(Debug, Clone, PartialEq)]
pub enum RegulatorEvent {
    /// The loop is starting with this goal.
    Started { goal: Goal },

    /// Snapshot taken at the top of every cycle.
    Telemetry(TelemetryData),

    /// A relay changed state.
    RelayToggled(RelayTransition),

    /// Reading is inside the band; the loop will sleep before re-checking.
    Sustaining { reading_c: f32, sleep_secs: f32 },

    /// A relay was engaged to chase the target.
    ChaseStarted {
        purpose: Purpose,
        reading_c: f32,
        target_c: f32,
    },

    /// The chase reached (or passed) the target and the relay was released.
    GoalMet {
        purpose: Purpose,
        reading_c: f32,
        target_c: f32,
    },

    /// The loop has unwound and both relays were commanded off.
    Stopped(Halt),
}

/// A point-in-time telemetry snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryData {
    pub reading_c: f32,
    pub target_c: f32,
    pub drift_c: f32,
    pub state: ControlState,
}

/// Why a relay was switched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionReason {
    /// Turned on to chase the target.
    Engage,
    /// Turned off because the opposite relay is about to turn on.
    Handoff,
    /// Turned off because the chase finished.
    Release,
    /// Turned off during loop unwind.
    Shutdown,
    /// Turned off while reconciling persisted state at startup.
    Reconcile,
}

/// A single relay switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayTransition {
    pub purpose: Purpose,
    pub from: bool,
    pub to: bool,
    pub reason: TransitionReason,
}
