//! Heating/cooling relay interlock.
//!
//! [`RelayPair`] is the only component allowed to switch the two relays.
//! Every path that turns a relay on first turns the opposite relay off, so
//! at most one of them is ever energised.
//!
//! ## Engaged guard
//!
//! [`RelayPair::engage`] returns an [`Engaged`] guard. Dropping the guard
//! (on `?`, on panic unwind, or when the owning future is dropped) runs
//! [`RelayPair::shutdown_all`]. The normal exit is [`Engaged::release`].

use log::{error, info, warn};

use crate::app::events::{RegulatorEvent, RelayTransition, TransitionReason};
use crate::app::ports::{EventSink, RelayPort};
use crate::control::{ControlState, Purpose};
use crate::error::RelayError;

/// Exclusive owner of the heating and cooling relays.
pub struct RelayPair<H, C> {
    heating: H,
    cooling: C,
}

impl<H: RelayPort, C: RelayPort> RelayPair<H, C> {
    pub fn new(heating: H, cooling: C) -> Self {
        Self { heating, cooling }
    }

    /// Current state of the relay serving `purpose`.
    pub fn is_on(&self, purpose: Purpose) -> Result<bool, RelayError> {
        match purpose {
            Purpose::Heating => self.heating.is_on(),
            Purpose::Cooling => self.cooling.is_on(),
        }
    }

    /// What the enclosure is doing right now, computed from relay states.
    pub fn control_state(&self) -> Result<ControlState, RelayError> {
        Ok(ControlState::from_relays(
            self.heating.is_on()?,
            self.cooling.is_on()?,
        ))
    }

    pub fn engage_heating<S: EventSink>(&mut self, on: bool, sink: &mut S) -> Result<(), RelayError> {
        self.switch(Purpose::Heating, on, sink)
    }

    pub fn engage_cooling<S: EventSink>(&mut self, on: bool, sink: &mut S) -> Result<(), RelayError> {
        self.switch(Purpose::Cooling, on, sink)
    }

    /// Turn `purpose` on (opposite relay off first) or off (opposite untouched).
    pub fn switch<S: EventSink>(
        &mut self,
        purpose: Purpose,
        on: bool,
        sink: &mut S,
    ) -> Result<(), RelayError> {
        if on {
            // Break before make.
            let other = purpose.opposite();
            self.set_if_changed(other, false, TransitionReason::Handoff, sink)?;
            self.set_if_changed(purpose, true, TransitionReason::Engage, sink)
        } else {
            self.set_if_changed(purpose, false, TransitionReason::Release, sink)
        }
    }

    /// Turn off every relay that is on. Both relays are attempted even if
    /// the first one fails; the first error is returned.
    pub fn shutdown_all<S: EventSink>(&mut self, sink: &mut S) -> Result<(), RelayError> {
        self.all_off(TransitionReason::Shutdown, sink)
    }

    /// Turn everything off at the normal end of a chase.
    fn release_all<S: EventSink>(&mut self, sink: &mut S) -> Result<(), RelayError> {
        self.all_off(TransitionReason::Release, sink)
    }

    /// Repair persisted state that violates the interlock (both relays on
    /// after an unclean exit). Returns the resulting state.
    pub fn reconcile<S: EventSink>(&mut self, sink: &mut S) -> Result<ControlState, RelayError> {
        let heating_on = self.heating.is_on()?;
        let cooling_on = self.cooling.is_on()?;
        if heating_on && cooling_on {
            warn!("Both relays persisted on, forcing both off");
            self.all_off(TransitionReason::Reconcile, sink)?;
        } else if heating_on || cooling_on {
            info!(
                "Resuming relay state: heating={} cooling={}",
                heating_on, cooling_on
            );
        }
        self.control_state()
    }

    /// Engage `purpose` and hand back a guard that turns everything off
    /// unless explicitly released.
    pub fn engage<'a, S: EventSink>(
        &'a mut self,
        purpose: Purpose,
        sink: &'a mut S,
    ) -> Result<Engaged<'a, H, C, S>, RelayError> {
        let mut guard = Engaged {
            relays: self,
            sink,
            purpose,
            armed: true,
        };
        // If this fails the guard drops here and unwinds both relays.
        guard.relays.switch(purpose, true, &mut *guard.sink)?;
        Ok(guard)
    }

    // ── Internal ──────────────────────────────────────────────────

    fn all_off<S: EventSink>(
        &mut self,
        reason: TransitionReason,
        sink: &mut S,
    ) -> Result<(), RelayError> {
        let heating = self.set_if_changed(Purpose::Heating, false, reason, sink);
        let cooling = self.set_if_changed(Purpose::Cooling, false, reason, sink);
        heating.and(cooling)
    }

    /// Idempotent set: a relay already in the requested state is not
    /// written and produces no event.
    fn set_if_changed<S: EventSink>(
        &mut self,
        purpose: Purpose,
        on: bool,
        reason: TransitionReason,
        sink: &mut S,
    ) -> Result<(), RelayError> {
        let from = self.is_on(purpose)?;
        if from == on {
            return Ok(());
        }
        let result = match purpose {
            Purpose::Heating => self.heating.set(on),
            Purpose::Cooling => self.cooling.set(on),
        };
        if let Err(e) = result {
            error!("{} relay -> {}: {}", purpose, on_off(on), e);
            return Err(e);
        }
        info!(
            "{} relay {} -> {} ({:?})",
            purpose,
            on_off(from),
            on_off(on),
            reason
        );
        sink.emit(&RegulatorEvent::RelayToggled(RelayTransition {
            purpose,
            from,
            to: on,
            reason,
        }));
        Ok(())
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

// ───────────────────────────────────────────────────────────────
// Engaged guard
// ───────────────────────────────────────────────────────────────

/// A relay held on for the duration of a chase.
pub struct Engaged<'a, H: RelayPort, C: RelayPort, S: EventSink> {
    relays: &'a mut RelayPair<H, C>,
    sink: &'a mut S,
    purpose: Purpose,
    armed: bool,
}

impl<H: RelayPort, C: RelayPort, S: EventSink> Engaged<'_, H, C, S> {
    pub fn purpose(&self) -> Purpose {
        self.purpose
    }

    pub fn relays(&self) -> &RelayPair<H, C> {
        self.relays
    }

    /// Forward an event to the sink borrowed by the guard.
    pub fn emit(&mut self, event: &RegulatorEvent) {
        self.sink.emit(event);
    }

    /// Normal chase exit: turn everything off and disarm the guard.
    pub fn release(mut self) -> Result<(), RelayError> {
        self.armed = false;
        self.relays.release_all(&mut *self.sink)
    }
}

impl<H: RelayPort, C: RelayPort, S: EventSink> Drop for Engaged<'_, H, C, S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("{} chase interrupted, turning all relays off", self.purpose);
        if let Err(e) = self.relays.shutdown_all(&mut *self.sink) {
            error!("Shutdown after interrupted chase failed: {}", e);
        }
    }
}
