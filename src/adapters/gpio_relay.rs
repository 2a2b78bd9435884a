//! Relay driven through an `embedded-hal` output pin.
//!
//! The persisted state in [`JsonStore`] is authoritative: `is_on` reads
//! it, `set` writes it before touching the pin and rolls it back if the
//! pin write fails. That way a failed pin write never leaves the store
//! claiming "off" for a relay that is still energised.
//!
//! Most relay boards are active-low (input pulled low = coil energised);
//! set `active_low` for those.

use std::sync::Arc;

use embedded_hal::digital::OutputPin;
use log::{error, info};

use super::store::JsonStore;
use crate::app::ports::RelayPort;
use crate::control::Purpose;
use crate::error::RelayError;

pub struct GpioRelay<P> {
    pin: P,
    purpose: Purpose,
    store: Arc<JsonStore>,
    active_low: bool,
}

impl<P: OutputPin> GpioRelay<P> {
    /// Take over `pin` and drive it to the persisted state.
    pub fn resume(
        pin: P,
        purpose: Purpose,
        store: Arc<JsonStore>,
        active_low: bool,
    ) -> Result<Self, RelayError> {
        let on = store
            .relay_state(purpose)
            .map_err(|_| RelayError::StateReadFailed)?;
        let mut relay = Self {
            pin,
            purpose,
            store,
            active_low,
        };
        relay.drive(on)?;
        info!("Resuming {} relay state: {}", purpose, if on { "on" } else { "off" });
        Ok(relay)
    }

    fn drive(&mut self, on: bool) -> Result<(), RelayError> {
        let high = on != self.active_low;
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.map_err(|e| {
            error!("{} relay pin write failed: {:?}", self.purpose, e);
            RelayError::GpioWriteFailed
        })
    }
}

impl<P: OutputPin> RelayPort for GpioRelay<P> {
    fn is_on(&self) -> Result<bool, RelayError> {
        self.store
            .relay_state(self.purpose)
            .map_err(|_| RelayError::StateReadFailed)
    }

    fn set(&mut self, on: bool) -> Result<(), RelayError> {
        let previous = self.is_on()?;
        self.store
            .set_relay_state(self.purpose, on)
            .map_err(|_| RelayError::StatePersistFailed)?;
        if let Err(e) = self.drive(on) {
            // The store must keep reporting what the pin last had.
            if let Err(rollback) = self.store.set_relay_state(self.purpose, previous) {
                error!(
                    "{} relay state rollback failed ({}), stored state may not match the pin",
                    self.purpose, rollback
                );
            }
            return Err(e);
        }
        Ok(())
    }
}
