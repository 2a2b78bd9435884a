//! Simulated enclosure for running without hardware.
//!
//! A first-order thermal model: the chamber relaxes toward ambient and the
//! energised relay adds a constant heating or cooling rate. Time advances
//! with the wall clock multiplied by `time_scale`, so a demo run can cover
//! hours of fermentation in minutes.
//!
//! ```text
//!   dT/dt = (ambient - T) / tau  + heat_rate·[heating]  - cool_rate·[cooling]
//! ```
//!
//! Relay states only change at `energise`, so between updates the forcing
//! is constant and the model is advanced with its exact solution.

use core::convert::Infallible;
use std::sync::{Arc, Mutex};

use embassy_time::Instant;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::app::ports::TemperatureSensor;
use crate::control::Purpose;
use crate::error::SensorError;

/// Tunables for the thermal model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalModel {
    pub ambient_c: f32,
    /// Relaxation time constant toward ambient (seconds).
    pub tau_secs: f32,
    /// °C per second while the heater is on.
    pub heat_rate: f32,
    /// °C per second while the cooler is on.
    pub cool_rate: f32,
    /// Simulated seconds per wall-clock second.
    pub time_scale: f32,
}

impl Default for ThermalModel {
    fn default() -> Self {
        Self {
            ambient_c: 22.0,
            tau_secs: 6000.0,
            heat_rate: 0.01,
            cool_rate: 0.01,
            time_scale: 1.0,
        }
    }
}

struct Chamber {
    model: ThermalModel,
    temp_c: f32,
    heating: bool,
    cooling: bool,
    last: Instant,
}

impl Chamber {
    /// Advance to now with the closed-form solution
    /// `T(t) = E + (T0 - E)·exp(-t/tau)`, where `E` is the equilibrium
    /// for the current relay states.
    fn advance(&mut self) {
        let now = Instant::now();
        let wall_secs = now.saturating_duration_since(self.last).as_micros() as f64 / 1_000_000.0;
        self.last = now;
        let m = &self.model;
        let tau = f64::from(m.tau_secs);
        let elapsed = wall_secs * f64::from(m.time_scale);
        if elapsed.is_nan() || tau.is_nan() || elapsed <= 0.0 || tau <= 0.0 {
            return;
        }
        let equilibrium = f64::from(m.ambient_c) + self.forcing() * tau;
        let decay = (-elapsed / tau).exp();
        self.temp_c = (equilibrium + (f64::from(self.temp_c) - equilibrium) * decay) as f32;
    }

    /// Net relay drive in °C per second.
    fn forcing(&self) -> f64 {
        let mut rate = 0.0;
        if self.heating {
            rate += f64::from(self.model.heat_rate);
        }
        if self.cooling {
            rate -= f64::from(self.model.cool_rate);
        }
        rate
    }
}

/// Handle to a shared simulated chamber.
#[derive(Clone)]
pub struct SimEnclosure {
    chamber: Arc<Mutex<Chamber>>,
}

impl SimEnclosure {
    pub fn new(start_c: f32, model: ThermalModel) -> Self {
        Self {
            chamber: Arc::new(Mutex::new(Chamber {
                model,
                temp_c: start_c,
                heating: false,
                cooling: false,
                last: Instant::now(),
            })),
        }
    }

    pub fn sensor(&self) -> SimSensor {
        SimSensor(self.clone())
    }

    /// Output pin wired to the relay for `purpose`. With `active_low` the
    /// relay is energised while the pin is low.
    pub fn pin(&self, purpose: Purpose, active_low: bool) -> SimPin {
        SimPin {
            enclosure: self.clone(),
            purpose,
            active_low,
        }
    }

    /// Current simulated temperature.
    pub fn temperature(&self) -> Option<f32> {
        let mut c = self.chamber.lock().ok()?;
        c.advance();
        Some(c.temp_c)
    }

    fn energise(&self, purpose: Purpose, on: bool) {
        if let Ok(mut c) = self.chamber.lock() {
            c.advance();
            match purpose {
                Purpose::Heating => c.heating = on,
                Purpose::Cooling => c.cooling = on,
            }
        }
    }
}

pub struct SimSensor(SimEnclosure);

impl TemperatureSensor for SimSensor {
    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        self.0.temperature().ok_or(SensorError::ReadFailed)
    }
}

pub struct SimPin {
    enclosure: SimEnclosure,
    purpose: Purpose,
    active_low: bool,
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.enclosure.energise(self.purpose, self.active_low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.enclosure.energise(self.purpose, !self.active_low);
        Ok(())
    }
}
