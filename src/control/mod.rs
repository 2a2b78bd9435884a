//! Control law for the two-relay enclosure.
//!
//! [`Purpose`] names the functional role of a relay. [`ControlState`] is
//! never stored anywhere: it is recomputed from the two relay states each
//! time it is needed, so it cannot drift away from the hardware.

pub mod hysteresis;

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// The functional role of a relay, independent of its physical pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    Heating,
    Cooling,
}

impl Purpose {
    /// The relay that must be off while this one is on.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Heating => Self::Cooling,
            Self::Cooling => Self::Heating,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Heating => "heating",
            Self::Cooling => "cooling",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the enclosure is currently doing, derived from relay states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlState {
    Idle,
    Heating,
    Cooling,
}

impl ControlState {
    /// Heating wins if (against the interlock) both relays report on.
    pub const fn from_relays(heating_on: bool, cooling_on: bool) -> Self {
        if heating_on {
            Self::Heating
        } else if cooling_on {
            Self::Cooling
        } else {
            Self::Idle
        }
    }

    /// The purpose being served, if any.
    pub const fn purpose(self) -> Option<Purpose> {
        match self {
            Self::Idle => None,
            Self::Heating => Some(Purpose::Heating),
            Self::Cooling => Some(Purpose::Cooling),
        }
    }
}

/// Widest accepted drift band (°C).
pub const MAX_DRIFT_C: f32 = 50.0;

/// Target temperature plus the tolerance band around it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Target temperature (°C).
    pub target_c: f32,
    /// Allowed deviation from target before correction resumes (°C).
    pub drift_c: f32,
}

impl Goal {
    pub const fn new(target_c: f32, drift_c: f32) -> Self {
        Self { target_c, drift_c }
    }

    /// A zero drift band would make the exact-target case engage nothing
    /// while never being within tolerance, so it is rejected outright.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.target_c.is_finite() {
            return Err(ConfigError::ValidationFailed("target must be finite"));
        }
        if self.drift_c.is_nan() || self.drift_c <= 0.0 || self.drift_c > MAX_DRIFT_C {
            return Err(ConfigError::ValidationFailed("drift must be > 0 and <= 50"));
        }
        Ok(())
    }
}

impl From<Purpose> for ControlState {
    fn from(p: Purpose) -> Self {
        match p {
            Purpose::Heating => Self::Heating,
            Purpose::Cooling => Self::Cooling,
        }
    }
}
