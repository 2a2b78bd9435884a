//! Regulator configuration parameters
//!
//! Timing constants for the poller and the regulation loop. The goal
//! temperature is not part of this struct: it is owned by a
//! [`GoalSource`](crate::app::ports::GoalSource) and re-read every decision.

use std::path::Path;

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Longest single sleep the loop will schedule (seconds).
pub const MAX_SLEEP_SECS: f32 = u32::MAX as f32;

/// Upper bound for `cycle_interval_secs` and `secs_to_drift_one_degree`.
pub const MAX_INTERVAL_SECS: f32 = 86_400.0;

/// Core regulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegulatorConfig {
    // --- Timing ---
    /// Sensor poll interval (milliseconds). Also the chase re-check cadence.
    pub poll_interval_ms: u32,
    /// Pause after every regulation cycle (seconds)
    pub cycle_interval_secs: f32,

    // --- Enclosure model ---
    /// Seconds the enclosure takes to drift one degree unassisted
    pub secs_to_drift_one_degree: f32,
}

impl Default for RegulatorConfig {
    fn default() -> Self {
        Self {
            // Timing
            poll_interval_ms: 2000,    // 0.5 Hz
            cycle_interval_secs: 60.0, // 1/min

            // Enclosure
            secs_to_drift_one_degree: 600.0,
        }
    }
}

impl RegulatorConfig {
    /// Load a JSON config file. Fields missing from the file keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound,
            _ => ConfigError::IoError,
        })?;
        let config: Self = serde_json::from_slice(&bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or spin the loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=600_000).contains(&self.poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be 1–600000",
            ));
        }
        if !(0.0..=MAX_INTERVAL_SECS).contains(&self.cycle_interval_secs) {
            return Err(ConfigError::ValidationFailed(
                "cycle_interval_secs must be 0–86400",
            ));
        }
        let drift = self.secs_to_drift_one_degree;
        if drift.is_nan() || drift <= 0.0 || drift > MAX_INTERVAL_SECS {
            return Err(ConfigError::ValidationFailed(
                "secs_to_drift_one_degree must be > 0 and <= 86400",
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.poll_interval_ms))
    }

    pub fn cycle_interval(&self) -> Duration {
        secs_to_duration(self.cycle_interval_secs)
    }
}

/// Convert fractional seconds to a timer duration, clamped to
/// `0..=MAX_SLEEP_SECS`. NaN maps to zero.
pub fn secs_to_duration(secs: f32) -> Duration {
    if secs >= MAX_SLEEP_SECS {
        return Duration::from_secs(u64::from(u32::MAX));
    }
    Duration::from_micros((f64::from(secs.max(0.0)) * 1_000_000.0) as u64)
}
