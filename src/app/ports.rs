//! Port traits: the hexagonal boundary between the regulation core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Regulator (domain)
//! ```
//!
//! Driven adapters (sensor, relays, goal store, event sinks) implement these
//! traits. The [`Regulator`](super::service::Regulator) consumes them via
//! generics, so the control logic never touches GPIO or files directly.

use std::sync::Arc;

use crate::control::Goal;
use crate::error::{RelayError, SensorError};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Blocking temperature read. Called from the poller thread only.
pub trait TemperatureSensor {
    /// Current enclosure temperature in °C.
    fn read_celsius(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// One physical relay channel.
///
/// `is_on` reports the *persisted* state, which is the authoritative view
/// across restarts. Polarity (active-low boards) is the adapter's concern.
pub trait RelayPort {
    fn is_on(&self) -> Result<bool, RelayError>;

    /// Drive the relay and persist the new state.
    fn set(&mut self, on: bool) -> Result<(), RelayError>;
}

// ───────────────────────────────────────────────────────────────
// Goal port (driven adapter: persistent store ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Source of the current target temperature and drift band.
///
/// Re-read before every decision so an external writer can retarget the
/// loop without restarting it.
pub trait GoalSource {
    fn goal(&self) -> Result<Goal, ConfigError>;
}

impl<T: GoalSource + ?Sized> GoalSource for &T {
    fn goal(&self) -> Result<Goal, ConfigError> {
        (**self).goal()
    }
}

impl<T: GoalSource + ?Sized> GoalSource for Arc<T> {
    fn goal(&self) -> Result<Goal, ConfigError> {
        (**self).goal()
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`RegulatorEvent`](super::events::RegulatorEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::RegulatorEvent);
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    fn emit(&mut self, event: &super::events::RegulatorEvent) {
        (**self).emit(event);
    }
}

/// Fan out to two sinks.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::RegulatorEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from loading configuration or the goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config or goal has been stored yet.
    NotFound,
    /// Stored data failed deserialization.
    Corrupted,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the backing file.
    IoError,
}

/// Errors from the persistent state store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested record does not exist.
    NotFound,
    /// Stored document could not be parsed.
    Corrupted,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Corrupted => write!(f, "corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "record not found"),
            Self::Corrupted => write!(f, "state file corrupted"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for StorageError {}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            StorageError::Corrupted => Self::Corrupted,
            StorageError::IoError => Self::IoError,
        }
    }
}
