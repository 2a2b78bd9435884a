//! Unified error types for the regulator.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! top-level unwind path uniform. All variants are `Copy` so they can be
//! passed through the relay coordinator and the loop boundary without
//! allocation.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the regulator funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The temperature sensor could not be read or returned garbage.
    Sensor(SensorError),
    /// A relay command or relay state query failed.
    Relay(RelayError),
    /// Configuration or goal is invalid or missing.
    Config(ConfigError),
    /// Persistent state could not be read or written.
    Storage(StorageError),
    /// A runtime resource (thread, timer) could not be set up.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Relay(e) => write!(f, "relay: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The bus transaction failed (checksum, timeout, missing device).
    ReadFailed,
    /// Reading is not a finite number or is physically implausible.
    OutOfRange,
    /// No reading has been produced yet.
    NotReady,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed => write!(f, "read failed"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::NotReady => write!(f, "no reading yet"),
        }
    }
}

impl std::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Relay errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayError {
    /// Driving the output pin failed.
    GpioWriteFailed,
    /// The persisted relay state could not be read.
    StateReadFailed,
    /// The new relay state could not be persisted.
    StatePersistFailed,
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::StateReadFailed => write!(f, "state read failed"),
            Self::StatePersistFailed => write!(f, "state persist failed"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<RelayError> for Error {
    fn from(e: RelayError) -> Self {
        Self::Relay(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Loop unwind
// ---------------------------------------------------------------------------

/// Why the regulation loop stopped.
///
/// Both variants take the same unwind path (all relays off); only the
/// reported severity and the final `Result` differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// Operator-requested stop.
    Cancelled,
    /// Unrecoverable fault inside the loop.
    Fault(Error),
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::Fault(e) => write!(f, "fault: {e}"),
        }
    }
}

impl From<Error> for Halt {
    fn from(e: Error) -> Self {
        Self::Fault(e)
    }
}

impl From<RelayError> for Halt {
    fn from(e: RelayError) -> Self {
        Self::Fault(e.into())
    }
}

impl From<SensorError> for Halt {
    fn from(e: SensorError) -> Self {
        Self::Fault(e.into())
    }
}

impl From<ConfigError> for Halt {
    fn from(e: ConfigError) -> Self {
        Self::Fault(e.into())
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
