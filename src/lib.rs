//! Fermentation chamber temperature regulator.
//!
//! Bang-bang control of two mutually exclusive relays (heating, cooling)
//! around a target temperature with a drift band. The library is hardware
//! agnostic; the binary wires it to GPIO or the simulated enclosure.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod interlock;

pub use app::service::Regulator;
pub use config::RegulatorConfig;
pub use control::{ControlState, Goal, Purpose};
pub use error::{Error, Halt};
