//! Application core: regulation logic and its runtime glue.
//!
//! All interaction with hardware and storage happens through **port
//! traits** defined in [`ports`], keeping this layer testable without real
//! relays or sensors.

pub mod events;
pub mod poller;
pub mod ports;
pub mod regulation;
pub mod service;
pub mod shutdown;
