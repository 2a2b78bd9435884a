//! Application service: the hexagonal core.
//!
//! [`Regulator`] owns the sensor, the relay pair, the goal source and the
//! event sink. [`Regulator::start`] wires them into the two runtime tasks
//! and blocks until shutdown.
//!
//! ```text
//!  TemperatureSensor ──▶ Poller thread ──▶ SharedReading
//!                                               │
//!  GoalSource ─────────▶ ┌──────────────────────▼──┐ ──▶ EventSink
//!                        │     RegulationLoop      │
//!  RelayPort × 2 ◀────── │  hysteresis · interlock │
//!                        └─────────────────────────┘
//! ```

use std::sync::Arc;

use futures_lite::future::block_on;
use log::{error, info};

use super::poller::{SharedReading, TemperaturePoller};
use super::ports::{EventSink, GoalSource, RelayPort, TemperatureSensor};
use super::regulation::RegulationLoop;
use super::shutdown::ShutdownSignal;
use crate::config::RegulatorConfig;
use crate::error::{Error, Halt};
use crate::interlock::RelayPair;

pub struct Regulator<T, H, C, G, S> {
    config: RegulatorConfig,
    sensor: T,
    relays: RelayPair<H, C>,
    goal: G,
    sink: S,
    shutdown: Arc<ShutdownSignal>,
}

impl<T, H, C, G, S> Regulator<T, H, C, G, S>
where
    T: TemperatureSensor + Send + 'static,
    H: RelayPort,
    C: RelayPort,
    G: GoalSource,
    S: EventSink,
{
    /// Validate configuration and the initial goal. Nothing is started if
    /// this fails, and any relay resumed in the on state is turned off.
    pub fn new(
        config: RegulatorConfig,
        sensor: T,
        mut relays: RelayPair<H, C>,
        goal: G,
        mut sink: S,
    ) -> Result<Self, Error> {
        let checked = config
            .validate()
            .and_then(|()| goal.goal()?.validate());
        if let Err(e) = checked {
            if let Err(off) = relays.shutdown_all(&mut sink) {
                error!("Failed to turn relays off after rejected startup: {}", off);
            }
            return Err(e.into());
        }
        Ok(Self {
            config,
            sensor,
            relays,
            goal,
            sink,
            shutdown: Arc::new(ShutdownSignal::new()),
        })
    }

    /// Use an externally created signal, e.g. one already wired to a
    /// signal handler before any relay was touched.
    pub fn with_shutdown(mut self, shutdown: Arc<ShutdownSignal>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Handle for requesting a stop from another thread (signal handler,
    /// supervisor, test).
    pub fn shutdown_handle(&self) -> Arc<ShutdownSignal> {
        Arc::clone(&self.shutdown)
    }

    /// Run until a stop is requested or a fault occurs.
    ///
    /// Blocks the calling thread. On return both relays have been commanded
    /// off. Cancellation yields `Ok(())`.
    pub fn start(self) -> Result<(), Error> {
        let Self {
            config,
            sensor,
            relays,
            goal,
            sink,
            shutdown,
        } = self;
        let poll_interval = config.poll_interval();
        let reading = SharedReading::new();
        let mut regulation =
            RegulationLoop::new(config, relays, goal, sink, reading.clone(), shutdown);

        if let Err(halt) = regulation.prepare() {
            return regulation.finish(halt);
        }

        let poller = match TemperaturePoller::new(sensor, reading, poll_interval).spawn() {
            Ok(p) => p,
            Err(e) => return regulation.finish(Halt::Fault(e)),
        };

        let result = block_on(regulation.run());
        poller.stop();
        info!("Regulator exited");
        result
    }
}
