//! The regulation loop.
//!
//! ```text
//!   ┌──────────── await first reading ◀── (sentinel blocks here)
//!   ▼
//!   read goal ─▶ decide ─┬─ Sustain ─▶ sleep(drift × secs/°) ─┐
//!                        │                                    │
//!                        └─ Chase(p) ─▶ engage p              │
//!                              ▲         │                    │
//!                              └─ sleep(poll) ◀─ goal met? ─no┤
//!                                        │ yes                │
//!                                  shutdown_all               │
//!                                        ▼                    │
//!                               sleep(cycle_interval) ◀───────┘
//! ```
//!
//! Every sleep is a [`ShutdownSignal::sleep`], so cancellation lands at the
//! next suspension point at the latest. All exits funnel through
//! [`RegulationLoop::finish`], which turns both relays off.

use std::sync::Arc;

use embassy_time::Duration;
use log::{debug, error, info};

use super::events::{RegulatorEvent, TelemetryData};
use super::poller::SharedReading;
use super::ports::{EventSink, GoalSource, RelayPort};
use super::shutdown::ShutdownSignal;
use crate::config::RegulatorConfig;
use crate::control::{Goal, Purpose};
use crate::control::hysteresis::{self, Decision};
use crate::error::{Error, Halt, SensorError};
use crate::interlock::RelayPair;

/// Result of one pass through the decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// Reading was inside the band; the loop slept for `sleep`.
    Sustained { reading_c: f32, sleep: Duration },
    /// A chase ran to completion and both relays are off again.
    GoalMet {
        purpose: Purpose,
        reading_c: f32,
        target_c: f32,
    },
}

pub struct RegulationLoop<H, C, G, S> {
    config: RegulatorConfig,
    relays: RelayPair<H, C>,
    goal: G,
    sink: S,
    reading: SharedReading,
    shutdown: Arc<ShutdownSignal>,
}

impl<H, C, G, S> RegulationLoop<H, C, G, S>
where
    H: RelayPort,
    C: RelayPort,
    G: GoalSource,
    S: EventSink,
{
    pub fn new(
        config: RegulatorConfig,
        relays: RelayPair<H, C>,
        goal: G,
        sink: S,
        reading: SharedReading,
        shutdown: Arc<ShutdownSignal>,
    ) -> Self {
        Self {
            config,
            relays,
            goal,
            sink,
            reading,
            shutdown,
        }
    }

    pub fn relays(&self) -> &RelayPair<H, C> {
        &self.relays
    }

    /// Startup: repair persisted relay state and announce the goal.
    pub fn prepare(&mut self) -> Result<Goal, Halt> {
        let resumed = self.relays.reconcile(&mut self.sink)?;
        let goal = self.goal.goal()?;
        info!(
            "Regulating to {:.2}\u{00b0}C \u{00b1}{:.2} (relays: {:?})",
            goal.target_c, goal.drift_c, resumed
        );
        self.sink.emit(&RegulatorEvent::Started { goal });
        Ok(goal)
    }

    /// Run cycles until cancelled or a fault occurs, then unwind.
    ///
    /// Returns `Ok(())` on cancellation and the fault otherwise. Either
    /// way both relays have been commanded off before this returns.
    pub async fn run(&mut self) -> Result<(), Error> {
        let halt = self.run_until_halt().await;
        self.finish(halt)
    }

    async fn run_until_halt(&mut self) -> Halt {
        loop {
            if let Err(halt) = self.run_cycle().await {
                return halt;
            }
            debug!("Cycle done, next in {} ms", self.config.cycle_interval().as_millis());
            if let Err(halt) = self.shutdown.sleep(self.config.cycle_interval()).await {
                return halt;
            }
        }
    }

    /// Block until the poller has replaced the sentinel, re-checking on the
    /// poll cadence. Cancellable.
    pub async fn await_first_reading(&self) -> Result<f32, Halt> {
        let mut waited = false;
        loop {
            if let Some(v) = self.reading.get() {
                return Ok(v);
            }
            if !waited {
                info!("Waiting for first temperature reading");
                waited = true;
            }
            self.shutdown.sleep(self.config.poll_interval()).await?;
        }
    }

    /// One decision: sustain or chase.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, Halt> {
        let reading_c = self.await_first_reading().await?;
        let goal = self.goal.goal()?;
        let state = self.relays.control_state()?;
        self.sink.emit(&RegulatorEvent::Telemetry(TelemetryData {
            reading_c,
            target_c: goal.target_c,
            drift_c: goal.drift_c,
            state,
        }));

        match hysteresis::decide(reading_c, &goal) {
            Decision::Sustain => {
                let sleep =
                    hysteresis::sustain_duration(goal.drift_c, self.config.secs_to_drift_one_degree);
                let sleep_secs = sleep.as_micros() as f32 / 1_000_000.0;
                info!(
                    "Sustaining at {:.2}\u{00b0}C (target {:.2}\u{00b1}{:.2}), re-check in {:.0}s",
                    reading_c, goal.target_c, goal.drift_c, sleep_secs
                );
                self.sink.emit(&RegulatorEvent::Sustaining {
                    reading_c,
                    sleep_secs,
                });
                self.shutdown.sleep(sleep).await?;
                Ok(CycleOutcome::Sustained { reading_c, sleep })
            }
            Decision::Chase(purpose) => self.chase(purpose, reading_c, goal.target_c).await,
        }
    }

    /// Hold `purpose` on until the live reading meets the live goal.
    async fn chase(
        &mut self,
        purpose: Purpose,
        reading_c: f32,
        target_c: f32,
    ) -> Result<CycleOutcome, Halt> {
        let poll = self.config.poll_interval();
        info!(
            "Chasing {:.2}\u{00b0}C from {:.2}\u{00b0}C ({})",
            target_c, reading_c, purpose
        );

        // Any early return below drops the guard, which turns both relays off.
        let mut engaged = self.relays.engage(purpose, &mut self.sink)?;
        engaged.emit(&RegulatorEvent::ChaseStarted {
            purpose,
            reading_c,
            target_c,
        });

        loop {
            self.shutdown.sleep(poll).await?;
            let current = self.reading.get().ok_or(SensorError::NotReady)?;
            let goal = self.goal.goal()?;
            if hysteresis::goal_met(purpose, current, goal.target_c) {
                engaged.release()?;
                info!(
                    "Goal met at {:.2}\u{00b0}C (target {:.2}\u{00b0}C), all relays off",
                    current, goal.target_c
                );
                self.sink.emit(&RegulatorEvent::GoalMet {
                    purpose,
                    reading_c: current,
                    target_c: goal.target_c,
                });
                return Ok(CycleOutcome::GoalMet {
                    purpose,
                    reading_c: current,
                    target_c: goal.target_c,
                });
            }
            debug!(
                "Chasing ({}): {:.2}\u{00b0}C -> {:.2}\u{00b0}C",
                purpose, current, goal.target_c
            );
        }
    }

    /// Unwind: best-effort all-off, report, map the halt to a result.
    pub fn finish(&mut self, halt: Halt) -> Result<(), Error> {
        if let Err(e) = self.relays.shutdown_all(&mut self.sink) {
            error!("Failed to turn relays off during unwind: {}", e);
        }
        self.sink.emit(&RegulatorEvent::Stopped(halt));
        match halt {
            Halt::Cancelled => {
                info!("Regulation stopped on request, all relays off");
                Ok(())
            }
            Halt::Fault(e) => {
                error!("Regulation stopped by fault: {}", e);
                Err(e)
            }
        }
    }
}
