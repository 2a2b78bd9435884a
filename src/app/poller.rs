//! Background temperature poller.
//!
//! Runs in a dedicated thread so a slow sensor never stalls a relay
//! decision. The thread drives a single future with `block_on`: read the
//! sensor, publish the value, sleep until the next tick or a stop request.
//!
//! ```text
//!  ┌──────────────────────────┐        ┌─────────────────────────┐
//!  │  temp-poller thread      │ store  │  SharedReading          │
//!  │  sensor.read_celsius() ──┼───────▶│  AtomicU32 (f32 bits)   │
//!  │  sleep(poll_interval)    │        └────────────┬────────────┘
//!  └──────────────────────────┘                     │ get
//!                                          Regulation loop
//! ```

use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use embassy_time::Duration;
use futures_lite::future::block_on;
use log::{debug, info, warn};

use super::ports::TemperatureSensor;
use super::shutdown::ShutdownSignal;
use crate::error::{Error, SensorError};

/// Quiet NaN used as the "no reading yet" sentinel.
const NO_READING: u32 = 0x7FC0_0000;

// ── Shared value ─────────────────────────────────────────────

/// Latest temperature, written by the poller and read by the loop.
///
/// Stored as raw `f32` bits in an atomic so reads never tear and never
/// block. NaN means no valid reading has been published yet.
#[derive(Debug, Clone)]
pub struct SharedReading(Arc<AtomicU32>);

impl SharedReading {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU32::new(NO_READING)))
    }

    /// The most recently published reading, or `None` before the first one.
    pub fn get(&self) -> Option<f32> {
        let v = f32::from_bits(self.0.load(Ordering::Acquire));
        (!v.is_nan()).then_some(v)
    }

    /// Publish a reading. Non-finite values are rejected so they can never
    /// be mistaken for (or overwrite) a real temperature.
    pub fn store(&self, celsius: f32) -> Result<(), SensorError> {
        if !celsius.is_finite() {
            return Err(SensorError::OutOfRange);
        }
        self.0.store(celsius.to_bits(), Ordering::Release);
        Ok(())
    }
}

impl Default for SharedReading {
    fn default() -> Self {
        Self::new()
    }
}

// ── Poller ───────────────────────────────────────────────────

pub struct TemperaturePoller<T> {
    sensor: T,
    reading: SharedReading,
    interval: Duration,
}

impl<T: TemperatureSensor + Send + 'static> TemperaturePoller<T> {
    pub fn new(sensor: T, reading: SharedReading, interval: Duration) -> Self {
        Self {
            sensor,
            reading,
            interval,
        }
    }

    /// Spawn the poller thread.
    pub fn spawn(self) -> Result<PollerHandle, Error> {
        let stop = Arc::new(ShutdownSignal::new());
        let thread_stop = Arc::clone(&stop);
        let thread = std::thread::Builder::new()
            .name("temp-poller".into())
            .spawn(move || block_on(self.run(&thread_stop)))
            .map_err(|_| Error::Init("failed to spawn poller thread"))?;
        Ok(PollerHandle {
            stop,
            thread: Some(thread),
        })
    }

    async fn run(mut self, stop: &ShutdownSignal) {
        info!("Poller started (interval {} ms)", self.interval.as_millis());
        loop {
            self.poll_once();
            if stop.sleep(self.interval).await.is_err() {
                break;
            }
        }
        info!("Poller stopped");
    }

    /// One tick: read and publish. A failed read keeps the last value.
    fn poll_once(&mut self) {
        match self.sensor.read_celsius() {
            Ok(v) => match self.reading.store(v) {
                Ok(()) => debug!("Temperature {:.2}\u{00b0}C", v),
                Err(e) => warn!("Discarding sensor value {}: {}", v, e),
            },
            Err(e) => warn!("Sensor read failed: {}", e),
        }
    }
}

/// Owner of the running poller thread. Dropping it stops the thread.
pub struct PollerHandle {
    stop: Arc<ShutdownSignal>,
    thread: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Request a stop and wait for the thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.request();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Poller thread panicked");
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
