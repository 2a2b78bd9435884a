//! Cooperative cancellation.
//!
//! [`ShutdownSignal`] combines a sticky flag with an embassy [`Signal`] so
//! that a sleeping task wakes as soon as a stop is requested, instead of at
//! the end of its current sleep. Each signal is meant to have a single
//! waiting task; give every long-running task its own instance.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use futures_lite::future;

use crate::error::Halt;

pub struct ShutdownSignal {
    requested: AtomicBool,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl ShutdownSignal {
    pub const fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            wake: Signal::new(),
        }
    }

    /// Request a stop. Safe to call from any thread, including a signal
    /// handler thread, and more than once.
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
        self.wake.signal(());
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Resolve once a stop has been requested.
    pub async fn wait(&self) {
        while !self.is_requested() {
            self.wake.wait().await;
        }
    }

    /// Sleep for `duration`, returning early with [`Halt::Cancelled`] if a
    /// stop is requested before or during the sleep.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Halt> {
        if self.is_requested() {
            return Err(Halt::Cancelled);
        }
        let slept = async {
            Timer::after(duration).await;
            true
        };
        let cancelled = async {
            self.wait().await;
            false
        };
        if future::or(slept, cancelled).await && !self.is_requested() {
            Ok(())
        } else {
            Err(Halt::Cancelled)
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
