//! Workers translating device input into application state and back
//!
//! - [`gps`]: raw GPS fixes to the `position` parameter
//! - [`ble`]: phone navigation writes to navigation parameters and icons
//! - [`telemetry`]: motor controller status to ride parameters
//! - [`speedometer`]: `speed` to the needle stepper
//! - [`buzzer`]: upcoming turns to buzzer pulses
//!
//! Producers living on other threads hand messages over through a
//! [`MessagePort`], which queues the message and wakes the consuming worker.

pub mod ble;
pub mod buzzer;
pub mod gps;
pub mod speedometer;
pub mod telemetry;

use alloc::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::state::Wakeup;

pub use ble::{BleHandler, BlePort, BleWrite, Characteristic, SERVICE_UUID};
pub use buzzer::{BuzzerHandler, BuzzerPhase};
pub use gps::{GpsPort, GpsReader, RawGpsData};
pub use speedometer::SpeedometerHandler;
pub use telemetry::{TelemetryHandler, TelemetryPort, VescStatus};

/// Bounded queue from a producer to one worker
pub struct MessagePort<T, const N: usize> {
    queue: Channel<CriticalSectionRawMutex, T, N>,
    wakeup: Arc<Wakeup>,
}

impl<T, const N: usize> MessagePort<T, N> {
    pub fn new() -> Self {
        Self {
            queue: Channel::new(),
            wakeup: Arc::new(Wakeup::new()),
        }
    }

    /// Queue `message` and wake the consumer
    ///
    /// Returns `false` if the queue was full and the message was dropped.
    /// Never blocks.
    pub fn send(&self, message: T) -> bool {
        let queued = self.queue.try_send(message).is_ok();
        if !queued {
            warn!("message port full, dropping message");
        }
        self.wakeup.signal(());
        queued
    }

    /// Wakeup of the consuming worker
    pub fn wakeup(&self) -> Arc<Wakeup> {
        self.wakeup.clone()
    }

    pub(crate) fn receive(&self) -> Option<T> {
        self.queue.try_receive().ok()
    }
}

impl<T, const N: usize> Default for MessagePort<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
