//! Stand-ins for the dashboard peripherals
//!
//! The host has no stepper, buzzers or BLE radio. These record what the
//! firmware would drive and report it through `tracing`.

use std::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

use radbuzz_core::traits::{BleServer, Direction, StepperDriver};

/// Needle stepper tracking its position
#[derive(Debug, Default)]
pub struct LoggingStepper {
    position: i64,
}

impl LoggingStepper {
    pub fn position(&self) -> i64 {
        self.position
    }
}

impl StepperDriver for LoggingStepper {
    fn step(&mut self, direction: Direction, steps: u32) {
        match direction {
            Direction::Clockwise => self.position += i64::from(steps),
            Direction::CounterClockwise => self.position -= i64::from(steps),
        }
        tracing::trace!(?direction, steps, position = self.position, "needle moved");
    }
}

/// Buzzer output
#[derive(Debug)]
pub struct LoggingPin {
    name: &'static str,
    high: bool,
}

impl LoggingPin {
    pub fn new(name: &'static str) -> Self {
        Self { name, high: false }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl ErrorType for LoggingPin {
    type Error = Infallible;
}

impl OutputPin for LoggingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.high {
            tracing::info!(pin = self.name, "bzzz");
        }
        self.high = true;
        Ok(())
    }
}

/// GATT server that only logs its setup
///
/// The ride simulator feeds writes straight into the BLE port.
#[derive(Debug, Default)]
pub struct LoggingBleServer {
    characteristics: usize,
}

impl BleServer for LoggingBleServer {
    fn set_service_uuid(&mut self, uuid: u128) {
        tracing::debug!("ble service {:032x}", uuid);
    }

    fn add_write_characteristic(&mut self, uuid: u128) {
        self.characteristics += 1;
        tracing::debug!("ble characteristic {:032x}", uuid);
    }

    fn start(&mut self) {
        tracing::info!(characteristics = self.characteristics, "ble server started");
    }
}
