//! Motor controller telemetry
//!
//! The CAN driver decodes VESC status broadcasts and queues them on a
//! [`TelemetryPort`]. The handler maps them onto ride parameters.

use core::time::Duration;

use super::MessagePort;
use crate::state::{
    ApplicationState, BatteryMillivolts, ControllerTemperature, MotorTemperature, Speed,
    WhConsumed, WhRegenerated,
};
use crate::traits::Worker;

/// Depth of the CAN → handler queue
pub const TELEMETRY_QUEUE_DEPTH: usize = 16;

/// Decoded VESC status broadcast
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VescStatus {
    Status1 {
        rpm: i32,
    },
    Status3 {
        watt_hours: f32,
        watt_hours_charged: f32,
    },
    /// Temperatures in °C
    Status4 {
        temp_fet: f32,
        temp_motor: f32,
    },
    /// Input voltage in V
    Status5 {
        input_voltage: f32,
    },
}

pub type TelemetryPort = MessagePort<VescStatus, TELEMETRY_QUEUE_DEPTH>;

/// Applies controller status to the state
pub struct TelemetryHandler<'a> {
    state: &'a ApplicationState,
    port: &'a TelemetryPort,
}

impl<'a> TelemetryHandler<'a> {
    pub fn new(state: &'a ApplicationState, port: &'a TelemetryPort) -> Self {
        Self { state, port }
    }

    pub fn handle(&mut self, status: VescStatus) {
        // Float to integer casts saturate, NaN becomes zero
        let state = self.state.checkout_read_write();

        match status {
            VescStatus::Status1 { rpm } => {
                // No wheel geometry yet, the controller reports km/h as rpm
                state.set::<Speed>(rpm.clamp(0, i32::from(u8::MAX)) as u8);
            }
            VescStatus::Status3 {
                watt_hours,
                watt_hours_charged,
            } => {
                state.set::<WhConsumed>(watt_hours as u16);
                state.set::<WhRegenerated>(watt_hours_charged as u16);
            }
            VescStatus::Status4 {
                temp_fet,
                temp_motor,
            } => {
                state.set::<ControllerTemperature>(temp_fet as u8);
                state.set::<MotorTemperature>(temp_motor as u8);
            }
            VescStatus::Status5 { input_voltage } => {
                // One decimal of a volt
                let millivolts = (input_voltage * 1000.0) as u16;
                state.set::<BatteryMillivolts>(millivolts / 100 * 100);
            }
        }
    }
}

impl Worker for TelemetryHandler<'_> {
    fn on_activation(&mut self) -> Option<Duration> {
        while let Some(status) = self.port.receive() {
            self.handle(status);
        }
        None
    }
}
