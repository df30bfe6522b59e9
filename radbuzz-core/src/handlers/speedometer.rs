//! Analog speedometer needle
//!
//! The needle is driven by a stepper without position feedback. On startup
//! it is driven past its zero stop; from then on the handler tracks the
//! position and moves by the difference to the target.

use alloc::sync::Arc;
use core::time::Duration;

use crate::config::SpeedometerConfig;
use crate::state::{ApplicationState, ListenerHandle, Speed, Wakeup};
use crate::traits::{StepperDriver, Worker};

/// Moves the needle to the current `speed`
pub struct SpeedometerHandler<'a, S> {
    stepper: S,
    state: &'a ApplicationState,
    config: SpeedometerConfig,
    wakeup: Arc<Wakeup>,
    _listener: Option<ListenerHandle<'a>>,
    position: u32,
}

impl<'a, S: StepperDriver> SpeedometerHandler<'a, S> {
    pub fn new(stepper: S, state: &'a ApplicationState, config: SpeedometerConfig) -> Self {
        let wakeup = Arc::new(Wakeup::new());
        let listener = state.attach_listener::<Speed>(wakeup.clone());
        if listener.is_none() {
            warn!("speedometer: no listener slot");
        }

        Self {
            stepper,
            state,
            config,
            wakeup,
            _listener: listener,
            position: 0,
        }
    }

    pub fn wakeup(&self) -> Arc<Wakeup> {
        self.wakeup.clone()
    }

    pub fn stepper(&self) -> &S {
        &self.stepper
    }

    /// Needle position in steps for `speed` km/h, rounded to nearest
    pub fn target_position(&self, speed: u8) -> u32 {
        let max = u32::from(self.config.max_speed_kmh.max(1));
        let speed = u32::from(speed).min(max);
        (speed * self.config.zero_to_max_steps + max / 2) / max
    }
}

impl<S: StepperDriver> Worker for SpeedometerHandler<'_, S> {
    fn on_startup(&mut self) {
        let full_scale = i32::try_from(self.config.zero_to_max_steps).unwrap_or(i32::MAX);
        self.stepper.step_signed(-full_scale);
        self.position = 0;
    }

    fn on_activation(&mut self) -> Option<Duration> {
        let speed = self.state.checkout_readonly().get::<Speed>();
        let target = self.target_position(speed);

        let delta = target as i64 - self.position as i64;
        if delta != 0 {
            trace!("speedometer: {} km/h, {} steps", speed, delta);
            self.stepper.step_signed(delta as i32);
            self.position = target;
        }
        None
    }
}
