//! Stepper motor driver trait
//!
//! Used by the speedometer needle. There is no position feedback, the
//! caller tracks the needle position itself.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Motor rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Clockwise rotation
    Clockwise,
    /// Counter-clockwise rotation
    CounterClockwise,
}

/// Trait for stepper motor drivers
pub trait StepperDriver {
    /// Move `steps` steps in `direction`
    fn step(&mut self, direction: Direction, steps: u32);

    /// Move a signed number of steps
    ///
    /// Positive values turn clockwise.
    fn step_signed(&mut self, steps: i32) {
        let direction = if steps < 0 {
            Direction::CounterClockwise
        } else {
            Direction::Clockwise
        };
        if steps != 0 {
            self.step(direction, steps.unsigned_abs());
        }
    }
}
