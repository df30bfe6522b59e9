//! Turn alerts
//!
//! When the next maneuver comes within the alert distance the rider is
//! told by a short series of pulses on both handlebar buzzers. Every
//! maneuver, identified by its icon hash, is announced once.

use alloc::sync::Arc;
use core::time::Duration;

use embedded_hal::digital::OutputPin;

use crate::config::BuzzerConfig;
use crate::state::{ApplicationState, CurrentIconHash, DistanceToNext, ListenerHandle, Wakeup};
use crate::traits::Worker;

/// Buzzer output phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BuzzerPhase {
    Idle,
    /// Buzzers on, `remaining` pulses left including this one
    On { remaining: u8 },
    /// Pause between pulses
    Off { remaining: u8 },
}

/// Pulses the left and right buzzers on upcoming turns
pub struct BuzzerHandler<'a, L, R> {
    left: L,
    right: R,
    state: &'a ApplicationState,
    config: BuzzerConfig,
    wakeup: Arc<Wakeup>,
    _listener: Option<ListenerHandle<'a>>,
    phase: BuzzerPhase,
    announced: u32,
}

impl<'a, L: OutputPin, R: OutputPin> BuzzerHandler<'a, L, R> {
    pub fn new(left: L, right: R, state: &'a ApplicationState, config: BuzzerConfig) -> Self {
        let wakeup = Arc::new(Wakeup::new());
        let listener =
            state.attach_listener::<(CurrentIconHash, DistanceToNext)>(wakeup.clone());
        if listener.is_none() {
            warn!("buzzer: no listener slot");
        }

        Self {
            left,
            right,
            state,
            config,
            wakeup,
            _listener: listener,
            phase: BuzzerPhase::Idle,
            announced: 0,
        }
    }

    pub fn wakeup(&self) -> Arc<Wakeup> {
        self.wakeup.clone()
    }

    pub fn phase(&self) -> BuzzerPhase {
        self.phase
    }

    pub fn pins(&self) -> (&L, &R) {
        (&self.left, &self.right)
    }

    fn output(&mut self, on: bool) {
        let ok = if on {
            self.left.set_high().is_ok() & self.right.set_high().is_ok()
        } else {
            self.left.set_low().is_ok() & self.right.set_low().is_ok()
        };
        if !ok {
            error!("buzzer: pin write failed");
        }
    }

    /// A new maneuver is within alert distance
    fn turn_ahead(&self) -> Option<u32> {
        let ro = self.state.checkout_readonly();
        let hash = ro.get::<CurrentIconHash>();
        let distance = ro.get::<DistanceToNext>();

        (hash != 0 && hash != self.announced && distance <= self.config.alert_distance_m)
            .then_some(hash)
    }

    fn enter(&mut self, phase: BuzzerPhase) -> Option<Duration> {
        self.phase = phase;
        let pulse = Duration::from_millis(u64::from(self.config.pulse_ms));

        match phase {
            BuzzerPhase::Idle => {
                self.output(false);
                None
            }
            BuzzerPhase::On { .. } => {
                self.output(true);
                Some(pulse)
            }
            BuzzerPhase::Off { .. } => {
                self.output(false);
                Some(pulse)
            }
        }
    }
}

impl<L: OutputPin, R: OutputPin> Worker for BuzzerHandler<'_, L, R> {
    fn on_startup(&mut self) {
        self.output(false);
    }

    fn on_activation(&mut self) -> Option<Duration> {
        match self.phase {
            BuzzerPhase::Idle => match self.turn_ahead() {
                Some(hash) if self.config.pulses > 0 => {
                    debug!("buzzer: announcing {}", hash);
                    self.announced = hash;
                    self.enter(BuzzerPhase::On {
                        remaining: self.config.pulses,
                    })
                }
                _ => None,
            },
            BuzzerPhase::On { remaining } if remaining > 1 => self.enter(BuzzerPhase::Off {
                remaining: remaining - 1,
            }),
            BuzzerPhase::On { .. } => self.enter(BuzzerPhase::Idle),
            BuzzerPhase::Off { remaining } => self.enter(BuzzerPhase::On { remaining }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPin;

    fn handler(state: &ApplicationState) -> BuzzerHandler<'_, MockPin, MockPin> {
        let mut handler = BuzzerHandler::new(
            MockPin::default(),
            MockPin::default(),
            state,
            BuzzerConfig::default(),
        );
        handler.on_startup();
        handler
    }

    fn approach(state: &ApplicationState, hash: u32, distance: u32) {
        let mut snapshot = state.checkout_partial_snapshot::<(CurrentIconHash, DistanceToNext)>();
        snapshot.set::<CurrentIconHash>(hash);
        snapshot.set::<DistanceToNext>(distance);
    }

    #[test]
    fn test_far_turn_is_silent() {
        let state = ApplicationState::new();
        let mut buzzer = handler(&state);

        approach(&state, 0xa7f7f833, 500);
        assert!(buzzer.wakeup().try_take().is_some());
        assert_eq!(buzzer.on_activation(), None);
        assert_eq!(buzzer.phase(), BuzzerPhase::Idle);
        assert_eq!(buzzer.pins().0.rising_edges, 0);
    }

    #[test]
    fn test_near_turn_pulses_then_idles() {
        let state = ApplicationState::new();
        let mut buzzer = handler(&state);
        let pulse = Some(Duration::from_millis(250));

        approach(&state, 0xa7f7f833, 80);
        assert_eq!(buzzer.on_activation(), pulse);
        assert_eq!(buzzer.phase(), BuzzerPhase::On { remaining: 2 });
        assert!(buzzer.pins().0.high && buzzer.pins().1.high);

        assert_eq!(buzzer.on_activation(), pulse);
        assert_eq!(buzzer.phase(), BuzzerPhase::Off { remaining: 1 });
        assert!(!buzzer.pins().0.high);

        assert_eq!(buzzer.on_activation(), pulse);
        assert_eq!(buzzer.on_activation(), None);
        assert_eq!(buzzer.phase(), BuzzerPhase::Idle);

        let (left, right) = buzzer.pins();
        assert_eq!(left.rising_edges, 2);
        assert_eq!(right.rising_edges, 2);
        assert!(!left.high && !right.high);
    }

    #[test]
    fn test_turn_announced_once() {
        let state = ApplicationState::new();
        let mut buzzer = handler(&state);

        approach(&state, 1, 50);
        while buzzer.on_activation().is_some() {}

        approach(&state, 1, 20);
        assert_eq!(buzzer.on_activation(), None);
        assert_eq!(buzzer.pins().0.rising_edges, 2);

        approach(&state, 2, 90);
        assert!(buzzer.on_activation().is_some());
        assert_eq!(buzzer.pins().0.rising_edges, 3);
    }

    #[test]
    fn test_no_maneuver_is_silent() {
        let state = ApplicationState::new();
        let mut buzzer = handler(&state);

        approach(&state, 0, 0);
        assert_eq!(buzzer.on_activation(), None);
    }
}
