use crate::gate::ClockPrescaler;
use crate::{TouchConfig, TouchState};

/// Speed of the wait between measurement cycles
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rate {
    Fast,
    Slow,
}

/// Sample rate controller
///
/// Any touch switches to fast sampling and holds it for `hold` untouched cycles. After
/// that the controller drops to slow sampling until the next touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleRate {
    pub rate: Rate,
    /// Untouched cycles left before dropping to slow
    pub hold: u16,
}

impl SampleRate {
    /// Controller state at startup: fast, with no hold time left
    pub const fn new() -> Self {
        Self {
            rate: Rate::Fast,
            hold: 0,
        }
    }

    /// Advance the controller by one cycle
    pub fn next(self, state: TouchState, hold: u16) -> Self {
        match state {
            TouchState::Touched => Self {
                rate: Rate::Fast,
                hold,
            },
            TouchState::Released if self.hold == 0 => Self {
                rate: Rate::Slow,
                hold: 0,
            },
            TouchState::Released => Self {
                rate: self.rate,
                hold: self.hold - 1,
            },
        }
    }

    /// Prescaler to apply to the delay gate for the current rate
    pub fn prescaler(&self, config: &TouchConfig) -> ClockPrescaler {
        match self.rate {
            Rate::Fast => config.fast_prescaler,
            Rate::Slow => config.slow_prescaler,
        }
    }
}
