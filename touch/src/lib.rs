#![cfg_attr(not(test), no_std)]

pub mod baseline;
pub mod counter;
pub mod decision;
pub mod gate;
pub mod rate;
pub mod sensor;

use gate::{ClockPrescaler, GateDivider, GateInterval};

/// Result of comparing one raw count against the baseline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchState {
    Released,
    Touched,
}

impl TouchState {
    pub fn touched(&self) -> bool {
        matches!(self, TouchState::Touched)
    }
}

/// Configuration for a pin oscillator touch input
#[derive(Clone, Copy, Debug)]
pub struct TouchConfig {
    /// Delta (baseline - raw) which must be exceeded to report a touch
    pub key_level: u16,
    /// The baseline is the average of `1 << calibration_shift` measurements
    pub calibration_shift: u8,
    /// Number of untouched cycles to keep sampling fast after a touch
    pub fast_hold: u16,
    /// Gate used to count oscillations for one measurement
    pub measure_gate: GateInterval,
    /// Gate used to wait between measurement cycles, before prescaling
    pub delay_gate: GateInterval,
    /// Prescaler applied to the delay gate clock while sampling fast
    pub fast_prescaler: ClockPrescaler,
    /// Prescaler applied to the delay gate clock while sampling slow
    pub slow_prescaler: ClockPrescaler,
}

impl TouchConfig {
    pub const fn default() -> Self {
        Self {
            key_level: 220,
            calibration_shift: 4,
            fast_hold: 20,
            measure_gate: GateInterval::system(GateDivider::Div512),
            delay_gate: GateInterval::reference(GateDivider::Div512),
            fast_prescaler: ClockPrescaler::Div1,
            slow_prescaler: ClockPrescaler::Div8,
        }
    }

    pub const fn key_level(mut self, key_level: u16) -> Self {
        self.key_level = key_level;
        self
    }

    /// Set the number of calibration samples as a power of two.
    ///
    /// The sum of all samples is held in a u32, so at most 4096 samples are allowed.
    pub const fn calibration_shift(mut self, shift: u8) -> Self {
        assert!(shift <= baseline::MAX_CALIBRATION_SHIFT);
        self.calibration_shift = shift;
        self
    }

    pub const fn fast_hold(mut self, cycles: u16) -> Self {
        self.fast_hold = cycles;
        self
    }

    pub const fn measure_gate(mut self, gate: GateInterval) -> Self {
        self.measure_gate = gate;
        self
    }

    pub const fn delay_gate(mut self, gate: GateInterval) -> Self {
        self.delay_gate = gate;
        self
    }

    pub const fn prescalers(mut self, fast: ClockPrescaler, slow: ClockPrescaler) -> Self {
        self.fast_prescaler = fast;
        self.slow_prescaler = slow;
        self
    }

    pub const fn calibration_samples(&self) -> u32 {
        1 << self.calibration_shift
    }
}

pub const DEFAULT_TOUCH_CONFIG: TouchConfig = TouchConfig::default();
