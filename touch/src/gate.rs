//! Gate timer intervals.
//!
//! A gate is a single period of an interval timer. It is defined the same way a
//! watchdog timer in interval mode is set up: a source clock, a fixed power-of-two
//! divider, and for the slow reference clock an additional prescaler. The gate timer
//! implementation is responsible for turning this into actual timer settings.

/// Clock feeding the gate timer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateClock {
    /// The fast system clock, used to time measurement windows
    System,
    /// The slow, low power reference clock, used to time waits between measurements
    Reference,
}

/// Interval divider applied to the gate clock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDivider {
    Div64,
    Div512,
    Div8192,
    Div32768,
}

impl GateDivider {
    pub const fn value(&self) -> u32 {
        match self {
            Self::Div64 => 64,
            Self::Div512 => 512,
            Self::Div8192 => 8192,
            Self::Div32768 => 32768,
        }
    }
}

/// Prescaler applied to the reference clock before the gate divider
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockPrescaler {
    Div1 = 0b00,
    Div2 = 0b01,
    Div4 = 0b10,
    Div8 = 0b11,
}

impl ClockPrescaler {
    pub const fn value(&self) -> u32 {
        1 << (*self as u32)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateInterval {
    pub clock: GateClock,
    pub divider: GateDivider,
    pub prescaler: ClockPrescaler,
}

impl GateInterval {
    pub const fn system(divider: GateDivider) -> Self {
        Self {
            clock: GateClock::System,
            divider,
            prescaler: ClockPrescaler::Div1,
        }
    }

    pub const fn reference(divider: GateDivider) -> Self {
        Self {
            clock: GateClock::Reference,
            divider,
            prescaler: ClockPrescaler::Div1,
        }
    }

    /// Replace the prescaler. Only the reference clock is prescaled; a system clock
    /// gate is returned unchanged.
    pub const fn with_prescaler(mut self, prescaler: ClockPrescaler) -> Self {
        if let GateClock::Reference = self.clock {
            self.prescaler = prescaler;
        }
        self
    }

    /// Length of the gate in cycles of the undivided source clock
    pub const fn ticks(&self) -> u32 {
        self.divider.value() * self.prescaler.value()
    }

    /// Length of the gate in microseconds, given the source clock frequency
    pub fn duration_us(&self, clock_hz: u32) -> u32 {
        (self.ticks() as u64 * 1_000_000 / clock_hz as u64) as u32
    }
}
