//! Oscillation counter on TIM2.
//!
//! The touch electrode on PA0 is part of a relaxation oscillator whose output is fed to
//! the TIM2 external trigger input (TIM2_ETR, AF2). In external clock mode 2 every
//! rising edge increments the counter. Capture channel 1 is mapped to the internal
//! trigger rather than the pin, so it only latches the count when software requests
//! it.
//!
//! Like the HAL drivers, GPIOA is accessed directly here; the pin is switched between
//! its alternate function and plain input for every measurement.

use touch::counter::PinOscillator;

use crate::hal::pac;

/// Pin number of the touch input on GPIOA
const TOUCH_PIN: u32 = 0;

const MODER_INPUT: u32 = 0b00;
const MODER_ALTERNATE: u32 = 0b10;

/// CC1S = 0b11: IC1 mapped on TRC
const CCMR1_CC1S_TRC: u32 = 0b11;

pub struct PinOsc {
    tim: pac::TIM2,
}

impl PinOsc {
    pub fn new(tim: pac::TIM2) -> Self {
        let rcc = unsafe { pac::Peripherals::steal().RCC };
        rcc.apb1enr.modify(|_, w| w.tim2en().set_bit());
        rcc.apb1rstr.modify(|_, w| w.tim2rst().set_bit());
        rcc.apb1rstr.modify(|_, w| w.tim2rst().clear_bit());

        Self { tim }
    }

    fn set_pin_mode(mode: u32) {
        let gpioa = unsafe { &*pac::GPIOA::ptr() };
        let shift = TOUCH_PIN * 2;
        gpioa.moder.modify(|r, w| unsafe {
            w.bits((r.bits() & !(0b11 << shift)) | (mode << shift))
        });
    }
}

impl PinOscillator for PinOsc {
    fn connect(&mut self) {
        Self::set_pin_mode(MODER_ALTERNATE);

        // External clock mode 2, no ETR prescaler or filter, rising edges
        self.tim.smcr.write(|w| w.ece().set_bit());
        self.tim.ccmr1_input().write(|w| unsafe { w.bits(CCMR1_CC1S_TRC) });
        self.tim.ccer.write(|w| w.cc1e().set_bit());
        self.tim.cr1.modify(|_, w| w.cen().set_bit());
    }

    fn reset(&mut self) {
        self.tim.cnt.write(|w| unsafe { w.bits(0) });
    }

    fn capture(&mut self) -> u16 {
        self.tim.egr.write(|w| w.cc1g().set_bit());
        let count = self.tim.ccr1.read().bits();
        // TIM2 is 32 bits wide
        count.min(u16::MAX as u32) as u16
    }

    fn disconnect(&mut self) {
        self.tim.cr1.modify(|_, w| w.cen().clear_bit());
        self.tim.ccer.write(|w| unsafe { w.bits(0) });
        self.tim.smcr.write(|w| unsafe { w.bits(0) });
        Self::set_pin_mode(MODER_INPUT);
    }
}
