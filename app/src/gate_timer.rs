use core::sync::atomic::{AtomicBool, Ordering};

use touch::counter::GateTimer;
use touch::gate::{GateClock, GateInterval};

use crate::hal::pac;
use crate::hal::rcc::Rcc;

/// Timer tick rate used for system clock gates
pub const SYSTEM_GATE_HZ: u32 = 1_000_000;
/// Timer tick rate used for reference clock gates
pub const REFERENCE_GATE_HZ: u32 = 12_000;

/// Set by the TIM3 interrupt when a gate has elapsed
static GATE_ELAPSED: AtomicBool = AtomicBool::new(false);

/// One-shot interval timer on TIM3, used to gate measurements and time the sleep
/// between them.
///
/// Both gate clocks are derived from the timer kernel clock by the prescaler, which
/// also absorbs the reference clock prescaler, leaving the gate divider in ARR.
pub struct WatchTimer {
    tim: pac::TIM3,
    clk_freq: u32,
}

impl WatchTimer {
    pub fn new(tim: pac::TIM3, rcc: &mut Rcc) -> Self {
        let rccregs = unsafe { pac::Peripherals::steal().RCC };
        rccregs.apb1enr.modify(|_, w| w.tim3en().set_bit());
        rccregs.apb1rstr.modify(|_, w| w.tim3rst().set_bit());
        rccregs.apb1rstr.modify(|_, w| w.tim3rst().clear_bit());

        // If pclk is prescaled from hclk, the frequency fed into the timers is doubled
        let clk_freq = if rcc.clocks.hclk().0 == rcc.clocks.pclk().0 {
            rcc.clocks.pclk().0
        } else {
            rcc.clocks.pclk().0 * 2
        };

        // Stop after one period, and only let an overflow raise the update interrupt so
        // that loading the prescaler with UG doesn't.
        tim.cr1.modify(|_, w| {
            w.opm().set_bit()
            .urs().set_bit()
        });
        tim.dier.write(|w| w.uie().set_bit());

        Self {
            tim,
            clk_freq,
        }
    }

    /// Must be called from the TIM3 interrupt handler
    pub fn on_interrupt() {
        let tim3 = unsafe { pac::Peripherals::steal().TIM3 };
        tim3.sr.write(|w| unsafe { w.bits(0) });
        GATE_ELAPSED.store(true, Ordering::Relaxed);
    }

    /// Tick rate of the timer for a gate clock
    pub fn tick_freq(clock: GateClock) -> u32 {
        match clock {
            GateClock::System => SYSTEM_GATE_HZ,
            GateClock::Reference => REFERENCE_GATE_HZ,
        }
    }
}

impl GateTimer for WatchTimer {
    fn start(&mut self, interval: GateInterval) {
        let psc = (self.clk_freq / Self::tick_freq(interval.clock)) * interval.prescaler.value() - 1;
        let arr = interval.divider.value() - 1;
        self.tim.psc.write(|w| w.psc().bits(psc as u16));
        self.tim.arr.write(|w| w.arr().bits(arr as u16));
        self.tim.egr.write(|w| w.ug().set_bit());

        GATE_ELAPSED.store(false, Ordering::Relaxed);
        self.tim.cr1.modify(|_, w| w.cen().set_bit());
    }

    fn wait(&mut self) {
        while !GATE_ELAPSED.load(Ordering::Relaxed) {
            // With interrupts masked a pending interrupt still ends the wfi, so the flag
            // can't be set between the check and going to sleep. Other interrupts wake us
            // too; go back to sleep until the gate is done.
            cortex_m::interrupt::free(|_| {
                if !GATE_ELAPSED.load(Ordering::Relaxed) {
                    cortex_m::asm::wfi();
                }
            });
        }
    }

    fn stop(&mut self) {
        self.tim.cr1.modify(|_, w| w.cen().clear_bit());
        self.tim.sr.write(|w| unsafe { w.bits(0) });
        GATE_ELAPSED.store(false, Ordering::Relaxed);
    }
}
