#![no_main]
#![no_std]

use core::fmt::Write;
use cortex_m;
use cortex_m_rt::entry;
use panic_halt as _;

use stm32f0xx_hal as hal;

use touch::DEFAULT_TOUCH_CONFIG;
use touch::gate::GateInterval;
use touch::sensor::Sensor;

use crate::hal::pac;
use crate::hal::pac::interrupt;
use crate::hal::prelude::*;

mod gate_timer;
mod pin_osc;
mod serial;

fn gate_us(gate: GateInterval) -> u32 {
    gate.duration_us(gate_timer::WatchTimer::tick_freq(gate.clock))
}

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();
    let mut nvic = cp.NVIC;

    let mut flash = dp.FLASH;
    let mut rcc = dp.RCC.configure().sysclk(48.mhz()).freeze(&mut flash);
    let gpioa = dp.GPIOA.split(&mut rcc);
    let gpiob = dp.GPIOB.split(&mut rcc);
    let gpioc = dp.GPIOC.split(&mut rcc);

    // A library requiring a critical section to set a gpio AF register is bad and I just won't.
    let fake_cs = unsafe { cortex_m::interrupt::CriticalSection::new() };

    // Touch input on TIM2_ETR. The counter switches it back to input between measurements.
    let _touch = gpioa.pa0.into_alternate_af2(&fake_cs);

    let mut led_blue = gpioc.pc8.into_push_pull_output(&fake_cs);
    let mut led_green = gpioc.pc9.into_push_pull_output(&fake_cs);

    let tx_pin = gpiob.pb6.into_alternate_af0(&fake_cs);
    let rx_pin = gpiob.pb7.into_alternate_af0(&fake_cs);
    let uart = hal::serial::Serial::usart1(dp.USART1, (tx_pin, rx_pin), 115200.bps(), &mut rcc);
    serial::uart1::init(uart, 4);

    let osc = pin_osc::PinOsc::new(dp.TIM2);
    let gate = gate_timer::WatchTimer::new(dp.TIM3, &mut rcc);

    unsafe {
        nvic.set_priority(pac::Interrupt::TIM3, 3);
        cortex_m::peripheral::NVIC::unmask(pac::Interrupt::TIM3);
    }

    let mut log = serial::uart1::writer();
    core::fmt::write(&mut log, format_args!(
        "Measure gate: {} us, delay gate: {} us\r\n",
        gate_us(DEFAULT_TOUCH_CONFIG.measure_gate),
        gate_us(DEFAULT_TOUCH_CONFIG.delay_gate),
    )).ok();

    let mut sensor = Sensor::new(osc, gate, None);
    let baseline = sensor.calibrate();
    write!(log, "Baseline acquired: {}\r\n", baseline).ok();

    sensor.run(&mut log, |cycle| {
        if cycle.touched() {
            led_blue.set_high().ok();
            led_green.set_high().ok();
        } else {
            led_blue.set_low().ok();
            led_green.set_low().ok();
        }
    })
}

#[interrupt]
fn TIM3() {
    gate_timer::WatchTimer::on_interrupt();
}
