//! Measurement cycle for a single pin oscillator touch input.
//!
//! Each cycle measures the pin once, compares the count against the baseline, lets the
//! baseline follow upward drift, and picks how long to sleep before the next cycle.
//! The state carried from one cycle to the next is only the baseline and the sample
//! rate controller, held in `SensorState`.

use core::fmt::Write;

use crate::baseline;
use crate::counter::{GateTimer, OscillationCounter, PinOscillator};
use crate::decision::decide;
use crate::rate::{Rate, SampleRate};
use crate::{TouchConfig, TouchState, DEFAULT_TOUCH_CONFIG};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SensorState {
    pub baseline: u16,
    pub rate: SampleRate,
}

/// Everything learned in one measurement cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cycle {
    /// The baseline the raw count was compared against
    pub baseline: u16,
    pub raw: u16,
    pub delta: i32,
    pub state: TouchState,
    /// Rate for the wait following this cycle
    pub rate: Rate,
}

impl SensorState {
    pub const fn new(baseline: u16) -> Self {
        Self {
            baseline,
            rate: SampleRate::new(),
        }
    }

    pub fn update(self, raw: u16, config: &TouchConfig) -> (Self, Cycle) {
        let decision = decide(self.baseline, raw, config.key_level);
        let next = Self {
            baseline: baseline::adjust(self.baseline, raw),
            rate: self.rate.next(decision.state, config.fast_hold),
        };
        let cycle = Cycle {
            baseline: self.baseline,
            raw,
            delta: decision.delta,
            state: decision.state,
            rate: next.rate.rate,
        };
        (next, cycle)
    }
}

impl Cycle {
    pub fn touched(&self) -> bool {
        self.state.touched()
    }

    /// Write the human readable report for this cycle. Output is best effort; write
    /// errors are dropped.
    pub fn report<W: Write>(&self, w: &mut W) {
        write!(
            w,
            "Baseline: {} Raw count: {} Difference: {}\r\n",
            self.baseline, self.raw, self.delta
        )
        .ok();
        if self.touched() {
            w.write_str("Presence detected\r\n").ok();
        }
    }
}

pub struct Sensor<'a, O, G> {
    counter: OscillationCounter<O, G>,
    pub config: &'a TouchConfig,
    pub state: SensorState,
}

impl<'a, O: PinOscillator, G: GateTimer> Sensor<'a, O, G> {
    /// Create a sensor. The baseline is zero until `calibrate` is called.
    pub fn new(osc: O, gate: G, config: Option<&'a TouchConfig>) -> Self {
        let config = config.unwrap_or(&DEFAULT_TOUCH_CONFIG);
        Self {
            counter: OscillationCounter::new(osc, gate, config.measure_gate),
            config,
            state: SensorState::new(0),
        }
    }

    /// Acquire the baseline. The input must not be touched during calibration.
    pub fn calibrate(&mut self) -> u16 {
        let base = baseline::initialize(&mut self.counter, self.config.calibration_shift);
        self.state = SensorState::new(base);
        base
    }

    /// Measure the pin, update the sensor state, and report the result to `log`
    pub fn cycle<W: Write>(&mut self, log: &mut W) -> Cycle {
        let raw = self.counter.measure();
        let (state, cycle) = self.state.update(raw, self.config);
        self.state = state;
        cycle.report(log);
        cycle
    }

    /// Sleep until the next cycle is due, for a time set by the current sample rate
    pub fn sleep(&mut self) {
        let prescaler = self.state.rate.prescaler(self.config);
        let interval = self.config.delay_gate.with_prescaler(prescaler);
        let gate = self.counter.gate();
        gate.start(interval);
        gate.wait();
        gate.stop();
    }

    /// Run the sensor forever
    ///
    /// `on_cycle` is called after every measurement, before going to sleep.
    pub fn run<W, F>(&mut self, log: &mut W, mut on_cycle: F) -> !
    where
        W: Write,
        F: FnMut(&Cycle),
    {
        loop {
            let cycle = self.cycle(log);
            on_cycle(&cycle);
            self.sleep();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::counter::sim::*;
    use crate::gate::{ClockPrescaler, GateDivider, GateInterval};

    const KEY: u16 = DEFAULT_TOUCH_CONFIG.key_level;

    fn run_counts(state: SensorState, counts: &[u16]) -> (SensorState, Vec<Cycle>) {
        let mut state = state;
        let mut cycles = Vec::new();
        for raw in counts {
            let (next, cycle) = state.update(*raw, &DEFAULT_TOUCH_CONFIG);
            state = next;
            cycles.push(cycle);
        }
        (state, cycles)
    }

    #[test]
    fn test_touch_decision() {
        let state = SensorState::new(500);

        let (_, cycle) = state.update(250, &DEFAULT_TOUCH_CONFIG);
        assert_eq!(cycle.delta, 250);
        assert!(cycle.touched());

        let (_, cycle) = state.update(400, &DEFAULT_TOUCH_CONFIG);
        assert_eq!(cycle.delta, 100);
        assert!(!cycle.touched());
    }

    #[test]
    fn test_drift_correction() {
        let (next, cycle) = SensorState::new(500).update(600, &DEFAULT_TOUCH_CONFIG);
        assert_eq!(cycle.delta, -100);
        assert_eq!(cycle.baseline, 500);
        assert!(!cycle.touched());
        assert_eq!(next.baseline, 550);
    }

    #[test]
    fn test_touch_does_not_move_baseline() {
        let (state, cycles) = run_counts(SensorState::new(1000), &[700; 50]);
        assert!(cycles.iter().all(|c| c.touched()));
        assert_eq!(state.baseline, 1000);
    }

    #[test]
    fn test_idempotent_at_baseline() {
        let (state, cycles) = run_counts(SensorState::new(800), &[800; 30]);
        assert_eq!(state.baseline, 800);
        assert!(cycles.iter().all(|c| c.delta == 0 && !c.touched()));
    }

    #[test]
    fn test_noise_never_touches() {
        // Jitter around the baseline well under the key level
        let counts: Vec<u16> = (0..200).map(|i| 1000 - 50 + ((i * 37) % 100) as u16).collect();
        let (_, cycles) = run_counts(SensorState::new(1000), &counts);

        let mut last = 0;
        for c in cycles.iter() {
            assert!(!c.touched());
            assert!(c.delta <= KEY as i32);
            // The baseline only moves when a count was above it
            if last != 0 && c.baseline != last {
                assert!(c.baseline > last);
            }
            last = c.baseline;
        }
    }

    #[test]
    fn test_baseline_monotonic_with_drift() {
        let mut state = SensorState::new(1000);
        let mut raw = 1000;
        for _ in 0..100 {
            raw += 3;
            let (next, cycle) = state.update(raw, &DEFAULT_TOUCH_CONFIG);
            assert!(!cycle.touched());
            assert!(next.baseline >= state.baseline);
            assert!(next.baseline <= raw);
            state = next;
        }
        assert!(state.baseline > 1000);
    }

    #[test]
    fn test_rate_follows_touch() {
        let mut counts = vec![1000u16; 5];
        counts.push(600);
        counts.extend([1000u16; 21]);
        let (_, cycles) = run_counts(SensorState::new(1000), &counts);

        assert!(cycles[..5].iter().all(|c| c.rate == Rate::Slow));
        assert!(cycles[5].touched());
        assert_eq!(cycles[5].rate, Rate::Fast);
        assert!(cycles[6..26].iter().all(|c| c.rate == Rate::Fast));
        assert_eq!(cycles[26].rate, Rate::Slow);
    }

    #[test]
    fn test_report() {
        let mut out = String::new();
        let (_, cycle) = SensorState::new(500).update(600, &DEFAULT_TOUCH_CONFIG);
        cycle.report(&mut out);
        assert_eq!(out, "Baseline: 500 Raw count: 600 Difference: -100\r\n");

        let mut out = String::new();
        let (_, cycle) = SensorState::new(500).update(250, &DEFAULT_TOUCH_CONFIG);
        cycle.report(&mut out);
        assert_eq!(
            out,
            "Baseline: 500 Raw count: 250 Difference: 250\r\nPresence detected\r\n"
        );
    }

    #[test]
    fn test_sensor_cycle() {
        let log = new_log();
        let mut counts = vec![1000u16; 16];
        counts.extend([1000, 700, 1000]);
        let mut sensor = Sensor::new(
            SimOscillator::new(&counts, &log),
            SimGate::new(&log),
            None,
        );

        assert_eq!(sensor.calibrate(), 1000);
        assert_eq!(sensor.state.baseline, 1000);

        let mut out = String::new();
        let first = sensor.cycle(&mut out);
        assert!(!first.touched());
        assert_eq!(first.rate, Rate::Slow);

        let second = sensor.cycle(&mut out);
        assert!(second.touched());
        assert_eq!(second.delta, 300);
        assert_eq!(second.rate, Rate::Fast);
        assert_eq!(out.matches("Presence detected").count(), 1);
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn test_sensor_sleep_interval() {
        let log = new_log();
        let mut counts = vec![1000u16; 17];
        counts.push(500);
        let mut sensor = Sensor::new(
            SimOscillator::new(&counts, &log),
            SimGate::new(&log),
            None,
        );
        assert_eq!(sensor.calibrate(), 1000);
        let delay = DEFAULT_TOUCH_CONFIG.delay_gate;
        let mut out = String::new();

        // Untouched: slow wait
        sensor.cycle(&mut out);
        log.borrow_mut().clear();
        sensor.sleep();
        assert_eq!(
            *log.borrow(),
            vec![
                Event::Start(delay.with_prescaler(ClockPrescaler::Div8)),
                Event::Wait,
                Event::Stop,
            ]
        );

        // Touched: fast wait
        sensor.cycle(&mut out);
        log.borrow_mut().clear();
        sensor.sleep();
        assert_eq!(log.borrow()[0], Event::Start(delay.with_prescaler(ClockPrescaler::Div1)));
    }

    #[test]
    fn test_measurement_uses_measure_gate() {
        let log = new_log();
        let mut sensor = Sensor::new(SimOscillator::new(&[1000], &log), SimGate::new(&log), None);
        sensor.cycle(&mut String::new());
        assert_eq!(log.borrow()[1], Event::Start(DEFAULT_TOUCH_CONFIG.measure_gate));
    }

    #[test]
    fn test_sensor_custom_config() {
        const CONFIG: TouchConfig = TouchConfig::default()
            .key_level(100)
            .fast_hold(3)
            .delay_gate(GateInterval::reference(GateDivider::Div8192))
            .prescalers(ClockPrescaler::Div2, ClockPrescaler::Div4);
        let fast = CONFIG.delay_gate.with_prescaler(ClockPrescaler::Div2);
        let slow = CONFIG.delay_gate.with_prescaler(ClockPrescaler::Div4);

        let log = new_log();
        let mut counts = vec![1000u16; 16];
        // 150 below baseline is a touch at this key level but not at the default one
        counts.extend([850, 1000, 1000, 1000, 1000]);
        let mut sensor = Sensor::new(
            SimOscillator::new(&counts, &log),
            SimGate::new(&log),
            Some(&CONFIG),
        );
        assert_eq!(sensor.calibrate(), 1000);

        let mut out = String::new();
        let mut sleeps = Vec::new();
        let mut cycles = Vec::new();
        for _ in 0..5 {
            cycles.push(sensor.cycle(&mut out));
            log.borrow_mut().clear();
            sensor.sleep();
            sleeps.push(log.borrow()[0]);
        }

        assert!(cycles[0].touched());
        assert_eq!(cycles[0].delta, 150);
        assert!(cycles[1..].iter().all(|c| !c.touched()));

        // Held fast for three untouched cycles, slow on the fourth
        let rates: Vec<Rate> = cycles.iter().map(|c| c.rate).collect();
        assert_eq!(rates, vec![Rate::Fast, Rate::Fast, Rate::Fast, Rate::Fast, Rate::Slow]);
        assert_eq!(sleeps[0], Event::Start(fast));
        assert_eq!(sleeps[3], Event::Start(fast));
        assert_eq!(sleeps[4], Event::Start(slow));
        assert_ne!(fast, DEFAULT_TOUCH_CONFIG.delay_gate);
    }

    #[test]
    fn test_update_uses_given_config() {
        let config = TouchConfig::default().key_level(50).fast_hold(0);
        let (next, cycle) = SensorState::new(500).update(440, &config);
        assert!(cycle.touched());
        assert_eq!(next.rate.hold, 0);

        // Default key level would not see this as a touch
        let (_, cycle) = SensorState::new(500).update(440, &DEFAULT_TOUCH_CONFIG);
        assert!(!cycle.touched());

        // With no hold the next untouched cycle is already slow
        let (next, cycle) = next.update(500, &config);
        assert!(!cycle.touched());
        assert_eq!(next.rate.rate, Rate::Slow);
    }
}
