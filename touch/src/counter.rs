//! Oscillation counting.
//!
//! A measurement routes the touch pin's oscillation into the clock input of a free
//! running counter, lets it count for one gate interval, and captures the result. The
//! hardware is split in two capabilities: the counter fed by the pin, and the gate
//! timer which times the window and puts the core to sleep while it runs. The gate
//! timer is shared with the scheduler, which uses it for the wait between cycles.

use crate::gate::GateInterval;

/// A hardware counter clocked by the oscillation of a touch pin
pub trait PinOscillator {
    /// Route the pin oscillation to the counter clock input and prepare the capture
    /// channel
    fn connect(&mut self);
    /// Reset the count to zero
    fn reset(&mut self);
    /// Capture the current count
    ///
    /// Counters wider than 16 bits must saturate at `u16::MAX`.
    fn capture(&mut self) -> u16;
    /// Stop counting and remove the pin oscillation from the counter input
    fn disconnect(&mut self);
}

/// An interval timer whose expiry wakes the core from a low power state
pub trait GateTimer {
    /// Arm the timer for a single interval
    fn start(&mut self, interval: GateInterval);
    /// Halt until the interval armed by `start` has elapsed
    fn wait(&mut self);
    /// Stop the timer
    fn stop(&mut self);
}

/// Run a single gated measurement and return the raw oscillation count.
///
/// The counter holds no state across calls: it is connected and cleared at the start
/// and disconnected at the end, and the gate is left stopped.
pub fn measure<O, G>(osc: &mut O, gate: &mut G, interval: GateInterval) -> u16
where
    O: PinOscillator,
    G: GateTimer,
{
    osc.connect();
    gate.start(interval);
    osc.reset();
    gate.wait();
    let count = osc.capture();
    gate.stop();
    osc.disconnect();
    count
}

pub struct OscillationCounter<O, G> {
    osc: O,
    gate: G,
    interval: GateInterval,
}

impl<O: PinOscillator, G: GateTimer> OscillationCounter<O, G> {
    pub fn new(osc: O, gate: G, interval: GateInterval) -> Self {
        Self { osc, gate, interval }
    }

    pub fn measure(&mut self) -> u16 {
        measure(&mut self.osc, &mut self.gate, self.interval)
    }

    /// Access the gate timer between measurements
    pub fn gate(&mut self) -> &mut G {
        &mut self.gate
    }
}
