use crate::counter::{GateTimer, OscillationCounter, PinOscillator};

/// Largest supported calibration shift; 4096 samples of u16::MAX still fit a u32 sum
pub const MAX_CALIBRATION_SHIFT: u8 = 12;

/// Average `1 << shift` samples by summing and shifting.
///
/// Only the first `1 << shift` samples are used.
pub fn average(samples: impl IntoIterator<Item = u16>, shift: u8) -> u16 {
    let n = 1usize << shift;
    let sum: u32 = samples.into_iter().take(n).map(|s| s as u32).sum();
    (sum >> shift) as u16
}

/// Acquire the initial baseline from `1 << shift` measurements.
///
/// The pin must not be touched while this runs. Nothing can detect it if it is, and the
/// baseline will be too low until restart.
pub fn initialize<O, G>(counter: &mut OscillationCounter<O, G>, shift: u8) -> u16
where
    O: PinOscillator,
    G: GateTimer,
{
    average((0..1u32 << shift).map(|_| counter.measure()), shift)
}

/// Track the baseline toward raw counts which are above it.
///
/// A count above the baseline means the pin sees less capacitance than it did, which
/// is environmental drift; the baseline moves halfway to it. Counts below the
/// baseline leave it alone, so a long touch can't drag the reference down to the
/// touched level.
pub fn adjust(baseline: u16, raw: u16) -> u16 {
    if raw > baseline {
        ((baseline as u32 + raw as u32) >> 1) as u16
    } else {
        baseline
    }
}
