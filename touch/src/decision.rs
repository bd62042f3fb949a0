use crate::TouchState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    /// Baseline minus raw count. Positive when the oscillation slowed down.
    pub delta: i32,
    pub state: TouchState,
}

/// Compare a raw count against the baseline.
///
/// Each call stands alone: there is no hysteresis or debounce.
pub fn decide(baseline: u16, raw: u16, key_level: u16) -> Decision {
    let delta = baseline as i32 - raw as i32;
    let state = if delta > key_level as i32 {
        TouchState::Touched
    } else {
        TouchState::Released
    };
    Decision { delta, state }
}
