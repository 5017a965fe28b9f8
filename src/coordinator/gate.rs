//! Pure interval gating for reconnect and flush decisions
//!
//! A gate holds no state of its own. The coordinator keeps the timestamps and
//! asks the gate whether enough time has passed since the last action.

use super::state::NEVER;

/// Time-gated decision between acting now and waiting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalGate {
    interval_ms: u32,
}

impl IntervalGate {
    pub fn new(interval_ms: u32) -> Self {
        Self { interval_ms }
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Decide against this gate's interval (pure function)
    pub fn permits(&self, now: u32, last_action: u32) -> bool {
        Self::should_act(now, last_action, self.interval_ms)
    }

    /// Act when nothing was ever done (`last_action == 0`) or when strictly
    /// more than `interval` milliseconds have elapsed (pure function)
    ///
    /// The elapsed time is a wrapping subtraction, which keeps the answer
    /// correct across counter rollover.
    pub fn should_act(now: u32, last_action: u32, interval: u32) -> bool {
        last_action == NEVER || now.wrapping_sub(last_action) > interval
    }
}
