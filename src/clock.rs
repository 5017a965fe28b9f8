//! Millisecond counter used to time reconnects and flushes
//!
//! The coordinator works on a wrapping `u32` millisecond counter, the same
//! shape as a microcontroller uptime timer. Interval checks use wrapping
//! subtraction so they stay correct when the counter rolls over.

use std::time::Instant;

/// Source of the current time in wrapping milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u32;
}

/// Milliseconds elapsed since the clock was created, truncated to 32 bits
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u32 {
        // Truncation is the rollover
        self.started.elapsed().as_millis() as u32
    }
}
